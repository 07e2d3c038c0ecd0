use crate::models::{CouponScope, DiscountType};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum UserCouponStatus {
    Unused,
    Used,
    /// 终态，不会被回退
    Expired,
}

impl std::fmt::Display for UserCouponStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UserCouponStatus::Unused => write!(f, "unused"),
            UserCouponStatus::Used => write!(f, "used"),
            UserCouponStatus::Expired => write!(f, "expired"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct UserCoupon {
    pub id: i64,
    pub user_id: i64,
    pub coupon_id: i64,
    pub status: UserCouponStatus,
    pub claimed_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub used_at: Option<DateTime<Utc>>,
    pub order_id: Option<i64>,
}

/// 相对有效期与券结束时间取较早者。
pub fn compute_expires_at(
    claimed_at: DateTime<Utc>,
    valid_days: Option<i64>,
    coupon_end_time: DateTime<Utc>,
) -> DateTime<Utc> {
    match valid_days {
        Some(days) => (claimed_at + Duration::days(days)).min(coupon_end_time),
        None => coupon_end_time,
    }
}

/// “我的优惠券”列表行：user_coupon 连同其券面信息。
#[derive(Debug, Serialize, Deserialize, FromRow, ToSchema)]
pub struct UserCouponDetail {
    pub id: i64,
    pub coupon_id: i64,
    pub coupon_name: String,
    pub discount_type: DiscountType,
    pub value: f64,
    pub min_amount: i64,
    pub max_discount: Option<i64>,
    pub scope: CouponScope,
    pub status: UserCouponStatus,
    pub claimed_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub used_at: Option<DateTime<Utc>>,
    pub order_id: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserCouponQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub status: Option<UserCouponStatus>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OfferQuery {
    pub scope: CouponScope,
    /// 订单金额（美分）
    pub order_amount: i64,
}

/// 下单页展示的候选券：连同按当前订单金额算出的优惠额。
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CouponOffer {
    pub user_coupon_id: i64,
    pub coupon_id: i64,
    pub coupon_name: String,
    pub discount_type: DiscountType,
    pub min_amount: i64,
    pub expires_at: DateTime<Utc>,
    /// 该券在当前订单金额下可抵扣的金额（美分）
    pub discount: i64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct BestOfferResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub best: Option<CouponOffer>,
    pub discount: i64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UseCouponRequest {
    pub order_id: i64,
    /// 订单金额（美分）
    pub order_amount: i64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UseCouponResponse {
    pub user_coupon: UserCoupon,
    pub discount: i64,
}
