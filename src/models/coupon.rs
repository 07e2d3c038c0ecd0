use crate::error::{AppError, AppResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DiscountType {
    /// value 为优惠金额（美分）
    Fixed,
    /// value 为折扣比例，[0,1]
    Percent,
}

impl std::fmt::Display for DiscountType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DiscountType::Fixed => write!(f, "fixed"),
            DiscountType::Percent => write!(f, "percent"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CouponScope {
    All,
    Mall,
    Rental,
}

impl std::fmt::Display for CouponScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CouponScope::All => write!(f, "all"),
            CouponScope::Mall => write!(f, "mall"),
            CouponScope::Rental => write!(f, "rental"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CouponStatus {
    Active,
    Disabled,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Coupon {
    pub id: i64,
    pub name: String,
    pub discount_type: DiscountType,
    pub value: f64,
    pub min_amount: i64,
    pub max_discount: Option<i64>,
    pub scope: CouponScope,
    pub total_count: i64,
    pub received_count: i64,
    pub used_count: i64,
    pub per_user_limit: i64,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub valid_days: Option<i64>,
    pub status: CouponStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 计算订单金额下一张券的优惠额（美分）。纯函数，不触达任何共享状态。
///
/// 满减门槛不达标返回 0；百分比折扣四舍五入到分；结果不超过
/// max_discount（若设置），也不超过订单金额本身。
pub fn calculate_discount(
    discount_type: DiscountType,
    value: f64,
    min_amount: i64,
    max_discount: Option<i64>,
    order_amount: i64,
) -> i64 {
    if order_amount < min_amount {
        return 0;
    }

    let raw = match discount_type {
        DiscountType::Fixed => value.round() as i64,
        DiscountType::Percent => (order_amount as f64 * value).round() as i64,
    };

    let capped = match max_discount {
        Some(cap) => raw.min(cap),
        None => raw,
    };

    capped.clamp(0, order_amount)
}

impl Coupon {
    pub fn discount_for(&self, order_amount: i64) -> i64 {
        calculate_discount(
            self.discount_type,
            self.value,
            self.min_amount,
            self.max_discount,
            order_amount,
        )
    }

    /// 领取前的状态与时间窗校验，按固定顺序返回第一条违规。
    /// 库存与每人限领在服务层事务内单独处理。
    pub fn check_claim_window(&self, now: DateTime<Utc>) -> AppResult<()> {
        if self.status != CouponStatus::Active {
            return Err(AppError::CouponNotActive);
        }
        if now < self.start_time {
            return Err(AppError::CouponNotStarted);
        }
        if now > self.end_time {
            return Err(AppError::CouponExpired);
        }
        Ok(())
    }

    pub fn remaining_count(&self) -> i64 {
        (self.total_count - self.received_count).max(0)
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CouponResponse {
    pub id: i64,
    pub name: String,
    pub discount_type: DiscountType,
    pub value: f64,
    pub min_amount: i64,
    pub max_discount: Option<i64>,
    pub scope: CouponScope,
    pub remaining_count: i64,
    pub per_user_limit: i64,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub valid_days: Option<i64>,
    pub status: CouponStatus,
}

impl From<Coupon> for CouponResponse {
    fn from(coupon: Coupon) -> Self {
        Self {
            id: coupon.id,
            name: coupon.name.clone(),
            discount_type: coupon.discount_type,
            value: coupon.value,
            min_amount: coupon.min_amount,
            max_discount: coupon.max_discount,
            scope: coupon.scope,
            remaining_count: coupon.remaining_count(),
            per_user_limit: coupon.per_user_limit,
            start_time: coupon.start_time,
            end_time: coupon.end_time,
            valid_days: coupon.valid_days,
            status: coupon.status,
        }
    }
}

/// 券详情 + 当前用户的领取资格。
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CouponDetailResponse {
    pub coupon: CouponResponse,
    pub claimed_count: i64,
    pub remaining_claims: i64,
    pub claimable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unclaimable_code: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CouponQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub scope: Option<CouponScope>,
}
