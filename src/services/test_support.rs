//! Row seeding helpers shared by the service test suites.

use crate::database::DbPool;
use crate::models::{CampaignStatus, CampaignTier, CampaignType, CouponScope, DiscountType};
use chrono::{Duration, Utc};

pub struct SeedCoupon {
    pub discount_type: DiscountType,
    pub value: f64,
    pub min_amount: i64,
    pub max_discount: Option<i64>,
    pub scope: CouponScope,
    pub total_count: i64,
    pub per_user_limit: i64,
    /// 相对当前时间的开售偏移（小时），负数表示已开始
    pub start_in_hours: i64,
    pub end_in_hours: i64,
    pub valid_days: Option<i64>,
    pub active: bool,
}

impl Default for SeedCoupon {
    fn default() -> Self {
        Self {
            discount_type: DiscountType::Fixed,
            value: 1000.0,
            min_amount: 0,
            max_discount: None,
            scope: CouponScope::All,
            total_count: 100,
            per_user_limit: 5,
            start_in_hours: -1,
            end_in_hours: 24 * 30,
            valid_days: None,
            active: true,
        }
    }
}

pub async fn seed_coupon(pool: DbPool, seed: SeedCoupon) -> i64 {
    let now = Utc::now();
    let status = if seed.active { "active" } else { "disabled" };

    sqlx::query_scalar(
        "INSERT INTO coupons (name, discount_type, value, min_amount, max_discount, scope, \
         total_count, per_user_limit, start_time, end_time, valid_days, status, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) RETURNING id",
    )
    .bind("test coupon")
    .bind(seed.discount_type)
    .bind(seed.value)
    .bind(seed.min_amount)
    .bind(seed.max_discount)
    .bind(seed.scope)
    .bind(seed.total_count)
    .bind(seed.per_user_limit)
    .bind(now + Duration::hours(seed.start_in_hours))
    .bind(now + Duration::hours(seed.end_in_hours))
    .bind(seed.valid_days)
    .bind(status)
    .bind(now)
    .bind(now)
    .fetch_one(&pool)
    .await
    .expect("seed coupon")
}

pub struct SeedCampaign {
    pub campaign_type: CampaignType,
    pub tiers: Vec<CampaignTier>,
    pub start_in_hours: i64,
    pub end_in_hours: i64,
    pub status: CampaignStatus,
}

impl Default for SeedCampaign {
    fn default() -> Self {
        Self {
            campaign_type: CampaignType::TieredDiscount,
            tiers: vec![
                CampaignTier {
                    min_amount: 10000,
                    discount_amount: 1000,
                },
                CampaignTier {
                    min_amount: 20000,
                    discount_amount: 3000,
                },
            ],
            start_in_hours: -1,
            end_in_hours: 24,
            status: CampaignStatus::Active,
        }
    }
}

pub async fn seed_campaign(pool: DbPool, seed: SeedCampaign) -> i64 {
    let now = Utc::now();
    let rules = serde_json::to_string(&seed.tiers).expect("serialize tiers");

    sqlx::query_scalar(
        "INSERT INTO campaigns (name, campaign_type, rules, start_time, end_time, status, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?) RETURNING id",
    )
    .bind("test campaign")
    .bind(seed.campaign_type)
    .bind(rules)
    .bind(now + Duration::hours(seed.start_in_hours))
    .bind(now + Duration::hours(seed.end_in_hours))
    .bind(seed.status)
    .bind(now)
    .bind(now)
    .fetch_one(&pool)
    .await
    .expect("seed campaign")
}

/// 直接把某张用户券的到期时间改到过去，用于过期路径测试。
pub async fn force_expire_at_past(pool: DbPool, user_coupon_id: i64, hours_ago: i64) {
    let past = Utc::now() - Duration::hours(hours_ago);
    sqlx::query("UPDATE user_coupons SET expires_at = ? WHERE id = ?")
        .bind(past)
        .bind(user_coupon_id)
        .execute(&pool)
        .await
        .expect("force expire");
}
