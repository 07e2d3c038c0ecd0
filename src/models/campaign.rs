use crate::error::AppResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CampaignType {
    TieredDiscount,
    Gift,
    FlashSale,
    GroupBuy,
}

impl std::fmt::Display for CampaignType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CampaignType::TieredDiscount => write!(f, "tiered_discount"),
            CampaignType::Gift => write!(f, "gift"),
            CampaignType::FlashSale => write!(f, "flash_sale"),
            CampaignType::GroupBuy => write!(f, "group_buy"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CampaignStatus {
    Active,
    Disabled,
}

/// 由时间窗与状态推导出的展示态，不落库。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CampaignState {
    NotStarted,
    Active,
    Ended,
    Disabled,
}

/// 满减阶梯，持久化为 rules 列中的 JSON 数组。存储顺序无保证。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CampaignTier {
    /// 门槛（美分）
    pub min_amount: i64,
    /// 抵扣（美分）
    pub discount_amount: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Campaign {
    pub id: i64,
    pub name: String,
    pub campaign_type: CampaignType,
    /// JSON 编码的 `Vec<CampaignTier>`
    pub rules: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: CampaignStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Campaign {
    pub fn tiers(&self) -> AppResult<Vec<CampaignTier>> {
        Ok(serde_json::from_str(&self.rules)?)
    }

    pub fn state(&self, now: DateTime<Utc>) -> CampaignState {
        if self.status == CampaignStatus::Disabled {
            return CampaignState::Disabled;
        }
        if now < self.start_time {
            CampaignState::NotStarted
        } else if now > self.end_time {
            CampaignState::Ended
        } else {
            CampaignState::Active
        }
    }
}

/// 所有满足门槛的阶梯中取抵扣最大者。阶梯无序，必须全量扫描，
/// 不能按首个命中返回。
pub fn best_tier_discount(tiers: &[CampaignTier], order_amount: i64) -> i64 {
    tiers
        .iter()
        .filter(|t| order_amount >= t.min_amount)
        .map(|t| t.discount_amount)
        .max()
        .unwrap_or(0)
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CampaignResponse {
    pub id: i64,
    pub name: String,
    pub campaign_type: CampaignType,
    pub tiers: Vec<CampaignTier>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub state: CampaignState,
}

impl CampaignResponse {
    pub fn from_campaign(campaign: &Campaign, now: DateTime<Utc>) -> AppResult<Self> {
        Ok(Self {
            id: campaign.id,
            name: campaign.name.clone(),
            campaign_type: campaign.campaign_type,
            tiers: campaign.tiers()?,
            start_time: campaign.start_time,
            end_time: campaign.end_time,
            state: campaign.state(now),
        })
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CampaignQuery {
    pub campaign_type: Option<CampaignType>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CampaignDiscountQuery {
    /// 订单金额（美分）
    pub order_amount: i64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CampaignDiscountResponse {
    pub discount: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub campaign: Option<CampaignResponse>,
}
