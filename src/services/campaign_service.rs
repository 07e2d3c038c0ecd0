use crate::database::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::*;
use chrono::Utc;

const CAMPAIGN_COLUMNS: &str =
    "id, name, campaign_type, rules, start_time, end_time, status, created_at, updated_at";

#[derive(Clone)]
pub struct CampaignService {
    pool: DbPool,
}

impl CampaignService {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// 满减活动报价：找当前生效的满减活动（设计上至多一个），
    /// 全量扫描其阶梯取最大抵扣。没有活动或没有达标阶梯都按
    /// 无优惠返回，不算错误。
    pub async fn calculate_discount(&self, order_amount: i64) -> AppResult<CampaignDiscountResponse> {
        let now = Utc::now();
        let campaign = sqlx::query_as::<_, Campaign>(&format!(
            "SELECT {CAMPAIGN_COLUMNS} FROM campaigns \
             WHERE campaign_type = 'tiered_discount' AND status = 'active' \
               AND start_time <= ? AND end_time >= ? \
             ORDER BY start_time DESC LIMIT 1"
        ))
        .bind(now)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        let Some(campaign) = campaign else {
            return Ok(CampaignDiscountResponse {
                discount: 0,
                campaign: None,
            });
        };

        let discount = best_tier_discount(&campaign.tiers()?, order_amount);
        if discount == 0 {
            return Ok(CampaignDiscountResponse {
                discount: 0,
                campaign: None,
            });
        }

        Ok(CampaignDiscountResponse {
            discount,
            campaign: Some(CampaignResponse::from_campaign(&campaign, now)?),
        })
    }

    pub async fn list_campaigns(&self, query: &CampaignQuery) -> AppResult<Vec<CampaignResponse>> {
        let now = Utc::now();

        let campaigns: Vec<Campaign> = match query.campaign_type {
            Some(campaign_type) => {
                sqlx::query_as(&format!(
                    "SELECT {CAMPAIGN_COLUMNS} FROM campaigns WHERE campaign_type = ? \
                     ORDER BY start_time DESC"
                ))
                .bind(campaign_type)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as(&format!(
                    "SELECT {CAMPAIGN_COLUMNS} FROM campaigns ORDER BY start_time DESC"
                ))
                .fetch_all(&self.pool)
                .await?
            }
        };

        campaigns
            .iter()
            .map(|c| CampaignResponse::from_campaign(c, now))
            .collect()
    }

    pub async fn get_campaign_detail(&self, campaign_id: i64) -> AppResult<CampaignResponse> {
        let campaign = sqlx::query_as::<_, Campaign>(&format!(
            "SELECT {CAMPAIGN_COLUMNS} FROM campaigns WHERE id = ?"
        ))
        .bind(campaign_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AppError::CampaignNotFound)?;

        CampaignResponse::from_campaign(&campaign, Utc::now())
    }
}
