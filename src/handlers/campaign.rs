use crate::models::*;
use crate::services::CampaignService;
use actix_web::{web, HttpResponse, ResponseError, Result};
use serde_json::json;

#[utoipa::path(
    get,
    path = "/campaigns",
    tag = "campaign",
    params(
        ("campaign_type" = Option<String>, Query, description = "活动类型: tiered_discount/gift/flash_sale/group_buy")
    ),
    responses(
        (status = 200, description = "获取活动列表成功")
    )
)]
pub async fn get_campaigns(
    campaign_service: web::Data<CampaignService>,
    query: web::Query<CampaignQuery>,
) -> Result<HttpResponse> {
    match campaign_service.list_campaigns(&query).await {
        Ok(response) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": response
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/campaigns/discount",
    tag = "campaign",
    params(
        ("order_amount" = i64, Query, description = "订单金额（美分）")
    ),
    responses(
        (status = 200, description = "满减报价成功", body = CampaignDiscountResponse)
    )
)]
pub async fn get_campaign_discount(
    campaign_service: web::Data<CampaignService>,
    query: web::Query<CampaignDiscountQuery>,
) -> Result<HttpResponse> {
    match campaign_service.calculate_discount(query.order_amount).await {
        Ok(response) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": response
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/campaigns/{id}",
    tag = "campaign",
    params(
        ("id" = i64, Path, description = "活动ID")
    ),
    responses(
        (status = 200, description = "获取活动详情成功", body = CampaignResponse),
        (status = 404, description = "活动不存在")
    )
)]
pub async fn get_campaign_detail(
    campaign_service: web::Data<CampaignService>,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    match campaign_service.get_campaign_detail(path.into_inner()).await {
        Ok(response) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": response
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn campaign_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/campaigns")
            .route("", web::get().to(get_campaigns))
            // 固定路径要排在 {id} 前面
            .route("/discount", web::get().to(get_campaign_discount))
            .route("/{id}", web::get().to(get_campaign_detail)),
    );
}
