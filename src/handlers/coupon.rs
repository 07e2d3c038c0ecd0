use crate::handlers::user_id_from_request;
use crate::models::*;
use crate::services::CouponService;
use actix_web::{web, HttpRequest, HttpResponse, ResponseError, Result};
use serde_json::json;

#[utoipa::path(
    get,
    path = "/coupons",
    tag = "coupon",
    params(
        ("page" = Option<u32>, Query, description = "页码"),
        ("per_page" = Option<u32>, Query, description = "每页数量"),
        ("scope" = Option<String>, Query, description = "适用范围: all/mall/rental")
    ),
    responses(
        (status = 200, description = "获取可领优惠券列表成功")
    )
)]
pub async fn get_coupons(
    coupon_service: web::Data<CouponService>,
    query: web::Query<CouponQuery>,
) -> Result<HttpResponse> {
    match coupon_service.list_claimable(&query).await {
        Ok(response) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": response
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/coupons/{id}",
    tag = "coupon",
    params(
        ("id" = i64, Path, description = "优惠券ID")
    ),
    responses(
        (status = 200, description = "获取优惠券详情成功", body = CouponDetailResponse),
        (status = 404, description = "优惠券不存在")
    )
)]
pub async fn get_coupon_detail(
    coupon_service: web::Data<CouponService>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    let user_id = match user_id_from_request(&req) {
        Ok(user_id) => user_id,
        Err(e) => return Ok(e.error_response()),
    };

    match coupon_service
        .get_coupon_detail(path.into_inner(), user_id)
        .await
    {
        Ok(response) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": response
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/coupons/{id}/claim",
    tag = "coupon",
    params(
        ("id" = i64, Path, description = "优惠券ID")
    ),
    responses(
        (status = 200, description = "领取成功", body = UserCoupon),
        (status = 404, description = "优惠券不存在"),
        (status = 409, description = "不可领取：未上架/未开始/已结束/已领完/超过限领")
    )
)]
pub async fn claim_coupon(
    coupon_service: web::Data<CouponService>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    let user_id = match user_id_from_request(&req) {
        Ok(user_id) => user_id,
        Err(e) => return Ok(e.error_response()),
    };

    match coupon_service.claim(path.into_inner(), user_id).await {
        Ok(response) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": response
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn coupon_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/coupons")
            .route("", web::get().to(get_coupons))
            .route("/{id}", web::get().to(get_coupon_detail))
            .route("/{id}/claim", web::post().to(claim_coupon)),
    );
}
