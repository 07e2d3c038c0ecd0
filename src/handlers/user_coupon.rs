use crate::handlers::user_id_from_request;
use crate::models::*;
use crate::services::UserCouponService;
use actix_web::{web, HttpRequest, HttpResponse, ResponseError, Result};
use serde_json::json;

#[utoipa::path(
    get,
    path = "/user-coupons",
    tag = "user-coupon",
    params(
        ("page" = Option<u32>, Query, description = "页码"),
        ("per_page" = Option<u32>, Query, description = "每页数量"),
        ("status" = Option<String>, Query, description = "状态: unused/used/expired")
    ),
    responses(
        (status = 200, description = "获取我的优惠券列表成功"),
        (status = 401, description = "未授权")
    )
)]
pub async fn get_user_coupons(
    user_coupon_service: web::Data<UserCouponService>,
    req: HttpRequest,
    query: web::Query<UserCouponQuery>,
) -> Result<HttpResponse> {
    let user_id = match user_id_from_request(&req) {
        Ok(user_id) => user_id,
        Err(e) => return Ok(e.error_response()),
    };

    match user_coupon_service.list_user_coupons(user_id, &query).await {
        Ok(response) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": response
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/user-coupons/best",
    tag = "user-coupon",
    params(
        ("scope" = String, Query, description = "订单业务范围: all/mall/rental"),
        ("order_amount" = i64, Query, description = "订单金额（美分）")
    ),
    responses(
        (status = 200, description = "最优券计算成功", body = BestOfferResponse),
        (status = 401, description = "未授权")
    )
)]
pub async fn get_best_coupon(
    user_coupon_service: web::Data<UserCouponService>,
    req: HttpRequest,
    query: web::Query<OfferQuery>,
) -> Result<HttpResponse> {
    let user_id = match user_id_from_request(&req) {
        Ok(user_id) => user_id,
        Err(e) => return Ok(e.error_response()),
    };

    match user_coupon_service
        .best_coupon_for_order(user_id, query.scope, query.order_amount)
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
    get,
    path = "/user-coupons/available",
    tag = "user-coupon",
    params(
        ("scope" = String, Query, description = "订单业务范围: all/mall/rental"),
        ("order_amount" = i64, Query, description = "订单金额（美分）")
    ),
    responses(
        (status = 200, description = "候选券列表计算成功"),
        (status = 401, description = "未授权")
    )
)]
pub async fn get_available_coupons(
    user_coupon_service: web::Data<UserCouponService>,
    req: HttpRequest,
    query: web::Query<OfferQuery>,
) -> Result<HttpResponse> {
    let user_id = match user_id_from_request(&req) {
        Ok(user_id) => user_id,
        Err(e) => return Ok(e.error_response()),
    };

    match user_coupon_service
        .available_coupons_for_order(user_id, query.scope, query.order_amount)
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
    path = "/user-coupons/{id}/use",
    tag = "user-coupon",
    request_body = UseCouponRequest,
    params(
        ("id" = i64, Path, description = "用户优惠券ID")
    ),
    responses(
        (status = 200, description = "核销成功", body = UseCouponResponse),
        (status = 404, description = "用户优惠券不存在"),
        (status = 409, description = "不可核销：已使用/已过期/金额不达门槛")
    )
)]
pub async fn use_coupon(
    user_coupon_service: web::Data<UserCouponService>,
    path: web::Path<i64>,
    request: web::Json<UseCouponRequest>,
) -> Result<HttpResponse> {
    match user_coupon_service
        .use_coupon(path.into_inner(), request.order_id, request.order_amount)
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
    path = "/user-coupons/{id}/unuse",
    tag = "user-coupon",
    params(
        ("id" = i64, Path, description = "用户优惠券ID")
    ),
    responses(
        (status = 200, description = "退券成功（对未核销的券为幂等空操作）"),
        (status = 404, description = "用户优惠券不存在")
    )
)]
pub async fn unuse_coupon(
    user_coupon_service: web::Data<UserCouponService>,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    match user_coupon_service.unuse_coupon(path.into_inner()).await {
        Ok(()) => Ok(HttpResponse::Ok().json(json!({
            "success": true
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn user_coupon_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/user-coupons")
            .route("", web::get().to(get_user_coupons))
            .route("/best", web::get().to(get_best_coupon))
            .route("/available", web::get().to(get_available_coupons))
            .route("/{id}/use", web::post().to(use_coupon))
            .route("/{id}/unuse", web::post().to(unuse_coupon)),
    );
}
