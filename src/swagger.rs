use actix_web::web;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::handlers;
use crate::models::*;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::coupon::get_coupons,
        handlers::coupon::get_coupon_detail,
        handlers::coupon::claim_coupon,
        handlers::user_coupon::get_user_coupons,
        handlers::user_coupon::get_best_coupon,
        handlers::user_coupon::get_available_coupons,
        handlers::user_coupon::use_coupon,
        handlers::user_coupon::unuse_coupon,
        handlers::campaign::get_campaigns,
        handlers::campaign::get_campaign_discount,
        handlers::campaign::get_campaign_detail,
    ),
    components(
        schemas(
            Coupon,
            CouponResponse,
            CouponDetailResponse,
            DiscountType,
            CouponScope,
            CouponStatus,
            UserCoupon,
            UserCouponDetail,
            UserCouponStatus,
            CouponOffer,
            BestOfferResponse,
            UseCouponRequest,
            UseCouponResponse,
            Campaign,
            CampaignResponse,
            CampaignTier,
            CampaignType,
            CampaignStatus,
            CampaignState,
            CampaignDiscountResponse,
        )
    ),
    tags(
        (name = "coupon", description = "领券中心"),
        (name = "user-coupon", description = "我的优惠券与核销"),
        (name = "campaign", description = "营销活动")
    )
)]
pub struct ApiDoc;

pub fn swagger_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()),
    );
}
