pub mod campaign;
pub mod coupon;
pub mod user_coupon;

pub use campaign::campaign_config;
pub use coupon::coupon_config;
pub use user_coupon::user_coupon_config;

use crate::error::AppError;
use actix_web::HttpRequest;

/// 网关鉴权后注入的用户标识。
pub(crate) fn user_id_from_request(req: &HttpRequest) -> Result<i64, AppError> {
    req.headers()
        .get("X-User-Id")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
        .ok_or_else(|| AppError::AuthError("Missing or invalid X-User-Id header".to_string()))
}
