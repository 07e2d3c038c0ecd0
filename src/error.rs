use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    // 基础设施错误
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    MigrateError(#[from] sqlx::migrate::MigrateError),

    #[error("JSON serialization/deserialization error: {0}")]
    SerdeJsonError(#[from] serde_json::Error),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Auth error: {0}")]
    AuthError(String),

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("Internal server error: {0}")]
    InternalError(String),

    // 优惠券领取
    #[error("Coupon not found")]
    CouponNotFound,

    #[error("Coupon is not active")]
    CouponNotActive,

    #[error("Coupon claim period has not started")]
    CouponNotStarted,

    #[error("Coupon claim period has ended")]
    CouponExpired,

    #[error("Coupon is sold out")]
    CouponSoldOut,

    #[error("Per-user claim limit reached")]
    CouponLimitExceeded,

    // 优惠券核销
    #[error("User coupon not found")]
    UserCouponNotFound,

    #[error("User coupon is not unused")]
    UserCouponUsed,

    #[error("User coupon has expired")]
    UserCouponExpired,

    #[error("Order amount does not meet the coupon threshold")]
    CouponAmountNotMet,

    // 营销活动
    #[error("Campaign not found")]
    CampaignNotFound,
}

impl AppError {
    /// Stable machine-readable code surfaced to API clients.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::DatabaseError(_) => "DATABASE_ERROR",
            AppError::MigrateError(_) => "MIGRATION_ERROR",
            AppError::SerdeJsonError(_) => "SERDE_JSON_ERROR",
            AppError::ValidationError(_) => "VALIDATION_ERROR",
            AppError::AuthError(_) => "AUTH_ERROR",
            AppError::ConfigError(_) => "CONFIG_ERROR",
            AppError::InternalError(_) => "INTERNAL_ERROR",
            AppError::CouponNotFound => "COUPON_NOT_FOUND",
            AppError::CouponNotActive => "COUPON_NOT_ACTIVE",
            AppError::CouponNotStarted => "COUPON_NOT_STARTED",
            AppError::CouponExpired => "COUPON_EXPIRED",
            AppError::CouponSoldOut => "COUPON_SOLD_OUT",
            AppError::CouponLimitExceeded => "COUPON_LIMIT_EXCEEDED",
            AppError::UserCouponNotFound => "USER_COUPON_NOT_FOUND",
            AppError::UserCouponUsed => "USER_COUPON_USED",
            AppError::UserCouponExpired => "USER_COUPON_EXPIRED",
            AppError::CouponAmountNotMet => "COUPON_AMOUNT_NOT_MET",
            AppError::CampaignNotFound => "CAMPAIGN_NOT_FOUND",
        }
    }
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        use actix_web::http::StatusCode;

        let (status_code, message) = match self {
            AppError::ValidationError(msg) => {
                log::warn!("Validation error: {msg}");
                (StatusCode::BAD_REQUEST, msg.clone())
            }
            AppError::AuthError(msg) => {
                log::warn!("Authentication error: {msg}");
                (StatusCode::UNAUTHORIZED, msg.clone())
            }
            AppError::CouponNotFound
            | AppError::UserCouponNotFound
            | AppError::CampaignNotFound => (StatusCode::NOT_FOUND, self.to_string()),
            // 业务规则冲突，调用方根据 code 提示用户
            AppError::CouponNotActive
            | AppError::CouponNotStarted
            | AppError::CouponExpired
            | AppError::CouponSoldOut
            | AppError::CouponLimitExceeded
            | AppError::UserCouponUsed
            | AppError::UserCouponExpired
            | AppError::CouponAmountNotMet => (StatusCode::CONFLICT, self.to_string()),
            AppError::DatabaseError(err) => {
                log::error!("Database error: {err}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Database error".to_string(),
                )
            }
            AppError::MigrateError(err) => {
                log::error!("Migration error: {err}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Migration error".to_string(),
                )
            }
            _ => {
                log::error!("Internal error: {self}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        HttpResponse::build(status_code).json(json!({
            "success": false,
            "error": {
                "code": self.code(),
                "message": message
            }
        }))
    }
}
