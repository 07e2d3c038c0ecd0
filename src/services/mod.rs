pub mod campaign_service;
pub mod coupon_service;
pub mod user_coupon_service;

#[cfg(test)]
pub(crate) mod test_support;

pub use campaign_service::*;
pub use coupon_service::*;
pub use user_coupon_service::*;
