pub mod campaign;
pub mod coupon;
pub mod user_coupon;

pub use campaign::*;
pub use coupon::*;
pub use user_coupon::*;
