//! Background scheduled tasks for the application.
//!
//! The only recurring job here is the user-coupon expiration sweep. Call
//! `spawn_all` once during startup to launch it.

use crate::config::SweeperConfig;
use crate::services::UserCouponService;

/// Spawn all background tasks.
///
/// Notes
/// - The sweep is idempotent and scoped to overdue Unused rows, so it is
///   safe to run on any interval and alongside claim/use/unuse traffic.
/// - This function detaches tasks via `tokio::spawn`; it does not block.
pub fn spawn_all(user_coupon_service: UserCouponService, sweeper: SweeperConfig) {
    // 定期过期扫描
    {
        let svc = user_coupon_service.clone();
        let interval = std::time::Duration::from_secs(sweeper.interval_secs.max(1));
        tokio::spawn(async move {
            loop {
                match svc.expire_user_coupons().await {
                    Ok(n) if n > 0 => log::info!("Expired user coupons: {n}"),
                    Ok(_) => {}
                    Err(e) => log::error!("Failed to expire user coupons: {e:?}"),
                }
                tokio::time::sleep(interval).await;
            }
        });
    }
}
