use crate::database::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::*;
use crate::utils::{PageParams, Paginated};
use chrono::{DateTime, Utc};
use sqlx::FromRow;

const USER_COUPON_COLUMNS: &str =
    "id, user_id, coupon_id, status, claimed_at, expires_at, used_at, order_id";

/// 候选券行：user_coupon 加上算折扣所需的券面字段。
#[derive(Debug, FromRow)]
struct OfferRow {
    user_coupon_id: i64,
    coupon_id: i64,
    coupon_name: String,
    discount_type: DiscountType,
    value: f64,
    min_amount: i64,
    max_discount: Option<i64>,
    expires_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct RedeemRow {
    status: UserCouponStatus,
    expires_at: DateTime<Utc>,
    min_amount: i64,
    discount_type: DiscountType,
    value: f64,
    max_discount: Option<i64>,
}

#[derive(Clone)]
pub struct UserCouponService {
    pool: DbPool,
}

impl UserCouponService {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// “我的优惠券”列表，可按状态过滤。
    pub async fn list_user_coupons(
        &self,
        user_id: i64,
        query: &UserCouponQuery,
    ) -> AppResult<Paginated<UserCouponDetail>> {
        let params = PageParams::new(query.page, query.per_page);

        let select = "SELECT uc.id, uc.coupon_id, c.name AS coupon_name, c.discount_type, \
                      c.value, c.min_amount, c.max_discount, c.scope, uc.status, uc.claimed_at, \
                      uc.expires_at, uc.used_at, uc.order_id \
                      FROM user_coupons uc JOIN coupons c ON c.id = uc.coupon_id";

        let (total, items): (i64, Vec<UserCouponDetail>) = match query.status {
            Some(status) => {
                let total = sqlx::query_scalar(
                    "SELECT COUNT(*) FROM user_coupons WHERE user_id = ? AND status = ?",
                )
                .bind(user_id)
                .bind(status)
                .fetch_one(&self.pool)
                .await?;

                let items = sqlx::query_as::<_, UserCouponDetail>(&format!(
                    "{select} WHERE uc.user_id = ? AND uc.status = ? \
                     ORDER BY uc.claimed_at DESC LIMIT ? OFFSET ?"
                ))
                .bind(user_id)
                .bind(status)
                .bind(params.limit())
                .bind(params.offset())
                .fetch_all(&self.pool)
                .await?;

                (total, items)
            }
            None => {
                let total =
                    sqlx::query_scalar("SELECT COUNT(*) FROM user_coupons WHERE user_id = ?")
                        .bind(user_id)
                        .fetch_one(&self.pool)
                        .await?;

                let items = sqlx::query_as::<_, UserCouponDetail>(&format!(
                    "{select} WHERE uc.user_id = ? \
                     ORDER BY uc.claimed_at DESC LIMIT ? OFFSET ?"
                ))
                .bind(user_id)
                .bind(params.limit())
                .bind(params.offset())
                .fetch_all(&self.pool)
                .await?;

                (total, items)
            }
        };

        Ok(Paginated::new(items, params, total))
    }

    /// 下单页候选券：未使用、未过期、适用范围与门槛均满足，
    /// 按优惠额降序返回；同额先到期的在前，再按 id 兜底，保证确定性。
    pub async fn available_coupons_for_order(
        &self,
        user_id: i64,
        scope: CouponScope,
        order_amount: i64,
    ) -> AppResult<Vec<CouponOffer>> {
        let now = Utc::now();
        let rows: Vec<OfferRow> = sqlx::query_as(
            "SELECT uc.id AS user_coupon_id, c.id AS coupon_id, c.name AS coupon_name, \
                    c.discount_type, c.value, c.min_amount, c.max_discount, uc.expires_at \
             FROM user_coupons uc JOIN coupons c ON c.id = uc.coupon_id \
             WHERE uc.user_id = ? AND uc.status = 'unused' AND uc.expires_at > ? \
               AND c.scope IN ('all', ?) AND c.min_amount <= ?",
        )
        .bind(user_id)
        .bind(now)
        .bind(scope)
        .bind(order_amount)
        .fetch_all(&self.pool)
        .await?;

        let mut offers: Vec<CouponOffer> = rows
            .into_iter()
            .map(|r| CouponOffer {
                discount: calculate_discount(
                    r.discount_type,
                    r.value,
                    r.min_amount,
                    r.max_discount,
                    order_amount,
                ),
                user_coupon_id: r.user_coupon_id,
                coupon_id: r.coupon_id,
                coupon_name: r.coupon_name,
                discount_type: r.discount_type,
                min_amount: r.min_amount,
                expires_at: r.expires_at,
            })
            .collect();

        offers.sort_by(|a, b| {
            b.discount
                .cmp(&a.discount)
                .then_with(|| a.expires_at.cmp(&b.expires_at))
                .then_with(|| a.user_coupon_id.cmp(&b.user_coupon_id))
        });

        Ok(offers)
    }

    /// 最优券：候选里优惠额最大者；没有可用券时 (None, 0)。
    pub async fn best_coupon_for_order(
        &self,
        user_id: i64,
        scope: CouponScope,
        order_amount: i64,
    ) -> AppResult<BestOfferResponse> {
        let offers = self
            .available_coupons_for_order(user_id, scope, order_amount)
            .await?;

        match offers.into_iter().next() {
            Some(best) if best.discount > 0 => Ok(BestOfferResponse {
                discount: best.discount,
                best: Some(best),
            }),
            _ => Ok(BestOfferResponse {
                best: None,
                discount: 0,
            }),
        }
    }

    /// 核销：下单扣券。状态机 Unused → Used，连同 used_count 自增
    /// 在一个事务里落盘。状态流转带守卫（WHERE status = 'unused'），
    /// 并发重复核销只有一个能赢。
    pub async fn use_coupon(
        &self,
        user_coupon_id: i64,
        order_id: i64,
        order_amount: i64,
    ) -> AppResult<UseCouponResponse> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let row: Option<RedeemRow> = sqlx::query_as(
            "SELECT uc.status, uc.expires_at, c.min_amount, c.discount_type, c.value, c.max_discount \
             FROM user_coupons uc JOIN coupons c ON c.id = uc.coupon_id \
             WHERE uc.id = ?",
        )
        .bind(user_coupon_id)
        .fetch_optional(&mut *tx)
        .await?;
        let row = row.ok_or(AppError::UserCouponNotFound)?;

        if row.status != UserCouponStatus::Unused {
            return Err(AppError::UserCouponUsed);
        }
        // 状态可能滞后于未运行的过期扫描，到期时间要单独判
        if now > row.expires_at {
            return Err(AppError::UserCouponExpired);
        }
        if order_amount < row.min_amount {
            return Err(AppError::CouponAmountNotMet);
        }

        let discount = calculate_discount(
            row.discount_type,
            row.value,
            row.min_amount,
            row.max_discount,
            order_amount,
        );

        let user_coupon = sqlx::query_as::<_, UserCoupon>(&format!(
            "UPDATE user_coupons SET status = 'used', order_id = ?, used_at = ?, updated_at = ? \
             WHERE id = ? AND status = 'unused' \
             RETURNING {USER_COUPON_COLUMNS}"
        ))
        .bind(order_id)
        .bind(now)
        .bind(now)
        .bind(user_coupon_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(AppError::UserCouponUsed)?;

        sqlx::query("UPDATE coupons SET used_count = used_count + 1, updated_at = ? WHERE id = ?")
            .bind(now)
            .bind(user_coupon.coupon_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        log::info!(
            "User coupon {user_coupon_id} used on order {order_id}, discount {discount}"
        );
        Ok(UseCouponResponse {
            user_coupon,
            discount,
        })
    }

    /// 退券：订单取消/退款时把券还给用户。幂等，对非 Used 状态直接
    /// 返回成功，取消链路可以无脑调用。
    pub async fn unuse_coupon(&self, user_coupon_id: i64) -> AppResult<()> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let row: Option<(i64, UserCouponStatus)> =
            sqlx::query_as("SELECT coupon_id, status FROM user_coupons WHERE id = ?")
                .bind(user_coupon_id)
                .fetch_optional(&mut *tx)
                .await?;
        let (coupon_id, status) = row.ok_or(AppError::UserCouponNotFound)?;

        if status != UserCouponStatus::Used {
            return Ok(());
        }

        let affected = sqlx::query(
            "UPDATE user_coupons SET status = 'unused', order_id = NULL, used_at = NULL, \
             updated_at = ? WHERE id = ? AND status = 'used'",
        )
        .bind(now)
        .bind(user_coupon_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if affected > 0 {
            // 回滚核销计数，不降到 0 以下
            sqlx::query(
                "UPDATE coupons SET used_count = MAX(used_count - 1, 0), updated_at = ? \
                 WHERE id = ?",
            )
            .bind(now)
            .bind(coupon_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        log::info!("User coupon {user_coupon_id} returned to pool");
        Ok(())
    }

    /// 过期扫描：把所有已过期的 Unused 券批量置为 Expired。
    /// 只触碰 Unused 行，已核销的券即使过了到期时间也不受影响；
    /// 可重复、可与领取/核销并发执行。
    pub async fn expire_user_coupons(&self) -> AppResult<u64> {
        let now = Utc::now();
        let affected = sqlx::query(
            "UPDATE user_coupons SET status = 'expired', updated_at = ? \
             WHERE status = 'unused' AND expires_at < ?",
        )
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(affected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::{force_expire_at_past, seed_coupon, SeedCoupon};
    use crate::services::CouponService;

    async fn claim(pool: &DbPool, coupon_id: i64, user_id: i64) -> UserCoupon {
        CouponService::new(pool.clone())
            .claim(coupon_id, user_id)
            .await
            .unwrap()
    }

    async fn coupon_used_count(pool: &DbPool, coupon_id: i64) -> i64 {
        sqlx::query_scalar("SELECT used_count FROM coupons WHERE id = ?")
            .bind(coupon_id)
            .fetch_one(pool)
            .await
            .unwrap()
    }

    async fn user_coupon_status(pool: &DbPool, id: i64) -> UserCouponStatus {
        sqlx::query_scalar("SELECT status FROM user_coupons WHERE id = ?")
            .bind(id)
            .fetch_one(pool)
            .await
            .unwrap()
    }

    #[sqlx::test]
    async fn use_then_unuse_round_trip(pool: DbPool) {
        let service = UserCouponService::new(pool.clone());
        let coupon_id = seed_coupon(
            pool.clone(),
            SeedCoupon {
                value: 1000.0,
                min_amount: 5000,
                ..SeedCoupon::default()
            },
        )
        .await;
        let uc = claim(&pool, coupon_id, 1).await;

        let resp = service.use_coupon(uc.id, 9001, 10000).await.unwrap();
        assert_eq!(resp.discount, 1000);
        assert_eq!(resp.user_coupon.status, UserCouponStatus::Used);
        assert_eq!(resp.user_coupon.order_id, Some(9001));
        assert!(resp.user_coupon.used_at.is_some());
        assert_eq!(coupon_used_count(&pool, coupon_id).await, 1);

        service.unuse_coupon(uc.id).await.unwrap();
        assert_eq!(user_coupon_status(&pool, uc.id).await, UserCouponStatus::Unused);
        let (order_id, used_at): (Option<i64>, Option<DateTime<Utc>>) =
            sqlx::query_as("SELECT order_id, used_at FROM user_coupons WHERE id = ?")
                .bind(uc.id)
                .fetch_one(&pool)
                .await
                .unwrap();
        assert!(order_id.is_none());
        assert!(used_at.is_none());
        // 一核销一回退，计数净值不变
        assert_eq!(coupon_used_count(&pool, coupon_id).await, 0);
    }

    #[sqlx::test]
    async fn unuse_is_idempotent(pool: DbPool) {
        let service = UserCouponService::new(pool.clone());
        let coupon_id = seed_coupon(pool.clone(), SeedCoupon::default()).await;
        let uc = claim(&pool, coupon_id, 1).await;

        // 未核销的券直接退：成功的空操作
        service.unuse_coupon(uc.id).await.unwrap();
        assert_eq!(coupon_used_count(&pool, coupon_id).await, 0);

        service.use_coupon(uc.id, 1, 10000).await.unwrap();
        service.unuse_coupon(uc.id).await.unwrap();
        service.unuse_coupon(uc.id).await.unwrap();
        assert_eq!(coupon_used_count(&pool, coupon_id).await, 0);

        assert!(matches!(
            service.unuse_coupon(424242).await,
            Err(AppError::UserCouponNotFound)
        ));
    }

    #[sqlx::test]
    async fn use_rejects_non_unused(pool: DbPool) {
        let service = UserCouponService::new(pool.clone());
        let coupon_id = seed_coupon(pool.clone(), SeedCoupon::default()).await;
        let uc = claim(&pool, coupon_id, 1).await;

        service.use_coupon(uc.id, 1, 10000).await.unwrap();
        assert!(matches!(
            service.use_coupon(uc.id, 2, 10000).await,
            Err(AppError::UserCouponUsed)
        ));
        assert_eq!(coupon_used_count(&pool, coupon_id).await, 1);

        assert!(matches!(
            service.use_coupon(424242, 1, 10000).await,
            Err(AppError::UserCouponNotFound)
        ));
    }

    #[sqlx::test]
    async fn expiry_takes_precedence_over_stale_status(pool: DbPool) {
        let service = UserCouponService::new(pool.clone());
        let coupon_id = seed_coupon(pool.clone(), SeedCoupon::default()).await;
        let uc = claim(&pool, coupon_id, 1).await;

        // 扫描还没跑过：状态仍是 Unused，但已到期
        force_expire_at_past(pool.clone(), uc.id, 1).await;
        assert!(matches!(
            service.use_coupon(uc.id, 1, 10000).await,
            Err(AppError::UserCouponExpired)
        ));
    }

    #[sqlx::test]
    async fn use_rejects_amount_below_threshold(pool: DbPool) {
        let service = UserCouponService::new(pool.clone());
        let coupon_id = seed_coupon(
            pool.clone(),
            SeedCoupon {
                min_amount: 5000,
                ..SeedCoupon::default()
            },
        )
        .await;
        let uc = claim(&pool, coupon_id, 1).await;

        assert!(matches!(
            service.use_coupon(uc.id, 1, 3000).await,
            Err(AppError::CouponAmountNotMet)
        ));
    }

    #[sqlx::test]
    async fn sweep_only_touches_overdue_unused_rows(pool: DbPool) {
        let service = UserCouponService::new(pool.clone());
        let coupon_id = seed_coupon(pool.clone(), SeedCoupon::default()).await;

        let overdue_unused = claim(&pool, coupon_id, 1).await;
        let overdue_used = claim(&pool, coupon_id, 2).await;
        let fresh_unused = claim(&pool, coupon_id, 3).await;

        service.use_coupon(overdue_used.id, 1, 10000).await.unwrap();
        force_expire_at_past(pool.clone(), overdue_unused.id, 1).await;
        force_expire_at_past(pool.clone(), overdue_used.id, 1).await;

        let affected = service.expire_user_coupons().await.unwrap();
        assert_eq!(affected, 1);

        assert_eq!(
            user_coupon_status(&pool, overdue_unused.id).await,
            UserCouponStatus::Expired
        );
        assert_eq!(
            user_coupon_status(&pool, overdue_used.id).await,
            UserCouponStatus::Used
        );
        assert_eq!(
            user_coupon_status(&pool, fresh_unused.id).await,
            UserCouponStatus::Unused
        );

        // 再跑一遍没有新行可扫
        assert_eq!(service.expire_user_coupons().await.unwrap(), 0);
    }

    #[sqlx::test]
    async fn best_offer_picks_max_discount(pool: DbPool) {
        let service = UserCouponService::new(pool.clone());
        let fixed = seed_coupon(
            pool.clone(),
            SeedCoupon {
                discount_type: DiscountType::Fixed,
                value: 1000.0,
                ..SeedCoupon::default()
            },
        )
        .await;
        let percent = seed_coupon(
            pool.clone(),
            SeedCoupon {
                discount_type: DiscountType::Percent,
                value: 0.2,
                ..SeedCoupon::default()
            },
        )
        .await;
        claim(&pool, fixed, 1).await;
        let percent_uc = claim(&pool, percent, 1).await;

        let best = service
            .best_coupon_for_order(1, CouponScope::Mall, 10000)
            .await
            .unwrap();
        // 20% 抵 2000，胜过固定 1000
        assert_eq!(best.discount, 2000);
        assert_eq!(best.best.unwrap().user_coupon_id, percent_uc.id);
    }

    #[sqlx::test]
    async fn best_offer_none_when_no_candidate(pool: DbPool) {
        let service = UserCouponService::new(pool.clone());
        let coupon_id = seed_coupon(
            pool.clone(),
            SeedCoupon {
                min_amount: 50000,
                ..SeedCoupon::default()
            },
        )
        .await;
        claim(&pool, coupon_id, 1).await;

        // 门槛不达标，无候选
        let best = service
            .best_coupon_for_order(1, CouponScope::Mall, 10000)
            .await
            .unwrap();
        assert!(best.best.is_none());
        assert_eq!(best.discount, 0);
    }

    #[sqlx::test]
    async fn offers_exclude_wrong_scope_and_spent_coupons(pool: DbPool) {
        let service = UserCouponService::new(pool.clone());
        let mall_only = seed_coupon(
            pool.clone(),
            SeedCoupon {
                scope: CouponScope::Mall,
                ..SeedCoupon::default()
            },
        )
        .await;
        let universal = seed_coupon(pool.clone(), SeedCoupon::default()).await;

        claim(&pool, mall_only, 1).await;
        let universal_uc = claim(&pool, universal, 1).await;

        let offers = service
            .available_coupons_for_order(1, CouponScope::Rental, 10000)
            .await
            .unwrap();
        // mall 专属券不适用于 rental 订单
        assert_eq!(offers.len(), 1);
        assert_eq!(offers[0].user_coupon_id, universal_uc.id);

        service.use_coupon(universal_uc.id, 1, 10000).await.unwrap();
        let offers = service
            .available_coupons_for_order(1, CouponScope::Rental, 10000)
            .await
            .unwrap();
        assert!(offers.is_empty());
    }

    #[sqlx::test]
    async fn equal_discounts_tie_break_to_soonest_expiry(pool: DbPool) {
        let service = UserCouponService::new(pool.clone());
        let long_lived = seed_coupon(pool.clone(), SeedCoupon::default()).await;
        let short_lived = seed_coupon(
            pool.clone(),
            SeedCoupon {
                valid_days: Some(1),
                ..SeedCoupon::default()
            },
        )
        .await;

        // 先领长效的，id 更小；同额时仍应选先到期的那张
        claim(&pool, long_lived, 1).await;
        let short_uc = claim(&pool, short_lived, 1).await;

        let best = service
            .best_coupon_for_order(1, CouponScope::Mall, 10000)
            .await
            .unwrap();
        assert_eq!(best.best.unwrap().user_coupon_id, short_uc.id);
    }
}
