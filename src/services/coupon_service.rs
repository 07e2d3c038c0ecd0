use crate::database::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::*;
use crate::utils::{PageParams, Paginated};
use chrono::Utc;

const COUPON_COLUMNS: &str = "id, name, discount_type, value, min_amount, max_discount, scope, \
     total_count, received_count, used_count, per_user_limit, start_time, end_time, valid_days, \
     status, created_at, updated_at";

#[derive(Clone)]
pub struct CouponService {
    pool: DbPool,
}

impl CouponService {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn get_coupon(&self, coupon_id: i64) -> AppResult<Coupon> {
        let coupon = sqlx::query_as::<_, Coupon>(&format!(
            "SELECT {COUPON_COLUMNS} FROM coupons WHERE id = ?"
        ))
        .bind(coupon_id)
        .fetch_optional(&self.pool)
        .await?;

        coupon.ok_or(AppError::CouponNotFound)
    }

    /// 领券中心列表：当前可领（上架且在领取时间窗内）的券。
    pub async fn list_claimable(&self, query: &CouponQuery) -> AppResult<Paginated<CouponResponse>> {
        let params = PageParams::new(query.page, query.per_page);
        let now = Utc::now();

        let (total, coupons): (i64, Vec<Coupon>) = match query.scope {
            Some(scope) => {
                let total = sqlx::query_scalar(
                    "SELECT COUNT(*) FROM coupons \
                     WHERE status = 'active' AND start_time <= ? AND end_time >= ? \
                       AND scope IN ('all', ?)",
                )
                .bind(now)
                .bind(now)
                .bind(scope)
                .fetch_one(&self.pool)
                .await?;

                let coupons = sqlx::query_as::<_, Coupon>(&format!(
                    "SELECT {COUPON_COLUMNS} FROM coupons \
                     WHERE status = 'active' AND start_time <= ? AND end_time >= ? \
                       AND scope IN ('all', ?) \
                     ORDER BY end_time ASC LIMIT ? OFFSET ?"
                ))
                .bind(now)
                .bind(now)
                .bind(scope)
                .bind(params.limit())
                .bind(params.offset())
                .fetch_all(&self.pool)
                .await?;

                (total, coupons)
            }
            None => {
                let total = sqlx::query_scalar(
                    "SELECT COUNT(*) FROM coupons \
                     WHERE status = 'active' AND start_time <= ? AND end_time >= ?",
                )
                .bind(now)
                .bind(now)
                .fetch_one(&self.pool)
                .await?;

                let coupons = sqlx::query_as::<_, Coupon>(&format!(
                    "SELECT {COUPON_COLUMNS} FROM coupons \
                     WHERE status = 'active' AND start_time <= ? AND end_time >= ? \
                     ORDER BY end_time ASC LIMIT ? OFFSET ?"
                ))
                .bind(now)
                .bind(now)
                .bind(params.limit())
                .bind(params.offset())
                .fetch_all(&self.pool)
                .await?;

                (total, coupons)
            }
        };

        let items = coupons.into_iter().map(CouponResponse::from).collect();
        Ok(Paginated::new(items, params, total))
    }

    /// 券详情 + 当前用户的领取资格。
    pub async fn get_coupon_detail(
        &self,
        coupon_id: i64,
        user_id: i64,
    ) -> AppResult<CouponDetailResponse> {
        let now = Utc::now();
        let coupon = self.get_coupon(coupon_id).await?;
        let claimed_count = self.user_claim_count(coupon_id, user_id).await?;

        let unclaimable = if let Err(e) = coupon.check_claim_window(now) {
            Some(e)
        } else if claimed_count >= coupon.per_user_limit {
            Some(AppError::CouponLimitExceeded)
        } else if coupon.remaining_count() == 0 {
            Some(AppError::CouponSoldOut)
        } else {
            None
        };

        let remaining_claims = (coupon.per_user_limit - claimed_count).max(0);
        Ok(CouponDetailResponse {
            coupon: CouponResponse::from(coupon),
            claimed_count,
            remaining_claims,
            claimable: unclaimable.is_none(),
            unclaimable_code: unclaimable.map(|e| e.code().to_string()),
        })
    }

    /// 领券。校验顺序固定：状态 → 未开始 → 已结束 → 每人限领 → 库存。
    ///
    /// 库存扣减是一条带守卫的条件 UPDATE（received_count < total_count），
    /// 与 user_coupons 插入同属一个事务。并发抢最后一张时只有一个调用方
    /// 能使该 UPDATE 命中，其余得到 CouponSoldOut。
    pub async fn claim(&self, coupon_id: i64, user_id: i64) -> AppResult<UserCoupon> {
        let now = Utc::now();
        let coupon = self.get_coupon(coupon_id).await?;
        coupon.check_claim_window(now)?;

        let claimed_count = self.user_claim_count(coupon_id, user_id).await?;
        if claimed_count >= coupon.per_user_limit {
            return Err(AppError::CouponLimitExceeded);
        }

        let mut tx = self.pool.begin().await?;

        // 守卫写入放在事务第一条语句，直接拿写锁
        let affected = sqlx::query(
            "UPDATE coupons SET received_count = received_count + 1, updated_at = ? \
             WHERE id = ? AND received_count < total_count",
        )
        .bind(now)
        .bind(coupon_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if affected == 0 {
            // 事务随 drop 回滚
            return Err(AppError::CouponSoldOut);
        }

        let expires_at = compute_expires_at(now, coupon.valid_days, coupon.end_time);
        let user_coupon = sqlx::query_as::<_, UserCoupon>(
            "INSERT INTO user_coupons (user_id, coupon_id, status, claimed_at, expires_at, created_at, updated_at) \
             VALUES (?, ?, 'unused', ?, ?, ?, ?) \
             RETURNING id, user_id, coupon_id, status, claimed_at, expires_at, used_at, order_id",
        )
        .bind(user_id)
        .bind(coupon_id)
        .bind(now)
        .bind(expires_at)
        .bind(now)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        log::info!(
            "User {user_id} claimed coupon {coupon_id}, user_coupon {}",
            user_coupon.id
        );
        Ok(user_coupon)
    }

    async fn user_claim_count(&self, coupon_id: i64, user_id: i64) -> AppResult<i64> {
        let count = sqlx::query_scalar(
            "SELECT COUNT(*) FROM user_coupons WHERE user_id = ? AND coupon_id = ?",
        )
        .bind(user_id)
        .bind(coupon_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }
}
