//! # Coupon Repository

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::DbResult;
use storefront_core::Coupon;

const COUPON_COLUMNS: &str = "id, code, coupon_type, value_cents, customer_id, is_used, \
                              used_at, expires_at, created_at, updated_at";

/// Repository for coupon database operations.
#[derive(Debug)]
pub struct CouponRepository<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> CouponRepository<'c> {
    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        CouponRepository { conn }
    }

    pub async fn get_by_id(&mut self, id: &str) -> DbResult<Option<Coupon>> {
        let sql = format!("SELECT {} FROM coupons WHERE id = ?1", COUPON_COLUMNS);
        let coupon = sqlx::query_as::<_, Coupon>(&sql)
            .bind(id)
            .fetch_optional(&mut *self.conn)
            .await?;
        Ok(coupon)
    }

    pub async fn get_by_code(&mut self, code: &str) -> DbResult<Option<Coupon>> {
        let sql = format!("SELECT {} FROM coupons WHERE code = ?1", COUPON_COLUMNS);
        let coupon = sqlx::query_as::<_, Coupon>(&sql)
            .bind(code)
            .fetch_optional(&mut *self.conn)
            .await?;
        Ok(coupon)
    }

    pub async fn code_exists(&mut self, code: &str) -> DbResult<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM coupons WHERE code = ?1")
            .bind(code)
            .fetch_one(&mut *self.conn)
            .await?;
        Ok(count > 0)
    }

    /// Coupons owned by the customer, newest first.
    pub async fn list_by_customer(&mut self, customer_id: &str) -> DbResult<Vec<Coupon>> {
        let sql = format!(
            "SELECT {} FROM coupons WHERE customer_id = ?1 ORDER BY created_at DESC, id",
            COUPON_COLUMNS
        );
        let coupons = sqlx::query_as::<_, Coupon>(&sql)
            .bind(customer_id)
            .fetch_all(&mut *self.conn)
            .await?;
        Ok(coupons)
    }

    pub async fn insert(&mut self, coupon: &Coupon) -> DbResult<()> {
        debug!(
            id = %coupon.id,
            code = %coupon.code,
            value_cents = coupon.value_cents,
            "Inserting coupon"
        );

        sqlx::query(
            r#"
            INSERT INTO coupons (
                id, code, coupon_type, value_cents, customer_id, is_used,
                used_at, expires_at, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&coupon.id)
        .bind(&coupon.code)
        .bind(coupon.coupon_type)
        .bind(coupon.value_cents)
        .bind(&coupon.customer_id)
        .bind(coupon.is_used)
        .bind(coupon.used_at)
        .bind(coupon.expires_at)
        .bind(coupon.created_at)
        .bind(coupon.updated_at)
        .execute(&mut *self.conn)
        .await?;
        Ok(())
    }

    /// Marks an unused coupon as used.
    ///
    /// Returns `false` when the coupon is missing or already used.
    pub async fn mark_used(&mut self, id: &str, now: DateTime<Utc>) -> DbResult<bool> {
        debug!(id = %id, "Marking coupon used");

        let result = sqlx::query(
            r#"
            UPDATE coupons
            SET is_used = 1, used_at = ?2, updated_at = ?2
            WHERE id = ?1 AND is_used = 0
            "#,
        )
        .bind(id)
        .bind(now)
        .execute(&mut *self.conn)
        .await?;
        Ok(result.rows_affected() == 1)
    }
}
