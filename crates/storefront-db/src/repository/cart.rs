//! # Cart Repository
//!
//! Carts and their reservations (soft stock holds).
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  carts (1 per customer)                                                │
//! │    └── reservations (1 per product per cart)                           │
//! │          is_blocked, blocked_at, expires_at                            │
//! │                                                                         │
//! │  Readers:   holds_for_product  → StockLedger sums active holds         │
//! │  Writers:   insert / update / delete → ReservationManager              │
//! │  Consumers: delete_reservations → OrderAssembler                       │
//! │  Reaper:    delete_expired      → ExpirationSweeper                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use storefront_core::{Cart, Reservation};

const RESERVATION_COLUMNS: &str =
    "id, cart_id, product_id, quantity, is_blocked, blocked_at, expires_at";

/// Repository for carts and reservations.
#[derive(Debug)]
pub struct CartRepository<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> CartRepository<'c> {
    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        CartRepository { conn }
    }

    // =========================================================================
    // Carts
    // =========================================================================

    /// Loads the customer's cart with all of its reservations, expired ones
    /// included.
    pub async fn find_by_customer(&mut self, customer_id: &str) -> DbResult<Option<Cart>> {
        let cart = sqlx::query_as::<_, Cart>(
            "SELECT id, customer_id, created_at, updated_at FROM carts WHERE customer_id = ?1",
        )
        .bind(customer_id)
        .fetch_optional(&mut *self.conn)
        .await?;

        let Some(mut cart) = cart else {
            return Ok(None);
        };

        cart.reservations = self.reservations_for_cart(&cart.id).await?;
        Ok(Some(cart))
    }

    /// Creates an empty cart for the customer.
    pub async fn create(&mut self, customer_id: &str, now: DateTime<Utc>) -> DbResult<Cart> {
        let cart = Cart {
            id: Uuid::new_v4().to_string(),
            customer_id: customer_id.to_string(),
            created_at: now,
            updated_at: now,
            reservations: Vec::new(),
        };

        debug!(cart_id = %cart.id, customer_id = %customer_id, "Creating cart");

        sqlx::query(
            "INSERT INTO carts (id, customer_id, created_at, updated_at) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(&cart.id)
        .bind(&cart.customer_id)
        .bind(cart.created_at)
        .bind(cart.updated_at)
        .execute(&mut *self.conn)
        .await?;

        Ok(cart)
    }

    /// Bumps `updated_at`.
    pub async fn touch(&mut self, cart_id: &str, now: DateTime<Utc>) -> DbResult<()> {
        sqlx::query("UPDATE carts SET updated_at = ?2 WHERE id = ?1")
            .bind(cart_id)
            .bind(now)
            .execute(&mut *self.conn)
            .await?;
        Ok(())
    }

    // =========================================================================
    // Reservations
    // =========================================================================

    pub async fn reservations_for_cart(&mut self, cart_id: &str) -> DbResult<Vec<Reservation>> {
        let sql = format!(
            "SELECT {} FROM reservations WHERE cart_id = ?1 ORDER BY blocked_at, id",
            RESERVATION_COLUMNS
        );
        let rows = sqlx::query_as::<_, Reservation>(&sql)
            .bind(cart_id)
            .fetch_all(&mut *self.conn)
            .await?;
        Ok(rows)
    }

    /// Every reservation on `product_id`, across all carts.
    ///
    /// Activity is decided by the caller against its own clock.
    pub async fn holds_for_product(&mut self, product_id: &str) -> DbResult<Vec<Reservation>> {
        let sql = format!(
            "SELECT {} FROM reservations WHERE product_id = ?1 AND is_blocked = 1",
            RESERVATION_COLUMNS
        );
        let rows = sqlx::query_as::<_, Reservation>(&sql)
            .bind(product_id)
            .fetch_all(&mut *self.conn)
            .await?;
        Ok(rows)
    }

    pub async fn insert_reservation(&mut self, reservation: &Reservation) -> DbResult<()> {
        debug!(
            id = %reservation.id,
            cart_id = %reservation.cart_id,
            product_id = %reservation.product_id,
            quantity = reservation.quantity,
            "Inserting reservation"
        );

        sqlx::query(
            r#"
            INSERT INTO reservations (
                id, cart_id, product_id, quantity, is_blocked, blocked_at, expires_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&reservation.id)
        .bind(&reservation.cart_id)
        .bind(&reservation.product_id)
        .bind(reservation.quantity)
        .bind(reservation.is_blocked)
        .bind(reservation.blocked_at)
        .bind(reservation.expires_at)
        .execute(&mut *self.conn)
        .await?;
        Ok(())
    }

    /// Writes quantity, block flag and window of an existing reservation.
    pub async fn update_reservation(&mut self, reservation: &Reservation) -> DbResult<()> {
        debug!(
            id = %reservation.id,
            quantity = reservation.quantity,
            "Updating reservation"
        );

        let result = sqlx::query(
            r#"
            UPDATE reservations
            SET quantity = ?2, is_blocked = ?3, blocked_at = ?4, expires_at = ?5
            WHERE id = ?1
            "#,
        )
        .bind(&reservation.id)
        .bind(reservation.quantity)
        .bind(reservation.is_blocked)
        .bind(reservation.blocked_at)
        .bind(reservation.expires_at)
        .execute(&mut *self.conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Reservation", &reservation.id));
        }
        Ok(())
    }

    /// Deletes one reservation. Returns whether a row was removed.
    pub async fn delete_reservation(&mut self, id: &str) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM reservations WHERE id = ?1")
            .bind(id)
            .execute(&mut *self.conn)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Deletes the given reservations. Returns how many were removed; ids
    /// already gone are skipped.
    pub async fn delete_reservations(&mut self, ids: &[String]) -> DbResult<u64> {
        let mut removed = 0;
        for id in ids {
            if self.delete_reservation(id).await? {
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Deletes every reservation in the cart.
    pub async fn clear(&mut self, cart_id: &str) -> DbResult<u64> {
        let result = sqlx::query("DELETE FROM reservations WHERE cart_id = ?1")
            .bind(cart_id)
            .execute(&mut *self.conn)
            .await?;
        Ok(result.rows_affected())
    }

    /// Deletes blocked reservations that expired before `now`.
    pub async fn delete_expired(&mut self, now: DateTime<Utc>) -> DbResult<u64> {
        let result = sqlx::query("DELETE FROM reservations WHERE is_blocked = 1 AND expires_at < ?1")
            .bind(now)
            .execute(&mut *self.conn)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use chrono::Duration;

    async fn seed(conn: &mut SqliteConnection, now: DateTime<Utc>) {
        sqlx::query(
            "INSERT INTO customers (id, name, email, is_active, created_at) \
             VALUES ('c1', 'Ana', 'ana@example.com', 1, ?1)",
        )
        .bind(now)
        .execute(&mut *conn)
        .await
        .unwrap();
        for id in ["p1", "p2"] {
            sqlx::query(
                "INSERT INTO products (id, sku, name, sale_price_cents, stock_quantity, \
                 weight_grams, is_active, created_at, updated_at) \
                 VALUES (?1, ?1, 'Widget', 1000, 10, 100, 1, ?2, ?2)",
            )
            .bind(id)
            .bind(now)
            .execute(&mut *conn)
            .await
            .unwrap();
        }
    }

    fn hold(cart_id: &str, product_id: &str, qty: i64, expires_at: DateTime<Utc>) -> Reservation {
        Reservation {
            id: Uuid::new_v4().to_string(),
            cart_id: cart_id.to_string(),
            product_id: product_id.to_string(),
            quantity: qty,
            is_blocked: true,
            blocked_at: expires_at - Duration::minutes(30),
            expires_at,
        }
    }

    #[tokio::test]
    async fn test_cart_roundtrip_with_reservations() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut conn = db.acquire().await.unwrap();
        let now = Utc::now();
        seed(&mut conn, now).await;

        let mut repo = CartRepository::new(&mut conn);
        assert!(repo.find_by_customer("c1").await.unwrap().is_none());

        let cart = repo.create("c1", now).await.unwrap();
        repo.insert_reservation(&hold(&cart.id, "p1", 2, now + Duration::minutes(30)))
            .await
            .unwrap();

        let loaded = repo.find_by_customer("c1").await.unwrap().unwrap();
        assert_eq!(loaded.id, cart.id);
        assert_eq!(loaded.reservations.len(), 1);
        assert_eq!(loaded.line_for("p1").unwrap().quantity, 2);
    }

    #[tokio::test]
    async fn test_one_cart_per_customer() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut conn = db.acquire().await.unwrap();
        let now = Utc::now();
        seed(&mut conn, now).await;

        let mut repo = CartRepository::new(&mut conn);
        repo.create("c1", now).await.unwrap();
        assert!(repo.create("c1", now).await.unwrap_err().is_unique_violation());
    }

    #[tokio::test]
    async fn test_delete_expired_only_takes_past_holds() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut conn = db.acquire().await.unwrap();
        let now = Utc::now();
        seed(&mut conn, now).await;

        let mut repo = CartRepository::new(&mut conn);
        let cart = repo.create("c1", now).await.unwrap();
        repo.insert_reservation(&hold(&cart.id, "p1", 1, now - Duration::minutes(1)))
            .await
            .unwrap();
        repo.insert_reservation(&hold(&cart.id, "p2", 1, now + Duration::minutes(1)))
            .await
            .unwrap();

        assert_eq!(repo.delete_expired(now).await.unwrap(), 1);
        assert_eq!(repo.delete_expired(now).await.unwrap(), 0);

        let left = repo.reservations_for_cart(&cart.id).await.unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].product_id, "p2");
        assert_eq!(repo.holds_for_product("p2").await.unwrap().len(), 1);
    }
}
