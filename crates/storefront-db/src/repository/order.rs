//! # Order Repository
//!
//! Orders are written once with their lines and payments; afterwards only
//! the status columns change.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  insert(order)                                                         │
//! │    ├── orders          (header, status PROCESSING)                     │
//! │    ├── order_lines     (product snapshots)                             │
//! │    └── order_payments  (position order: coupons, then cards)           │
//! │                                                                         │
//! │  save_status(order)                                                    │
//! │    └── status, dispatched_at, delivered_at, updated_at                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::{DbError, DbResult};
use storefront_core::{Order, OrderLine, OrderPayment};

/// Repository for orders, order lines and order payments.
#[derive(Debug)]
pub struct OrderRepository<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> OrderRepository<'c> {
    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        OrderRepository { conn }
    }

    /// Inserts the order with its lines and payments.
    pub async fn insert(&mut self, order: &Order) -> DbResult<()> {
        debug!(
            id = %order.id,
            customer_id = %order.customer_id,
            total_cents = order.total_cents,
            lines = order.lines.len(),
            payments = order.payments.len(),
            "Inserting order"
        );

        sqlx::query(
            r#"
            INSERT INTO orders (
                id, customer_id, delivery_address_id, status,
                subtotal_cents, freight_cost_cents, total_cents,
                purchased_at, dispatched_at, delivered_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(&order.id)
        .bind(&order.customer_id)
        .bind(&order.delivery_address_id)
        .bind(order.status)
        .bind(order.subtotal_cents)
        .bind(order.freight_cost_cents)
        .bind(order.total_cents)
        .bind(order.purchased_at)
        .bind(order.dispatched_at)
        .bind(order.delivered_at)
        .bind(order.updated_at)
        .execute(&mut *self.conn)
        .await?;

        for line in &order.lines {
            self.insert_line(line).await?;
        }
        for payment in &order.payments {
            self.insert_payment(payment).await?;
        }

        Ok(())
    }

    async fn insert_line(&mut self, line: &OrderLine) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO order_lines (
                id, order_id, product_id, sku_snapshot, name_snapshot,
                unit_price_cents, quantity, line_total_cents
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&line.id)
        .bind(&line.order_id)
        .bind(&line.product_id)
        .bind(&line.sku_snapshot)
        .bind(&line.name_snapshot)
        .bind(line.unit_price_cents)
        .bind(line.quantity)
        .bind(line.line_total_cents)
        .execute(&mut *self.conn)
        .await?;
        Ok(())
    }

    async fn insert_payment(&mut self, payment: &OrderPayment) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO order_payments (
                id, order_id, card_id, coupon_id, amount_cents, position
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&payment.id)
        .bind(&payment.order_id)
        .bind(&payment.card_id)
        .bind(&payment.coupon_id)
        .bind(payment.amount_cents)
        .bind(payment.position)
        .execute(&mut *self.conn)
        .await?;
        Ok(())
    }

    /// Loads the order header only.
    pub async fn get_by_id(&mut self, id: &str) -> DbResult<Option<Order>> {
        let order = sqlx::query_as::<_, Order>(
            r#"
            SELECT
                id, customer_id, delivery_address_id, status,
                subtotal_cents, freight_cost_cents, total_cents,
                purchased_at, dispatched_at, delivered_at, updated_at
            FROM orders
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *self.conn)
        .await?;
        Ok(order)
    }

    /// Loads the order with its lines and payments.
    pub async fn get_with_details(&mut self, id: &str) -> DbResult<Option<Order>> {
        let Some(mut order) = self.get_by_id(id).await? else {
            return Ok(None);
        };

        order.lines = sqlx::query_as::<_, OrderLine>(
            r#"
            SELECT
                id, order_id, product_id, sku_snapshot, name_snapshot,
                unit_price_cents, quantity, line_total_cents
            FROM order_lines
            WHERE order_id = ?1
            ORDER BY rowid
            "#,
        )
        .bind(id)
        .fetch_all(&mut *self.conn)
        .await?;

        order.payments = sqlx::query_as::<_, OrderPayment>(
            r#"
            SELECT id, order_id, card_id, coupon_id, amount_cents, position
            FROM order_payments
            WHERE order_id = ?1
            ORDER BY position
            "#,
        )
        .bind(id)
        .fetch_all(&mut *self.conn)
        .await?;

        Ok(Some(order))
    }

    /// Persists the status columns of `order`.
    pub async fn save_status(&mut self, order: &Order) -> DbResult<()> {
        debug!(id = %order.id, status = %order.status, "Saving order status");

        let result = sqlx::query(
            r#"
            UPDATE orders
            SET status = ?2, dispatched_at = ?3, delivered_at = ?4, updated_at = ?5
            WHERE id = ?1
            "#,
        )
        .bind(&order.id)
        .bind(order.status)
        .bind(order.dispatched_at)
        .bind(order.delivered_at)
        .bind(order.updated_at)
        .execute(&mut *self.conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Order", &order.id));
        }
        Ok(())
    }

    /// Order ids of the customer, newest first.
    pub async fn ids_by_customer(&mut self, customer_id: &str) -> DbResult<Vec<String>> {
        let ids: Vec<String> = sqlx::query_scalar(
            "SELECT id FROM orders WHERE customer_id = ?1 ORDER BY purchased_at DESC, id",
        )
        .bind(customer_id)
        .fetch_all(&mut *self.conn)
        .await?;
        Ok(ids)
    }
}
