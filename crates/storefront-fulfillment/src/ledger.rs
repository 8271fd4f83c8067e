//! # Stock Ledger
//!
//! Read-side view of how much of a product is free to reserve.
//!
//! ```text
//! available(P) = P.stock_quantity − Σ quantity of P's holds where
//!                is_blocked and expires_at > now
//!                (optionally skipping one hold: the line being edited)
//! ```
//!
//! No locking: two writers can read the same available figure and both
//! succeed. The result may therefore be negative.

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use std::sync::Arc;

use storefront_core::reservation::StockLevel;
use storefront_core::{CoreError, Product};
use storefront_db::{CartRepository, Database, ProductRepository};

use crate::clock::Clock;
use crate::error::FulfillmentResult;

/// Computes available stock.
#[derive(Debug, Clone)]
pub struct StockLedger {
    db: Database,
    clock: Arc<dyn Clock>,
}

impl StockLedger {
    pub fn new(db: Database, clock: Arc<dyn Clock>) -> Self {
        StockLedger { db, clock }
    }

    /// Stock minus active holds, in its own read transaction.
    ///
    /// ## Errors
    /// `ProductNotFound` for an unknown product.
    pub async fn available_stock(
        &self,
        product_id: &str,
        excluding_reservation: Option<&str>,
    ) -> FulfillmentResult<i64> {
        let mut tx = self.db.begin().await?;
        let product = load_product(&mut tx, product_id).await?;
        let level = self
            .level_for(&mut tx, &product, excluding_reservation, self.clock.now())
            .await?;
        tx.commit().await?;
        Ok(level.available())
    }

    /// Stock level of `product` at `now`, read on the caller's connection.
    pub async fn level_for(
        &self,
        conn: &mut SqliteConnection,
        product: &Product,
        excluding_reservation: Option<&str>,
        now: DateTime<Utc>,
    ) -> FulfillmentResult<StockLevel> {
        let holds = CartRepository::new(conn).holds_for_product(&product.id).await?;
        Ok(StockLevel::from_holds(
            product.stock_quantity,
            &holds,
            now,
            excluding_reservation,
        ))
    }
}

/// Loads a product or fails with `ProductNotFound`.
pub(crate) async fn load_product(
    conn: &mut SqliteConnection,
    product_id: &str,
) -> FulfillmentResult<Product> {
    ProductRepository::new(conn)
        .get_by_id(product_id)
        .await?
        .ok_or_else(|| CoreError::ProductNotFound(product_id.to_string()).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::testing::{seed_product, seed_reservation, test_db};
    use chrono::Duration;

    #[tokio::test]
    async fn test_available_is_stock_minus_active_holds() {
        let db = test_db().await;
        let clock = Arc::new(ManualClock::starting_now());
        let now = clock.now();

        seed_product(&db, "p1", 10, 1000).await;
        seed_reservation(&db, "c1", "p1", 1, now + Duration::minutes(5)).await;
        seed_reservation(&db, "c2", "p1", 2, now + Duration::minutes(5)).await;
        // expired: does not count
        seed_reservation(&db, "c3", "p1", 4, now - Duration::minutes(1)).await;

        let ledger = StockLedger::new(db, clock.clone());
        assert_eq!(ledger.available_stock("p1", None).await.unwrap(), 7);

        // once the other holds lapse, everything is free again
        clock.advance(Duration::minutes(6));
        assert_eq!(ledger.available_stock("p1", None).await.unwrap(), 10);
    }

    #[tokio::test]
    async fn test_excluding_a_hold() {
        let db = test_db().await;
        let clock = Arc::new(ManualClock::starting_now());
        let now = clock.now();

        seed_product(&db, "p1", 5, 1000).await;
        let mine = seed_reservation(&db, "c1", "p1", 3, now + Duration::minutes(5)).await;
        seed_reservation(&db, "c2", "p1", 1, now + Duration::minutes(5)).await;

        let ledger = StockLedger::new(db, clock);
        assert_eq!(ledger.available_stock("p1", None).await.unwrap(), 1);
        assert_eq!(ledger.available_stock("p1", Some(&mine)).await.unwrap(), 4);
    }

    #[tokio::test]
    async fn test_unknown_product() {
        let db = test_db().await;
        let ledger = StockLedger::new(db, Arc::new(ManualClock::starting_now()));
        let err = ledger.available_stock("ghost", None).await.unwrap_err();
        assert!(matches!(err.as_core(), Some(CoreError::ProductNotFound(_))));
    }
}
