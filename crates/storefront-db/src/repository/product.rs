//! # Product Repository
//!
//! Reads products for stock checks and order snapshots, and applies the
//! one stock mutation fulfillment owns: the decrement on approval.

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::{DbError, DbResult};
use storefront_core::Product;

/// Repository for product database operations.
#[derive(Debug)]
pub struct ProductRepository<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> ProductRepository<'c> {
    /// Creates a repository on `conn`, usually `&mut *tx`.
    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        ProductRepository { conn }
    }

    /// Gets a product by ID.
    pub async fn get_by_id(&mut self, id: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(
            r#"
            SELECT
                id, sku, name, sale_price_cents, stock_quantity, weight_grams,
                is_active, created_at, updated_at
            FROM products
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *self.conn)
        .await?;

        Ok(product)
    }

    /// Inserts a product.
    pub async fn insert(&mut self, product: &Product) -> DbResult<()> {
        debug!(id = %product.id, sku = %product.sku, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, sku, name, sale_price_cents, stock_quantity, weight_grams,
                is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&product.id)
        .bind(&product.sku)
        .bind(&product.name)
        .bind(product.sale_price_cents)
        .bind(product.stock_quantity)
        .bind(product.weight_grams)
        .bind(product.is_active)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&mut *self.conn)
        .await?;

        Ok(())
    }

    /// Removes `quantity` units from physical stock.
    ///
    /// The update is guarded by `stock_quantity >= quantity`, so it never
    /// drives stock negative.
    ///
    /// ## Returns
    /// * `Ok(true)` - stock decremented
    /// * `Ok(false)` - not enough stock; nothing changed
    /// * `Err(NotFound)` - no such product
    pub async fn decrement_stock(
        &mut self,
        id: &str,
        quantity: i64,
        now: DateTime<Utc>,
    ) -> DbResult<bool> {
        debug!(id = %id, quantity = %quantity, "Decrementing stock");

        let result = sqlx::query(
            r#"
            UPDATE products
            SET
                stock_quantity = stock_quantity - ?2,
                updated_at = ?3
            WHERE id = ?1 AND stock_quantity >= ?2
            "#,
        )
        .bind(id)
        .bind(quantity)
        .bind(now)
        .execute(&mut *self.conn)
        .await?;

        if result.rows_affected() == 1 {
            return Ok(true);
        }

        match self.get_by_id(id).await? {
            Some(_) => Ok(false),
            None => Err(DbError::not_found("Product", id)),
        }
    }

    /// Sets the active flag.
    pub async fn set_active(&mut self, id: &str, active: bool, now: DateTime<Utc>) -> DbResult<()> {
        let result = sqlx::query("UPDATE products SET is_active = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(id)
            .bind(active)
            .bind(now)
            .execute(&mut *self.conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    fn product(id: &str, stock: i64) -> Product {
        let now = Utc::now();
        Product {
            id: id.to_string(),
            sku: format!("SKU-{}", id),
            name: "Widget".to_string(),
            sale_price_cents: 1999,
            stock_quantity: stock,
            weight_grams: 250,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut conn = db.acquire().await.unwrap();
        let mut repo = ProductRepository::new(&mut conn);

        repo.insert(&product("p1", 5)).await.unwrap();
        let loaded = repo.get_by_id("p1").await.unwrap().unwrap();
        assert_eq!(loaded.sku, "SKU-p1");
        assert_eq!(loaded.stock_quantity, 5);
        assert!(loaded.is_active);
        assert!(repo.get_by_id("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_decrement_is_guarded() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut conn = db.acquire().await.unwrap();
        let mut repo = ProductRepository::new(&mut conn);
        repo.insert(&product("p1", 3)).await.unwrap();

        assert!(repo.decrement_stock("p1", 2, Utc::now()).await.unwrap());
        assert!(!repo.decrement_stock("p1", 2, Utc::now()).await.unwrap());
        assert_eq!(repo.get_by_id("p1").await.unwrap().unwrap().stock_quantity, 1);

        assert!(matches!(
            repo.decrement_stock("nope", 1, Utc::now()).await,
            Err(DbError::NotFound { .. })
        ));
    }
}
