//! # Customer Repository
//!
//! Customers and the two things fulfillment needs from their profile:
//! credit cards (ownership + the number handed to the card operator) and
//! delivery addresses (ownership + freight destination).

use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::DbResult;
use storefront_core::{Address, CreditCard, Customer};

/// Repository for customers, their cards and addresses.
#[derive(Debug)]
pub struct CustomerRepository<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> CustomerRepository<'c> {
    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        CustomerRepository { conn }
    }

    // =========================================================================
    // Customers
    // =========================================================================

    pub async fn get_by_id(&mut self, id: &str) -> DbResult<Option<Customer>> {
        let customer = sqlx::query_as::<_, Customer>(
            "SELECT id, name, email, is_active, ranking, created_at FROM customers WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&mut *self.conn)
        .await?;
        Ok(customer)
    }

    pub async fn insert(&mut self, customer: &Customer) -> DbResult<()> {
        debug!(id = %customer.id, "Inserting customer");

        sqlx::query(
            r#"
            INSERT INTO customers (id, name, email, is_active, ranking, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&customer.id)
        .bind(&customer.name)
        .bind(&customer.email)
        .bind(customer.is_active)
        .bind(customer.ranking)
        .bind(customer.created_at)
        .execute(&mut *self.conn)
        .await?;
        Ok(())
    }

    /// Stores a new ranking. Returns false when the customer does not exist.
    pub async fn update_ranking(&mut self, id: &str, ranking: i64) -> DbResult<bool> {
        debug!(id = %id, ranking, "Updating customer ranking");

        let result = sqlx::query("UPDATE customers SET ranking = ?2 WHERE id = ?1")
            .bind(id)
            .bind(ranking)
            .execute(&mut *self.conn)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    // =========================================================================
    // Credit Cards
    // =========================================================================

    pub async fn get_card(&mut self, id: &str) -> DbResult<Option<CreditCard>> {
        let card = sqlx::query_as::<_, CreditCard>(
            r#"
            SELECT id, customer_id, card_number, holder_name, created_at
            FROM credit_cards
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *self.conn)
        .await?;
        Ok(card)
    }

    pub async fn insert_card(&mut self, card: &CreditCard) -> DbResult<()> {
        debug!(id = %card.id, customer_id = %card.customer_id, "Inserting credit card");

        sqlx::query(
            r#"
            INSERT INTO credit_cards (id, customer_id, card_number, holder_name, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&card.id)
        .bind(&card.customer_id)
        .bind(&card.card_number)
        .bind(&card.holder_name)
        .bind(card.created_at)
        .execute(&mut *self.conn)
        .await?;
        Ok(())
    }

    // =========================================================================
    // Addresses
    // =========================================================================

    pub async fn get_address(&mut self, id: &str) -> DbResult<Option<Address>> {
        let address = sqlx::query_as::<_, Address>(
            r#"
            SELECT id, customer_id, street, city, state, country
            FROM addresses
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *self.conn)
        .await?;
        Ok(address)
    }

    pub async fn insert_address(&mut self, address: &Address) -> DbResult<()> {
        debug!(id = %address.id, customer_id = %address.customer_id, "Inserting address");

        sqlx::query(
            r#"
            INSERT INTO addresses (id, customer_id, street, city, state, country)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&address.id)
        .bind(&address.customer_id)
        .bind(&address.street)
        .bind(&address.city)
        .bind(&address.state)
        .bind(&address.country)
        .execute(&mut *self.conn)
        .await?;
        Ok(())
    }
}
