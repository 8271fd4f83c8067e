//! # Reservation Manager
//!
//! Cart mutations. Every write restarts the hold window of the line it
//! touches, so a customer who keeps editing never loses the hold while an
//! abandoned cart runs out.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  reserve(c, p, qty, ttl)                                               │
//! │    validate ─► customer ─► product (active) ─► cart (create if none)   │
//! │        │                                                               │
//! │        ├── line for p exists ──► incremented(qty)  (window restarted)  │
//! │        └── no line           ──► open(qty)                             │
//! │                                                                         │
//! │  update_quantity(c, p, qty, ttl)                                       │
//! │    cart ─► line ─► replaced(qty), checked against stock minus          │
//! │                    every other hold                                    │
//! │                                                                         │
//! │  remove(c, p) / clear(c)      delete one / all lines                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each call is one transaction. The stock check reads holds and then writes
//! without locking the product; concurrent carts can over-reserve.

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use std::sync::Arc;
use tracing::{debug, info};

use storefront_core::reservation::HoldWindow;
use storefront_core::validation::{validate_id, validate_quantity};
use storefront_core::{Cart, CoreError, Reservation};
use storefront_db::{CartRepository, CustomerRepository, Database};

use crate::clock::Clock;
use crate::error::FulfillmentResult;
use crate::ledger::{load_product, StockLedger};

/// Creates, edits and removes cart reservations.
#[derive(Debug, Clone)]
pub struct ReservationManager {
    db: Database,
    clock: Arc<dyn Clock>,
    ledger: StockLedger,
}

impl ReservationManager {
    pub fn new(db: Database, clock: Arc<dyn Clock>) -> Self {
        let ledger = StockLedger::new(db.clone(), clock.clone());
        ReservationManager { db, clock, ledger }
    }

    /// Holds `quantity` more units of `product_id` in the customer's cart.
    ///
    /// ## Errors
    /// - `InvalidTtl` when `ttl_minutes <= 0`
    /// - `CustomerNotFound`, `ProductNotFound`, `ProductInactive`
    /// - `OutOfStock` when the line would hold more than is free
    pub async fn reserve(
        &self,
        customer_id: &str,
        product_id: &str,
        quantity: i64,
        ttl_minutes: i64,
    ) -> FulfillmentResult<Cart> {
        validate_id("customerId", customer_id)?;
        validate_id("productId", product_id)?;
        validate_quantity(quantity)?;

        let now = self.clock.now();
        let window = HoldWindow::starting_at(now, ttl_minutes)?;

        let mut tx = self.db.begin().await?;

        if CustomerRepository::new(&mut tx)
            .get_by_id(customer_id)
            .await?
            .is_none()
        {
            return Err(CoreError::CustomerNotFound(customer_id.to_string()).into());
        }

        let product = load_product(&mut tx, product_id).await?;
        if !product.is_active {
            return Err(CoreError::ProductInactive(product.id).into());
        }

        let found = CartRepository::new(&mut tx).find_by_customer(customer_id).await?;
        let cart = match found {
            Some(cart) => cart,
            None => CartRepository::new(&mut tx).create(customer_id, now).await?,
        };

        let existing = cart.line_for(product_id).cloned();

        // The line is checked at its new total against what every other hold
        // leaves free, so an expired line being revived is counted too.
        let requested = match &existing {
            Some(line) => line.total_after(quantity)?,
            None => quantity,
        };
        let level = self
            .ledger
            .level_for(&mut tx, &product, existing.as_ref().map(|r| r.id.as_str()), now)
            .await?;
        level.ensure_can_hold(product_id, requested)?;

        let (reservation, change) = match &existing {
            Some(line) => line.incremented(quantity, window)?,
            None => Reservation::open(&cart.id, product_id, quantity, window),
        };

        {
            let mut carts = CartRepository::new(&mut tx);
            if existing.is_some() {
                carts.update_reservation(&reservation).await?;
            } else {
                carts.insert_reservation(&reservation).await?;
            }
            carts.touch(&cart.id, now).await?;
        }

        let cart = reload(&mut tx, &cart, now).await?;
        tx.commit().await?;

        info!(
            customer_id = %customer_id,
            product_id = %product_id,
            quantity = reservation.quantity,
            expires_at = %reservation.expires_at,
            ?change,
            "Reserved stock"
        );

        Ok(cart)
    }

    /// Sets the held quantity of an existing line.
    ///
    /// The line does not count against itself: raising it up to the whole
    /// free stock succeeds.
    ///
    /// ## Errors
    /// `CartNotFound`, `LineNotFound`, `InvalidTtl`, `OutOfStock`
    pub async fn update_quantity(
        &self,
        customer_id: &str,
        product_id: &str,
        quantity: i64,
        ttl_minutes: i64,
    ) -> FulfillmentResult<Cart> {
        validate_id("customerId", customer_id)?;
        validate_id("productId", product_id)?;
        validate_quantity(quantity)?;

        let now = self.clock.now();
        let window = HoldWindow::starting_at(now, ttl_minutes)?;

        let mut tx = self.db.begin().await?;
        let cart = require_cart(&mut tx, customer_id).await?;

        let line = cart
            .line_for(product_id)
            .cloned()
            .ok_or_else(|| CoreError::LineNotFound {
                product_id: product_id.to_string(),
            })?;

        let product = load_product(&mut tx, product_id).await?;
        let level = self
            .ledger
            .level_for(&mut tx, &product, Some(&line.id), now)
            .await?;
        level.ensure_can_hold(product_id, quantity)?;

        let (reservation, change) = line.replaced(quantity, window);
        {
            let mut carts = CartRepository::new(&mut tx);
            carts.update_reservation(&reservation).await?;
            carts.touch(&cart.id, now).await?;
        }

        let cart = reload(&mut tx, &cart, now).await?;
        tx.commit().await?;

        info!(
            customer_id = %customer_id,
            product_id = %product_id,
            quantity,
            ?change,
            "Updated reservation"
        );

        Ok(cart)
    }

    /// Deletes the line for `product_id`, if there is one.
    ///
    /// ## Errors
    /// `CartNotFound` when the customer has no cart.
    pub async fn remove(&self, customer_id: &str, product_id: &str) -> FulfillmentResult<Cart> {
        validate_id("customerId", customer_id)?;
        validate_id("productId", product_id)?;

        let now = self.clock.now();
        let mut tx = self.db.begin().await?;
        let cart = require_cart(&mut tx, customer_id).await?;

        let removed = match cart.line_for(product_id) {
            Some(line) => {
                let mut carts = CartRepository::new(&mut tx);
                let removed = carts.delete_reservation(&line.id).await?;
                carts.touch(&cart.id, now).await?;
                removed
            }
            None => false,
        };

        let cart = reload(&mut tx, &cart, now).await?;
        tx.commit().await?;

        debug!(customer_id = %customer_id, product_id = %product_id, removed, "Removed reservation");
        Ok(cart)
    }

    /// Deletes every line in the customer's cart.
    ///
    /// ## Errors
    /// `CartNotFound` when the customer has no cart.
    pub async fn clear(&self, customer_id: &str) -> FulfillmentResult<Cart> {
        validate_id("customerId", customer_id)?;

        let now = self.clock.now();
        let mut tx = self.db.begin().await?;
        let cart = require_cart(&mut tx, customer_id).await?;

        let removed = {
            let mut carts = CartRepository::new(&mut tx);
            let removed = carts.clear(&cart.id).await?;
            carts.touch(&cart.id, now).await?;
            removed
        };

        let cart = reload(&mut tx, &cart, now).await?;
        tx.commit().await?;

        info!(customer_id = %customer_id, removed, "Cleared cart");
        Ok(cart)
    }

    /// The customer's cart with every line, expired ones included.
    pub async fn view_cart(&self, customer_id: &str) -> FulfillmentResult<Option<Cart>> {
        validate_id("customerId", customer_id)?;

        let mut conn = self.db.acquire().await?;
        Ok(CartRepository::new(&mut conn)
            .find_by_customer(customer_id)
            .await?)
    }

    /// Free stock for `product_id` right now.
    pub async fn available_stock(&self, product_id: &str) -> FulfillmentResult<i64> {
        self.ledger.available_stock(product_id, None).await
    }
}

async fn require_cart(conn: &mut SqliteConnection, customer_id: &str) -> FulfillmentResult<Cart> {
    CartRepository::new(conn)
        .find_by_customer(customer_id)
        .await?
        .ok_or_else(|| {
            CoreError::CartNotFound {
                customer_id: customer_id.to_string(),
            }
            .into()
        })
}

async fn reload(
    conn: &mut SqliteConnection,
    cart: &Cart,
    now: DateTime<Utc>,
) -> FulfillmentResult<Cart> {
    let reservations = CartRepository::new(conn).reservations_for_cart(&cart.id).await?;
    Ok(Cart {
        reservations,
        updated_at: now,
        ..cart.clone()
    })
}
