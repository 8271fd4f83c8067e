//! # Order Assembler
//!
//! Converts the live part of a cart into a PROCESSING order.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       create_order (one transaction)                    │
//! │                                                                         │
//! │  1. customer, delivery address (owned by the customer)                  │
//! │  2. cart ─► lines still active at now   (none left → CartNotFound)     │
//! │  3. per line: product active, stock covers quantity, snapshot it       │
//! │  4. subtotal + freight(lines, address) = total                          │
//! │  5. PaymentAllocator ─► ordered payments                                │
//! │  6. INSERT order, DELETE the converted reservations                     │
//! │                                                                         │
//! │  Any failure rolls the whole thing back.                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use storefront_core::freight::{FreightRule, ShippedLine};
use storefront_core::payment::PaymentInstruction;
use storefront_core::validation::validate_id;
use storefront_core::{CoreError, Money, Order, OrderLine, OrderStatus};
use storefront_db::{CartRepository, CustomerRepository, Database, OrderRepository};

use crate::allocator::PaymentAllocator;
use crate::clock::Clock;
use crate::error::FulfillmentResult;
use crate::ledger::load_product;

/// Builds orders from carts.
#[derive(Clone)]
pub struct OrderAssembler {
    db: Database,
    clock: Arc<dyn Clock>,
    allocator: PaymentAllocator,
    freight: Arc<dyn FreightRule>,
}

impl std::fmt::Debug for OrderAssembler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderAssembler")
            .field("allocator", &self.allocator)
            .finish_non_exhaustive()
    }
}

impl OrderAssembler {
    pub fn new(
        db: Database,
        clock: Arc<dyn Clock>,
        allocator: PaymentAllocator,
        freight: Arc<dyn FreightRule>,
    ) -> Self {
        OrderAssembler {
            db,
            clock,
            allocator,
            freight,
        }
    }

    /// Creates a PROCESSING order from the customer's active cart lines.
    ///
    /// ## Errors
    /// - `CustomerNotFound`, `AddressNotFound`, `InvalidAddress`
    /// - `CartNotFound` when there is no cart or no line is still held
    /// - `ProductNotFound`, `ProductInactive`, `OutOfStock`
    /// - any allocation failure (`InvalidCoupon`, `InsufficientPayment`, ...)
    pub async fn create_order(
        &self,
        customer_id: &str,
        delivery_address_id: &str,
        instructions: &[PaymentInstruction],
    ) -> FulfillmentResult<Order> {
        validate_id("customerId", customer_id)?;
        validate_id("deliveryAddressId", delivery_address_id)?;

        let now = self.clock.now();
        let mut tx = self.db.begin().await?;

        // =====================================================================
        // References
        // =====================================================================
        let address = {
            let mut customers = CustomerRepository::new(&mut tx);
            if customers.get_by_id(customer_id).await?.is_none() {
                return Err(CoreError::CustomerNotFound(customer_id.to_string()).into());
            }
            customers
                .get_address(delivery_address_id)
                .await?
                .ok_or_else(|| CoreError::AddressNotFound(delivery_address_id.to_string()))?
        };
        if address.customer_id != customer_id {
            return Err(CoreError::InvalidAddress(address.id).into());
        }

        let cart_missing = || CoreError::CartNotFound {
            customer_id: customer_id.to_string(),
        };
        let cart = CartRepository::new(&mut tx)
            .find_by_customer(customer_id)
            .await?
            .ok_or_else(cart_missing)?;

        let held: Vec<_> = cart.active_lines(now).cloned().collect();
        if held.is_empty() {
            return Err(cart_missing().into());
        }

        // =====================================================================
        // Lines and totals
        // =====================================================================
        let order_id = Uuid::new_v4().to_string();
        let mut lines = Vec::with_capacity(held.len());
        let mut shipped = Vec::with_capacity(held.len());

        for reservation in &held {
            let product = load_product(&mut tx, &reservation.product_id).await?;
            if !product.is_active {
                return Err(CoreError::ProductInactive(product.id).into());
            }
            if product.stock_quantity < reservation.quantity {
                return Err(CoreError::OutOfStock {
                    product_id: product.id,
                    available: product.stock_quantity,
                    requested: reservation.quantity,
                }
                .into());
            }

            let line_total = product.sale_price().multiply_quantity(reservation.quantity);
            shipped.push(ShippedLine {
                weight_grams: product.weight_grams,
                quantity: reservation.quantity,
            });
            lines.push(OrderLine {
                id: Uuid::new_v4().to_string(),
                order_id: order_id.clone(),
                product_id: product.id,
                sku_snapshot: product.sku,
                name_snapshot: product.name,
                unit_price_cents: product.sale_price_cents,
                quantity: reservation.quantity,
                line_total_cents: line_total.cents(),
            });
        }

        let subtotal: Money = lines
            .iter()
            .map(|l| Money::from_cents(l.line_total_cents))
            .sum();
        let freight = self.freight.freight(&shipped, &address);
        let total = subtotal + freight;

        // =====================================================================
        // Payments
        // =====================================================================
        let payments = self
            .allocator
            .allocate(&mut tx, customer_id, total, instructions, now)
            .await?
            .into_iter()
            .enumerate()
            .map(|(position, payment)| payment.into_order_payment(&order_id, position as i64))
            .collect();

        let order = Order {
            id: order_id,
            customer_id: customer_id.to_string(),
            delivery_address_id: address.id,
            status: OrderStatus::Processing,
            subtotal_cents: subtotal.cents(),
            freight_cost_cents: freight.cents(),
            total_cents: total.cents(),
            purchased_at: now,
            dispatched_at: None,
            delivered_at: None,
            updated_at: now,
            lines,
            payments,
        };

        // =====================================================================
        // Persist
        // =====================================================================
        OrderRepository::new(&mut tx).insert(&order).await?;

        let consumed: Vec<String> = held.into_iter().map(|r| r.id).collect();
        {
            let mut carts = CartRepository::new(&mut tx);
            carts.delete_reservations(&consumed).await?;
            carts.touch(&cart.id, now).await?;
        }

        tx.commit().await?;

        info!(
            order_id = %order.id,
            customer_id = %customer_id,
            lines = order.lines.len(),
            total = %order.total(),
            freight = %freight,
            "Order created"
        );

        Ok(order)
    }
}
