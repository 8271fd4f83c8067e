//! # Domain Types
//!
//! Core domain types for reservation and settlement.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │      Cart       │   │   Reservation   │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  stock_quantity │◄──│  customer_id    │──►│  product_id     │       │
//! │  │  sale_price     │   │  reservations   │   │  quantity       │       │
//! │  │  is_active      │   └─────────────────┘   │  expires_at     │       │
//! │  └─────────────────┘                         └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │     Order       │   │   OrderLine     │   │  OrderPayment   │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  status         │──►│  name snapshot  │   │  card_id   XOR  │       │
//! │  │  subtotal       │   │  unit price     │   │  coupon_id      │       │
//! │  │  freight, total │──►│  line_total     │   │  amount         │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   Reference data: Customer, CreditCard, Address   │
//! │  │     Coupon      │                                                    │
//! │  │  PROMOTIONAL    │                                                    │
//! │  │  EXCHANGE       │                                                    │
//! │  └─────────────────┘                                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Id-Based References
//! Entities point at each other by id only (`customer_id`, `coupon_id`, ...).
//! Nothing here embeds another aggregate, so there are no ownership cycles
//! between orders, coupons and customers. Lookups go through the stores.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// Product
// =============================================================================

/// A product offered in the storefront.
///
/// `stock_quantity` is the physical count managed by the catalog. The
/// reservation core reads it; only approval decrements it.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Stock Keeping Unit - business identifier.
    pub sku: String,

    /// Display name, copied onto order lines.
    pub name: String,

    /// Sale price in cents.
    pub sale_price_cents: i64,

    /// Physical units on hand.
    pub stock_quantity: i64,

    /// Shipping weight in grams (freight input).
    pub weight_grams: i64,

    /// Whether the product can be reserved and ordered.
    pub is_active: bool,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns the sale price as Money.
    #[inline]
    pub fn sale_price(&self) -> Money {
        Money::from_cents(self.sale_price_cents)
    }
}

// =============================================================================
// Reference Data
// =============================================================================

/// A storefront customer.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Customer {
    pub id: String,
    pub name: String,
    pub email: String,
    pub is_active: bool,
    /// Loyalty ranking in hundredths of a point.
    pub ranking: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// A credit card registered by a customer.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct CreditCard {
    pub id: String,
    pub customer_id: String,
    /// Full card number as sent to the card operator.
    pub card_number: String,
    pub holder_name: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// A delivery address registered by a customer.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Address {
    pub id: String,
    pub customer_id: String,
    pub street: String,
    pub city: String,
    pub state: Option<String>,
    pub country: Option<String>,
}

// =============================================================================
// Cart & Reservation
// =============================================================================

/// A cart line that softly holds stock until `expires_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Reservation {
    pub id: String,
    pub cart_id: String,
    pub product_id: String,

    /// Units held (> 0).
    pub quantity: i64,

    /// Whether this line counts against available stock.
    pub is_blocked: bool,

    /// Start of the current hold window.
    #[ts(as = "String")]
    pub blocked_at: DateTime<Utc>,

    /// End of the hold window, always after `blocked_at`.
    #[ts(as = "String")]
    pub expires_at: DateTime<Utc>,
}

/// A customer's cart. One per customer, created on first reservation.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Cart {
    pub id: String,
    pub customer_id: String,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,

    /// Lines currently in the cart (loaded separately).
    #[cfg_attr(feature = "sqlx", sqlx(skip))]
    #[serde(default)]
    pub reservations: Vec<Reservation>,
}

impl Cart {
    /// Finds the line holding `product_id`.
    pub fn line_for(&self, product_id: &str) -> Option<&Reservation> {
        self.reservations.iter().find(|r| r.product_id == product_id)
    }

    /// Lines still holding stock at `now`.
    pub fn active_lines(&self, now: DateTime<Utc>) -> impl Iterator<Item = &Reservation> {
        self.reservations.iter().filter(move |r| r.is_active_at(now))
    }

    pub fn is_empty(&self) -> bool {
        self.reservations.is_empty()
    }
}

// =============================================================================
// Order Status
// =============================================================================

/// Lifecycle of an order.
///
/// ```text
/// PROCESSING ──approve──► APPROVED ──dispatch──► IN_TRANSIT ──deliver──► DELIVERED
///      │
///      └──reject / declined card──► REJECTED
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Processing,
    Approved,
    Rejected,
    InTransit,
    Delivered,
}

impl OrderStatus {
    /// Returns the wire/storage name (e.g. `IN_TRANSIT`).
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Processing => "PROCESSING",
            OrderStatus::Approved => "APPROVED",
            OrderStatus::Rejected => "REJECTED",
            OrderStatus::InTransit => "IN_TRANSIT",
            OrderStatus::Delivered => "DELIVERED",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Order
// =============================================================================

/// A committed order.
///
/// ## Invariants
/// - `total_cents == Σ line_total_cents + freight_cost_cents`
/// - `Σ payment amounts >= total_cents`, excess only from coupons
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Order {
    pub id: String,
    pub customer_id: String,
    pub delivery_address_id: String,
    pub status: OrderStatus,
    pub subtotal_cents: i64,
    pub freight_cost_cents: i64,
    pub total_cents: i64,

    #[ts(as = "String")]
    pub purchased_at: DateTime<Utc>,

    #[ts(as = "Option<String>")]
    pub dispatched_at: Option<DateTime<Utc>>,

    #[ts(as = "Option<String>")]
    pub delivered_at: Option<DateTime<Utc>>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,

    #[cfg_attr(feature = "sqlx", sqlx(skip))]
    #[serde(default)]
    pub lines: Vec<OrderLine>,

    #[cfg_attr(feature = "sqlx", sqlx(skip))]
    #[serde(default)]
    pub payments: Vec<OrderPayment>,
}

impl Order {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    /// Sum of card-backed payment amounts.
    pub fn card_paid(&self) -> Money {
        self.payments
            .iter()
            .filter(|p| p.card_id.is_some())
            .map(OrderPayment::amount)
            .sum()
    }

    /// Sum of coupon-backed payment amounts.
    pub fn coupon_paid(&self) -> Money {
        self.payments
            .iter()
            .filter(|p| p.coupon_id.is_some())
            .map(OrderPayment::amount)
            .sum()
    }

    pub fn has_card_payment(&self) -> bool {
        self.payments.iter().any(|p| p.card_id.is_some())
    }
}

/// Immutable snapshot of a product at order time.
///
/// ## Snapshot Pattern
/// Later catalog price or name changes never touch existing orders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct OrderLine {
    pub id: String,
    pub order_id: String,
    pub product_id: String,
    pub sku_snapshot: String,
    pub name_snapshot: String,
    pub unit_price_cents: i64,
    pub quantity: i64,
    pub line_total_cents: i64,
}

/// One portion of an order's payment.
///
/// Exactly one of `card_id` / `coupon_id` is set; use the constructors in
/// [`crate::payment`] rather than building this by hand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct OrderPayment {
    pub id: String,
    pub order_id: String,
    pub card_id: Option<String>,
    pub coupon_id: Option<String>,
    pub amount_cents: i64,
    /// Allocation order: coupons first (highest value first), cards last.
    pub position: i64,
}

impl OrderPayment {
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }
}

// =============================================================================
// Coupon
// =============================================================================

/// Kind of coupon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CouponType {
    /// Marketing discount. At most one per order.
    Promotional,
    /// Store credit, including change issued on coupon overpayment.
    Exchange,
}

/// A coupon owned by a customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Coupon {
    pub id: String,
    pub code: String,
    pub coupon_type: CouponType,
    pub value_cents: i64,
    pub customer_id: String,
    pub is_used: bool,

    #[ts(as = "Option<String>")]
    pub used_at: Option<DateTime<Utc>>,

    /// No expiry when `None`.
    #[ts(as = "Option<String>")]
    pub expires_at: Option<DateTime<Utc>>,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Coupon {
    #[inline]
    pub fn value(&self) -> Money {
        Money::from_cents(self.value_cents)
    }

    /// True once `expires_at` lies in the past.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at < now)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
