//! # storefront-core: Pure Fulfillment Rules
//!
//! Everything the fulfillment pipeline decides, with no I/O. The database
//! crate persists what these rules produce; the fulfillment crate wires them
//! to transactions, the clock and the card operator.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Storefront Fulfillment                              │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │               storefront-fulfillment (services)                 │   │
//! │  │  ReservationManager  OrderAssembler  Settlement  Sweeper        │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ storefront-core (THIS CRATE) ★                  │   │
//! │  │                                                                 │   │
//! │  │  ┌────────────┐ ┌──────────┐ ┌──────────┐ ┌──────────────────┐ │   │
//! │  │  │reservation │ │ payment  │ │  order   │ │ coupon / freight │ │   │
//! │  │  │ HoldWindow │ │ allocate │ │ status   │ │ change coupons   │ │   │
//! │  │  │ StockLevel │ │ validate │ │ machine  │ │ FreightRule      │ │   │
//! │  │  └────────────┘ └──────────┘ └──────────┘ └──────────────────┘ │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO WALL CLOCK • PURE FUNCTIONS        │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               storefront-db (SQLite repositories)               │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Stored entities (Product, Cart, Order, Coupon, ...)
//! - [`money`] - Integer cents
//! - [`reservation`] - Hold windows and available stock
//! - [`payment`] - Splitting an order total across coupons and cards
//! - [`order`] - Status transitions
//! - [`coupon`] - Change coupons for coupon overpay
//! - [`ranking`] - Loyalty ranking earned on approval
//! - [`freight`] - Shipping cost rules
//! - [`validation`] - Input checks
//! - [`error`] - Domain error types
//!
//! ## Example
//!
//! ```rust
//! use storefront_core::money::Money;
//! use storefront_core::payment::{allocate_payments, AllocationPolicy, CardPortion};
//! use chrono::Utc;
//!
//! let paid = allocate_payments(
//!     Money::from_cents(5000),
//!     "cust-1",
//!     vec![],
//!     vec![CardPortion { card_id: "card-1".into(), amount: Money::from_cents(5000) }],
//!     &AllocationPolicy::default(),
//!     Utc::now(),
//! )
//! .unwrap();
//! assert_eq!(paid.len(), 1);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod coupon;
pub mod error;
pub mod freight;
pub mod money;
pub mod order;
pub mod payment;
pub mod ranking;
pub mod reservation;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Default reservation hold, in minutes.
pub const DEFAULT_RESERVATION_TTL_MINUTES: i64 = 30;

/// Maximum quantity of a single product in one cart line.
///
/// ## Business Reason
/// Catches typos like 1000 for 10 before they hold a whole shelf.
pub const MAX_ITEM_QUANTITY: i64 = 999;
