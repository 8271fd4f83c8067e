//! # Error Types
//!
//! Domain-specific error types for storefront-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          CoreError                                      │
//! │                                                                         │
//! │  ┌───────────────────────────┐   ┌───────────────────────────────────┐ │
//! │  │  Business rule failures   │   │  Not-found failures               │ │
//! │  │                           │   │                                   │ │
//! │  │  OutOfStock               │   │  ProductNotFound                  │ │
//! │  │  InvalidTtl               │   │  CustomerNotFound                 │ │
//! │  │  LineNotFound             │   │  OrderNotFound                    │ │
//! │  │  CartNotFound             │   │  CouponNotFound                   │ │
//! │  │  InvalidCoupon            │   │  AddressNotFound                  │ │
//! │  │  BelowMinimumCardAmount   │   │  CardNotFound                     │ │
//! │  │  InsufficientPayment      │   └───────────────────────────────────┘ │
//! │  │  OverpaymentNotAllowed... │                                         │
//! │  │  InvalidOrderState        │   ┌───────────────────────────────────┐ │
//! │  │  ProductInactive          │   │  Validation(ValidationError)      │ │
//! │  │  InvalidCard / Address    │   │  Malformed input                  │ │
//! │  └───────────────────────────┘   └───────────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Not-found variants describe a bad *reference*; everything else describes
//! bad *input* or a rule the request breaks. [`CoreError::is_not_found`]
//! lets callers tell them apart without matching every variant.

use thiserror::Error;

use crate::money::Money;
use crate::types::OrderStatus;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    // =========================================================================
    // Reservation Errors
    // =========================================================================
    /// Not enough unreserved stock for the request.
    ///
    /// ## When This Occurs
    /// - Reserving more than `stock - active reservations`
    /// - Raising a held line above what other carts leave free
    /// - Assembling or approving an order whose product stock dropped
    ///
    /// ## User Workflow
    /// ```text
    /// ReserveItem (qty: 3)
    ///      ▼
    /// stock=5, blocked by others=4 → available=1
    ///      ▼
    /// OutOfStock { available: 1, requested: 3 }
    /// ```
    #[error("Out of stock for product {product_id}: available {available}, requested {requested}")]
    OutOfStock {
        product_id: String,
        available: i64,
        requested: i64,
    },

    /// Reservation TTL must be at least one minute.
    #[error("Invalid reservation TTL: {minutes} minutes (must be greater than 0)")]
    InvalidTtl { minutes: i64 },

    /// The customer's cart holds no reservation for this product.
    #[error("Product {product_id} not found in cart")]
    LineNotFound { product_id: String },

    /// The customer has no cart, or the cart has nothing left to order.
    #[error("Cart not found for customer {customer_id}")]
    CartNotFound { customer_id: String },

    /// Product exists but is not sellable.
    #[error("Product {0} is inactive")]
    ProductInactive(String),

    // =========================================================================
    // Payment Errors
    // =========================================================================
    /// A coupon cannot back a payment.
    ///
    /// ## When This Occurs
    /// - Coupon does not exist
    /// - Coupon belongs to another customer
    /// - Coupon already used or expired
    /// - Same coupon listed twice, or two promotional coupons on one order
    #[error("Invalid coupon {coupon}: {reason}")]
    InvalidCoupon { coupon: String, reason: String },

    /// Card portion below the minimum with no coupon to top it off.
    #[error("Card amount {amount} is below the minimum of {minimum}")]
    BelowMinimumCardAmount { amount: Money, minimum: Money },

    /// Instructions do not cover the order total.
    #[error("Insufficient payment: order total {required}, offered {offered}")]
    InsufficientPayment { required: Money, offered: Money },

    /// Card portions add up to more than the order total.
    #[error("Card amount {card_total} exceeds the order total {order_total}")]
    OverpaymentNotAllowedOnCard { card_total: Money, order_total: Money },

    /// Card exists but belongs to another customer.
    #[error("Card {0} does not belong to the customer")]
    InvalidCard(String),

    /// Change coupon lifetime is not positive or runs past the calendar.
    #[error("Invalid change coupon validity: {days} days")]
    InvalidCouponValidity { days: i64 },

    /// Delivery address exists but belongs to another customer.
    #[error("Address {0} does not belong to the customer")]
    InvalidAddress(String),

    // =========================================================================
    // Order State Errors
    // =========================================================================
    /// Order is not in a state that allows the requested transition.
    ///
    /// ## When This Occurs
    /// - Dispatching a PROCESSING order (skip-ahead)
    /// - Approving an order twice
    /// - Any backward move, e.g. delivering then rejecting
    #[error("Order {order_id} is {current}, cannot {action}")]
    InvalidOrderState {
        order_id: String,
        current: OrderStatus,
        action: String,
    },

    // =========================================================================
    // Not Found
    // =========================================================================
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    #[error("Customer not found: {0}")]
    CustomerNotFound(String),

    #[error("Order not found: {0}")]
    OrderNotFound(String),

    #[error("Coupon not found: {0}")]
    CouponNotFound(String),

    #[error("Address not found: {0}")]
    AddressNotFound(String),

    #[error("Card not found: {0}")]
    CardNotFound(String),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Creates an InvalidCoupon error.
    pub fn invalid_coupon(coupon: impl Into<String>, reason: impl Into<String>) -> Self {
        CoreError::InvalidCoupon {
            coupon: coupon.into(),
            reason: reason.into(),
        }
    }

    /// True for failures caused by a reference to a missing entity.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            CoreError::ProductNotFound(_)
                | CoreError::CustomerNotFound(_)
                | CoreError::OrderNotFound(_)
                | CoreError::CouponNotFound(_)
                | CoreError::AddressNotFound(_)
                | CoreError::CardNotFound(_)
        )
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before any business rule runs, for input that is malformed no
/// matter what the stores contain.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., invalid UUID).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_of_stock_message() {
        let err = CoreError::OutOfStock {
            product_id: "prod-1".to_string(),
            available: 1,
            requested: 3,
        };
        assert_eq!(
            err.to_string(),
            "Out of stock for product prod-1: available 1, requested 3"
        );
    }

    #[test]
    fn test_payment_messages_show_money() {
        let err = CoreError::BelowMinimumCardAmount {
            amount: Money::from_cents(500),
            minimum: Money::from_cents(1000),
        };
        assert_eq!(
            err.to_string(),
            "Card amount $5.00 is below the minimum of $10.00"
        );
    }

    #[test]
    fn test_invalid_order_state_message() {
        let err = CoreError::InvalidOrderState {
            order_id: "ord-1".to_string(),
            current: OrderStatus::Processing,
            action: "dispatch".to_string(),
        };
        assert_eq!(err.to_string(), "Order ord-1 is PROCESSING, cannot dispatch");
    }

    #[test]
    fn test_not_found_classification() {
        assert!(CoreError::OrderNotFound("x".into()).is_not_found());
        assert!(CoreError::CardNotFound("x".into()).is_not_found());
        assert!(!CoreError::invalid_coupon("C1", "already used").is_not_found());
        assert!(!CoreError::CartNotFound {
            customer_id: "c".into()
        }
        .is_not_found());
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let err: CoreError = ValidationError::MustBePositive {
            field: "quantity".to_string(),
        }
        .into();
        assert!(matches!(err, CoreError::Validation(_)));
    }
}
