//! # Fulfillment Error Types
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Fulfillment Error Categories                         │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  BusinessRule   │  │    NotFound     │  │    Infrastructure       │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  OutOfStock     │  │ ProductNotFound │  │  Database               │ │
//! │  │  InvalidCoupon  │  │ OrderNotFound   │  │  CardOperator           │ │
//! │  │  InvalidOrder-  │  │ CouponNotFound  │  │  Config load / save     │ │
//! │  │    State ...    │  │ ...             │  │  Channel                │ │
//! │  │  InvalidCommand │  │                 │  │                         │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │         bad input        bad reference          system fault           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Nothing here is retried automatically; [`FulfillmentError::kind`] tells
//! the caller which bucket a failure falls in.

use serde::Serialize;
use thiserror::Error;

use storefront_core::CoreError;
use storefront_db::DbError;

/// Result type alias for fulfillment operations.
pub type FulfillmentResult<T> = Result<T, FulfillmentError>;

/// Fulfillment error type.
#[derive(Debug, Error)]
pub enum FulfillmentError {
    // =========================================================================
    // Domain Errors
    // =========================================================================
    /// A business rule or reference check failed.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A command could not be decoded.
    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    // =========================================================================
    // Infrastructure Errors
    // =========================================================================
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] DbError),

    /// The card operator could not be reached or answered with an error.
    #[error("Card operator error: {0}")]
    CardOperator(String),

    // =========================================================================
    // Configuration Errors
    // =========================================================================
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    #[error("Failed to save config: {0}")]
    ConfigSaveFailed(String),

    // =========================================================================
    // Task Errors
    // =========================================================================
    /// Channel send/receive failed.
    #[error("Channel error: {0}")]
    ChannelError(String),
}

/// Coarse classification of a [`FulfillmentError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The request breaks a rule or is malformed.
    BusinessRule,
    /// The request references something that does not exist.
    NotFound,
    /// Something outside the request failed.
    Infrastructure,
}

impl FulfillmentError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FulfillmentError::Core(e) if e.is_not_found() => ErrorKind::NotFound,
            FulfillmentError::Core(_) | FulfillmentError::InvalidCommand(_) => {
                ErrorKind::BusinessRule
            }
            _ => ErrorKind::Infrastructure,
        }
    }

    /// The domain error, if this is one.
    pub fn as_core(&self) -> Option<&CoreError> {
        match self {
            FulfillmentError::Core(e) => Some(e),
            _ => None,
        }
    }
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<sqlx::Error> for FulfillmentError {
    fn from(err: sqlx::Error) -> Self {
        FulfillmentError::Database(DbError::from(err))
    }
}

impl From<storefront_core::ValidationError> for FulfillmentError {
    fn from(err: storefront_core::ValidationError) -> Self {
        FulfillmentError::Core(CoreError::from(err))
    }
}

impl From<serde_json::Error> for FulfillmentError {
    fn from(err: serde_json::Error) -> Self {
        FulfillmentError::InvalidCommand(err.to_string())
    }
}

impl From<std::io::Error> for FulfillmentError {
    fn from(err: std::io::Error) -> Self {
        FulfillmentError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for FulfillmentError {
    fn from(err: toml::de::Error) -> Self {
        FulfillmentError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for FulfillmentError {
    fn from(err: toml::ser::Error) -> Self {
        FulfillmentError::ConfigSaveFailed(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds() {
        let out_of_stock = FulfillmentError::from(CoreError::OutOfStock {
            product_id: "p".into(),
            available: 1,
            requested: 3,
        });
        assert_eq!(out_of_stock.kind(), ErrorKind::BusinessRule);

        let missing = FulfillmentError::from(CoreError::OrderNotFound("o".into()));
        assert_eq!(missing.kind(), ErrorKind::NotFound);

        let db = FulfillmentError::from(DbError::PoolExhausted);
        assert_eq!(db.kind(), ErrorKind::Infrastructure);

        let bad = FulfillmentError::InvalidCommand("nope".into());
        assert_eq!(bad.kind(), ErrorKind::BusinessRule);
    }

    #[test]
    fn test_core_message_passes_through() {
        let err = FulfillmentError::from(CoreError::CartNotFound {
            customer_id: "c1".into(),
        });
        assert_eq!(err.to_string(), "Cart not found for customer c1");
        assert!(err.as_core().is_some());
    }
}
