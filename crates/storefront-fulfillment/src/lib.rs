//! # storefront-fulfillment: Reservation & Settlement Services
//!
//! Runs the storefront-core rules inside storefront-db transactions.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        FulfillmentService                               │
//! │                     (Command ─► CommandOutcome)                         │
//! │                                                                         │
//! │         ┌──────────────────────┼──────────────────────┐                 │
//! │         ▼                      ▼                      ▼                  │
//! │  ┌──────────────────┐  ┌────────────────┐  ┌────────────────────────┐   │
//! │  │ReservationManager│  │ OrderAssembler │  │   SettlementEngine     │   │
//! │  │                  │  │                │  │                        │   │
//! │  │ soft holds with  │  │ active lines → │  │ approve / reject /     │   │
//! │  │ a TTL window     │  │ order + freight│  │ dispatch / deliver     │   │
//! │  │        │         │  │        │       │  │        │               │   │
//! │  │   StockLedger    │  │ PaymentAllocator│ │   CardOperator         │   │
//! │  └──────────────────┘  └────────────────┘  └────────────────────────┘   │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │ ExpirationSweeper (own task): deletes holds past expires_at      │  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//! - [`service`] - `FulfillmentService` command facade
//! - [`commands`] - `Command` / `CommandOutcome`
//! - [`ledger`] - available stock
//! - [`reservation`] - cart holds
//! - [`sweeper`] - expired hold cleanup
//! - [`allocator`] - payment instruction resolution
//! - [`assembler`] - cart to order
//! - [`settlement`] - order lifecycle and approval side effects
//! - [`card_operator`] - authorization seam and simulated operator
//! - [`clock`] - time source
//! - [`config`] - TOML + environment configuration
//! - [`error`] - error types
//!
//! ## Usage
//!
//! ```rust,ignore
//! use storefront_db::{Database, DbConfig};
//! use storefront_fulfillment::{Command, FulfillmentConfig, FulfillmentService};
//!
//! let config = FulfillmentConfig::load_or_default(None);
//! let db = Database::new(DbConfig::new(&config.database.path)).await?;
//! let service = FulfillmentService::from_config(db, config);
//!
//! let (sweeper, handle) = service.sweeper();
//! tokio::spawn(sweeper.run());
//!
//! service
//!     .execute(Command::ReserveItem {
//!         customer_id: "c1".into(),
//!         product_id: "p1".into(),
//!         quantity: 2,
//!     })
//!     .await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod allocator;
pub mod assembler;
pub mod card_operator;
pub mod clock;
pub mod commands;
pub mod config;
pub mod error;
pub mod ledger;
pub mod reservation;
pub mod service;
pub mod settlement;
pub mod sweeper;

#[cfg(test)]
mod testing;

// =============================================================================
// Re-exports
// =============================================================================

pub use card_operator::{
    AuthorizationDecision, AuthorizationRequest, CardChargeLine, CardOperator,
    SimulatedCardOperator,
};
pub use clock::{Clock, ManualClock, SystemClock};
pub use commands::{Command, CommandOutcome};
pub use config::FulfillmentConfig;
pub use error::{ErrorKind, FulfillmentError, FulfillmentResult};
pub use service::FulfillmentService;
pub use settlement::Settlement;
pub use sweeper::{ExpirationSweeper, SweeperHandle};
