//! # Reservation Rules
//!
//! Pure rules behind soft stock holds.
//!
//! ## Soft Lock Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Reservation Lifecycle                              │
//! │                                                                         │
//! │   reserve ──► Created { qty, blocked_at=now, expires_at=now+ttl }      │
//! │      │                                                                  │
//! │      ├── reserve again ──► Incremented (qty += n, window refreshed)    │
//! │      ├── update ─────────► Replaced    (qty  = n, window refreshed)    │
//! │      │                                                                  │
//! │      ├── order created ──► consumed (row deleted)                      │
//! │      ├── removed/cleared ► row deleted                                 │
//! │      └── now > expires_at ► inactive; sweeper deletes it               │
//! │                                                                         │
//! │   Every edit restarts the window, so a cart that keeps changing keeps  │
//! │   its hold. An abandoned cart runs out of time.                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Stock
//! `available = stock_quantity − Σ quantity of active holds`. The bound is
//! checked only when a hold is written, so concurrent writers can push the
//! sum past the stock. [`StockLevel::available`] may therefore be negative;
//! [`StockLevel::ensure_can_hold`] treats negative as zero.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::types::Reservation;

/// Longest hold a configuration may ask for: one year.
pub const MAX_RESERVATION_TTL_MINUTES: i64 = 525_600;

// =============================================================================
// Hold Window
// =============================================================================

/// The `[blocked_at, expires_at)` interval of a hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HoldWindow {
    pub blocked_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl HoldWindow {
    /// Opens a window of `ttl_minutes` starting at `now`.
    ///
    /// ## Errors
    /// `InvalidTtl` when `ttl_minutes <= 0`, which would make
    /// `expires_at <= blocked_at`, or when `now + ttl` is past the last
    /// representable instant.
    pub fn starting_at(now: DateTime<Utc>, ttl_minutes: i64) -> CoreResult<Self> {
        let invalid = || CoreError::InvalidTtl {
            minutes: ttl_minutes,
        };
        if ttl_minutes <= 0 {
            return Err(invalid());
        }

        let expires_at = Duration::try_minutes(ttl_minutes)
            .and_then(|ttl| now.checked_add_signed(ttl))
            .ok_or_else(invalid)?;

        Ok(HoldWindow {
            blocked_at: now,
            expires_at,
        })
    }
}

// =============================================================================
// Transitions
// =============================================================================

/// What a reservation write did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReservationChange {
    /// A new line was opened.
    Created,
    /// An existing line grew; `previous` is its old quantity.
    Incremented { previous: i64 },
    /// An existing line was overwritten; `previous` is its old quantity.
    Replaced { previous: i64 },
}

impl Reservation {
    /// Opens a new hold.
    pub fn open(
        cart_id: &str,
        product_id: &str,
        quantity: i64,
        window: HoldWindow,
    ) -> (Reservation, ReservationChange) {
        let reservation = Reservation {
            id: Uuid::new_v4().to_string(),
            cart_id: cart_id.to_string(),
            product_id: product_id.to_string(),
            quantity,
            is_blocked: true,
            blocked_at: window.blocked_at,
            expires_at: window.expires_at,
        };
        (reservation, ReservationChange::Created)
    }

    /// Quantity after adding `by` units.
    pub fn total_after(&self, by: i64) -> CoreResult<i64> {
        self.quantity.checked_add(by).ok_or_else(|| {
            ValidationError::OutOfRange {
                field: "quantity".to_string(),
                min: 1,
                max: i64::MAX,
            }
            .into()
        })
    }

    /// Adds `by` units and restarts the window.
    pub fn incremented(
        &self,
        by: i64,
        window: HoldWindow,
    ) -> CoreResult<(Reservation, ReservationChange)> {
        let next = Reservation {
            quantity: self.total_after(by)?,
            is_blocked: true,
            blocked_at: window.blocked_at,
            expires_at: window.expires_at,
            ..self.clone()
        };
        Ok((
            next,
            ReservationChange::Incremented {
                previous: self.quantity,
            },
        ))
    }

    /// Sets the quantity outright and restarts the window.
    pub fn replaced(&self, quantity: i64, window: HoldWindow) -> (Reservation, ReservationChange) {
        let next = Reservation {
            quantity,
            is_blocked: true,
            blocked_at: window.blocked_at,
            expires_at: window.expires_at,
            ..self.clone()
        };
        (
            next,
            ReservationChange::Replaced {
                previous: self.quantity,
            },
        )
    }

    /// Whether this line still counts against stock at `now`.
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.is_blocked && self.expires_at > now
    }
}

// =============================================================================
// Stock Level
// =============================================================================

/// Physical stock and the units held against it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockLevel {
    pub on_hand: i64,
    pub reserved: i64,
}

impl StockLevel {
    pub fn new(on_hand: i64, reserved: i64) -> Self {
        StockLevel { on_hand, reserved }
    }

    /// Sums the active holds in `holds`, skipping `excluding`.
    pub fn from_holds<'a>(
        on_hand: i64,
        holds: impl IntoIterator<Item = &'a Reservation>,
        now: DateTime<Utc>,
        excluding: Option<&str>,
    ) -> Self {
        let reserved = holds
            .into_iter()
            .filter(|r| r.is_active_at(now))
            .filter(|r| excluding.map_or(true, |id| r.id != id))
            .map(|r| r.quantity)
            .sum();
        StockLevel { on_hand, reserved }
    }

    /// `on_hand - reserved`, possibly negative.
    #[inline]
    pub fn available(&self) -> i64 {
        self.on_hand - self.reserved
    }

    /// Fails with `OutOfStock` unless `requested` units fit.
    pub fn ensure_can_hold(&self, product_id: &str, requested: i64) -> CoreResult<()> {
        let available = self.available().max(0);
        if requested > available {
            return Err(CoreError::OutOfStock {
                product_id: product_id.to_string(),
                available,
                requested,
            });
        }
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
