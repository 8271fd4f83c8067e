//! # Payment Allocation
//!
//! Turns a customer's payment instructions into the ordered list of order
//! payments.
//!
//! ## Allocation Rules
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Payment Allocation                                 │
//! │                                                                         │
//! │  Instructions: card 30.00, coupon 30.00, coupon 80.00   Total: 100.00  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  1. Sort coupons by value DESC (ties by id)     → [80.00, 30.00]       │
//! │  2. Validate each coupon: owner, unused, unexpired, no duplicates,     │
//! │     at most one PROMOTIONAL                                            │
//! │  3. Card minimum (10.00) unless a coupon is present                    │
//! │  4. Σ instructions >= total, card portions alone <= total              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Apply while something is still owed:                                  │
//! │     coupon 80.00  → owed 20.00                                         │
//! │     coupon 30.00  → owed -10.00  (10.00 becomes change at settlement)  │
//! │     card          → nothing owed, omitted                              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Output: [coupon 80.00, coupon 30.00]                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Cards are always charged `min(owed, requested)`, so whatever exceeds the
//! total is coupon value, never card money.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use ts_rs::TS;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{Coupon, CouponType, OrderPayment};
use crate::validation::validate_payment_amount;

/// Default minimum card portion: $10.00.
pub const DEFAULT_MIN_CARD_AMOUNT_CENTS: i64 = 1000;

// =============================================================================
// Instructions
// =============================================================================

/// One payment entry as submitted with `CreateOrder`.
///
/// Naming both a card and a coupon yields two instructions. The amount only
/// applies to the card; a coupon always contributes its full value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    pub card_id: Option<String>,
    pub coupon_id: Option<String>,
    pub amount_cents: Option<i64>,
}

/// A validated payment instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentInstruction {
    Card { card_id: String, amount: Money },
    Coupon { coupon_id: String },
}

impl PaymentRequest {
    pub fn card(card_id: impl Into<String>, amount: Money) -> Self {
        PaymentRequest {
            card_id: Some(card_id.into()),
            coupon_id: None,
            amount_cents: Some(amount.cents()),
        }
    }

    pub fn coupon(coupon_id: impl Into<String>) -> Self {
        PaymentRequest {
            card_id: None,
            coupon_id: Some(coupon_id.into()),
            amount_cents: None,
        }
    }

    /// Splits the request into instructions.
    pub fn into_instructions(self) -> CoreResult<Vec<PaymentInstruction>> {
        let mut out = Vec::with_capacity(2);

        if let Some(coupon_id) = self.coupon_id {
            out.push(PaymentInstruction::Coupon { coupon_id });
        }

        if let Some(card_id) = self.card_id {
            let cents = self.amount_cents.ok_or_else(|| ValidationError::Required {
                field: "amount".to_string(),
            })?;
            validate_payment_amount(cents)?;
            out.push(PaymentInstruction::Card {
                card_id,
                amount: Money::from_cents(cents),
            });
        }

        if out.is_empty() {
            return Err(ValidationError::Required {
                field: "cardId or couponId".to_string(),
            }
            .into());
        }

        Ok(out)
    }
}

/// Flattens a list of requests into instructions.
///
/// ## Errors
/// A `Required` validation error when the list is empty or an entry names
/// neither instrument.
pub fn instructions_from(requests: Vec<PaymentRequest>) -> CoreResult<Vec<PaymentInstruction>> {
    if requests.is_empty() {
        return Err(ValidationError::Required {
            field: "payments".to_string(),
        }
        .into());
    }

    let mut out = Vec::new();
    for request in requests {
        out.extend(request.into_instructions()?);
    }
    Ok(out)
}

// =============================================================================
// Allocation
// =============================================================================

/// The instrument behind an allocated payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum PaymentSource {
    Card(String),
    Coupon(String),
}

/// One allocated payment, before it is attached to an order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocatedPayment {
    pub source: PaymentSource,
    pub amount: Money,
}

impl AllocatedPayment {
    /// Builds the stored order payment at `position`.
    pub fn into_order_payment(self, order_id: &str, position: i64) -> OrderPayment {
        let (card_id, coupon_id) = match self.source {
            PaymentSource::Card(id) => (Some(id), None),
            PaymentSource::Coupon(id) => (None, Some(id)),
        };
        OrderPayment {
            id: Uuid::new_v4().to_string(),
            order_id: order_id.to_string(),
            card_id,
            coupon_id,
            amount_cents: self.amount.cents(),
            position,
        }
    }
}

/// A requested card charge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardPortion {
    pub card_id: String,
    pub amount: Money,
}

/// Tunables for allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocationPolicy {
    /// Smallest card portion accepted without a coupon.
    pub min_card_amount: Money,
}

impl Default for AllocationPolicy {
    fn default() -> Self {
        AllocationPolicy {
            min_card_amount: Money::from_cents(DEFAULT_MIN_CARD_AMOUNT_CENTS),
        }
    }
}

/// Checks that `coupon` can back a payment by `customer_id` at `now`.
pub fn validate_coupon(coupon: &Coupon, customer_id: &str, now: DateTime<Utc>) -> CoreResult<()> {
    if coupon.customer_id != customer_id {
        return Err(CoreError::invalid_coupon(
            &coupon.code,
            "belongs to another customer",
        ));
    }
    if coupon.is_used {
        return Err(CoreError::invalid_coupon(&coupon.code, "already used"));
    }
    if coupon.is_expired_at(now) {
        return Err(CoreError::invalid_coupon(&coupon.code, "expired"));
    }
    Ok(())
}

/// Merges portions for the same card, keeping first-seen order.
fn merge_cards(cards: Vec<CardPortion>) -> Vec<CardPortion> {
    let mut merged: Vec<CardPortion> = Vec::with_capacity(cards.len());
    for portion in cards {
        match merged.iter_mut().find(|p| p.card_id == portion.card_id) {
            Some(existing) => existing.amount += portion.amount,
            None => merged.push(portion),
        }
    }
    merged
}

/// Allocates coupons and card portions against `total`.
///
/// `coupons` holds the loaded coupon for every coupon instruction, in
/// submission order; `cards` holds every card instruction.
///
/// ## Errors
/// - `Validation` when there is nothing to pay with or a card amount is
///   not positive
/// - `InvalidCoupon` for a duplicated, foreign, used, expired, or second
///   promotional coupon
/// - `BelowMinimumCardAmount` for a small card portion with no coupon
/// - `InsufficientPayment` when everything together is short of `total`
/// - `OverpaymentNotAllowedOnCard` when cards alone exceed `total`
pub fn allocate_payments(
    total: Money,
    customer_id: &str,
    mut coupons: Vec<Coupon>,
    cards: Vec<CardPortion>,
    policy: &AllocationPolicy,
    now: DateTime<Utc>,
) -> CoreResult<Vec<AllocatedPayment>> {
    if coupons.is_empty() && cards.is_empty() {
        return Err(ValidationError::Required {
            field: "payments".to_string(),
        }
        .into());
    }

    // Rule 1: value descending, id as tie-breaker
    coupons.sort_by(|a, b| {
        b.value_cents
            .cmp(&a.value_cents)
            .then_with(|| a.id.cmp(&b.id))
    });

    // Rule 2: every coupon individually and as a set
    let mut seen = HashSet::new();
    let mut promotional = 0;
    for coupon in &coupons {
        if !seen.insert(coupon.id.as_str()) {
            return Err(CoreError::invalid_coupon(
                &coupon.code,
                "listed more than once",
            ));
        }
        validate_coupon(coupon, customer_id, now)?;
        if coupon.coupon_type == CouponType::Promotional {
            promotional += 1;
            if promotional > 1 {
                return Err(CoreError::invalid_coupon(
                    &coupon.code,
                    "only one promotional coupon per order",
                ));
            }
        }
    }

    // Each entry on its own; a merged sum can hide a negative one
    for portion in &cards {
        validate_payment_amount(portion.amount.cents())?;
    }
    let cards = merge_cards(cards);

    // Rule 3
    let has_coupon = !coupons.is_empty();
    if !has_coupon {
        if let Some(small) = cards.iter().find(|p| p.amount < policy.min_card_amount) {
            return Err(CoreError::BelowMinimumCardAmount {
                amount: small.amount,
                minimum: policy.min_card_amount,
            });
        }
    }

    // Rule 4
    let coupon_total: Money = coupons.iter().map(Coupon::value).sum();
    let card_total: Money = cards.iter().map(|p| p.amount).sum();
    let offered = coupon_total + card_total;
    if offered < total {
        return Err(CoreError::InsufficientPayment {
            required: total,
            offered,
        });
    }
    if card_total > total {
        return Err(CoreError::OverpaymentNotAllowedOnCard {
            card_total,
            order_total: total,
        });
    }

    let mut owed = total;
    let mut allocated = Vec::with_capacity(coupons.len() + cards.len());

    for coupon in coupons {
        if !owed.is_positive() {
            break;
        }
        owed -= coupon.value();
        allocated.push(AllocatedPayment {
            source: PaymentSource::Coupon(coupon.id),
            amount: Money::from_cents(coupon.value_cents),
        });
    }

    for portion in cards {
        if !owed.is_positive() {
            break;
        }
        let charged = owed.min(portion.amount);
        owed -= charged;
        allocated.push(AllocatedPayment {
            source: PaymentSource::Card(portion.card_id),
            amount: charged,
        });
    }

    Ok(allocated)
}

// =============================================================================
// Unit Tests
// =============================================================================
