//! # Payment Allocator
//!
//! Resolves payment instructions against the stores, then hands them to
//! [`storefront_core::payment::allocate_payments`].
//!
//! ```text
//! instructions ──► Coupon { id } ──► CouponRepository ──► missing? InvalidCoupon
//!              └─► Card { id, amt } ► CustomerRepository ► missing? CardNotFound
//!                                                          foreign? InvalidCard
//!                          │
//!                          ▼
//!          allocate_payments(total, customer, coupons, cards, policy, now)
//! ```

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;

use storefront_core::payment::{
    allocate_payments, AllocatedPayment, AllocationPolicy, CardPortion, PaymentInstruction,
};
use storefront_core::{CoreError, Money};
use storefront_db::{CouponRepository, CustomerRepository};

use crate::error::FulfillmentResult;

/// Turns payment instructions into an ordered payment list.
#[derive(Debug, Clone, Copy, Default)]
pub struct PaymentAllocator {
    policy: AllocationPolicy,
}

impl PaymentAllocator {
    pub fn new(policy: AllocationPolicy) -> Self {
        PaymentAllocator { policy }
    }

    pub fn policy(&self) -> &AllocationPolicy {
        &self.policy
    }

    /// Allocates `instructions` against `total` for `customer_id`.
    ///
    /// Coupons come first in the result, highest value first; cards last.
    pub async fn allocate(
        &self,
        conn: &mut SqliteConnection,
        customer_id: &str,
        total: Money,
        instructions: &[PaymentInstruction],
        now: DateTime<Utc>,
    ) -> FulfillmentResult<Vec<AllocatedPayment>> {
        let mut coupons = Vec::new();
        let mut cards = Vec::new();

        for instruction in instructions {
            match instruction {
                PaymentInstruction::Coupon { coupon_id } => {
                    let coupon = CouponRepository::new(&mut *conn)
                        .get_by_id(coupon_id)
                        .await?
                        .ok_or_else(|| CoreError::invalid_coupon(coupon_id, "not found"))?;
                    coupons.push(coupon);
                }
                PaymentInstruction::Card { card_id, amount } => {
                    let card = CustomerRepository::new(&mut *conn)
                        .get_card(card_id)
                        .await?
                        .ok_or_else(|| CoreError::CardNotFound(card_id.clone()))?;
                    if card.customer_id != customer_id {
                        return Err(CoreError::InvalidCard(card.id).into());
                    }
                    cards.push(CardPortion {
                        card_id: card.id,
                        amount: *amount,
                    });
                }
            }
        }

        Ok(allocate_payments(
            total,
            customer_id,
            coupons,
            cards,
            &self.policy,
            now,
        )?)
    }
}
