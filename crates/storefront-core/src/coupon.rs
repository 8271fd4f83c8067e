//! # Change Coupons
//!
//! When coupons pay for more than they owe, the difference goes back to the
//! customer as a new EXCHANGE coupon.
//!
//! ```text
//! total 100.00 = card 0.00 + coupons owe 100.00
//! coupons paid   120.00
//!                ──────
//! change          20.00  → TROCO-1A2B3C4D (EXCHANGE, 90 days)
//! ```

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{Coupon, CouponType, Order};

/// Prefix that marks change coupons apart from promotional codes.
pub const CHANGE_COUPON_PREFIX: &str = "TROCO-";

/// Default lifetime of a change coupon.
pub const DEFAULT_CHANGE_COUPON_VALIDITY_DAYS: i64 = 90;

/// Longest change coupon lifetime a configuration may ask for: ten years.
pub const MAX_CHANGE_COUPON_VALIDITY_DAYS: i64 = 3_650;

/// Coupon value paid beyond what the coupons owed.
///
/// `coupon_paid - (total - card_paid)`, clamped to zero.
pub fn coupon_overpay(order: &Order) -> Money {
    let owed_by_coupons = order.total() - order.card_paid();
    (order.coupon_paid() - owed_by_coupons).clamp_zero()
}

/// Generates a candidate change-coupon code.
///
/// Callers must check the code is not taken and retry if it is.
pub fn generate_change_code() -> String {
    let suffix: String = Uuid::new_v4()
        .simple()
        .to_string()
        .chars()
        .take(8)
        .collect();
    format!("{}{}", CHANGE_COUPON_PREFIX, suffix.to_uppercase())
}

/// Builds the change coupon for `customer_id`, expiring `validity_days`
/// after `now`.
///
/// ## Errors
/// `InvalidCouponValidity` when `validity_days <= 0` or the expiry cannot be
/// represented.
pub fn change_coupon(
    customer_id: &str,
    value: Money,
    code: String,
    now: DateTime<Utc>,
    validity_days: i64,
) -> CoreResult<Coupon> {
    let invalid = || CoreError::InvalidCouponValidity {
        days: validity_days,
    };
    if validity_days <= 0 {
        return Err(invalid());
    }
    let expires_at = Duration::try_days(validity_days)
        .and_then(|validity| now.checked_add_signed(validity))
        .ok_or_else(invalid)?;

    Ok(Coupon {
        id: Uuid::new_v4().to_string(),
        code,
        coupon_type: CouponType::Exchange,
        value_cents: value.cents(),
        customer_id: customer_id.to_string(),
        is_used: false,
        used_at: None,
        expires_at: Some(expires_at),
        created_at: now,
        updated_at: now,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{OrderPayment, OrderStatus};

    fn order_with(total: i64, card: i64, coupons: &[i64]) -> Order {
        let now = Utc::now();
        let mut payments: Vec<OrderPayment> = coupons
            .iter()
            .enumerate()
            .map(|(i, cents)| OrderPayment {
                id: format!("p{}", i),
                order_id: "ord".into(),
                card_id: None,
                coupon_id: Some(format!("cp{}", i)),
                amount_cents: *cents,
                position: i as i64,
            })
            .collect();
        if card > 0 {
            payments.push(OrderPayment {
                id: "pc".into(),
                order_id: "ord".into(),
                card_id: Some("card".into()),
                coupon_id: None,
                amount_cents: card,
                position: payments.len() as i64,
            });
        }
        Order {
            id: "ord".into(),
            customer_id: "cust".into(),
            delivery_address_id: "addr".into(),
            status: OrderStatus::Processing,
            subtotal_cents: total,
            freight_cost_cents: 0,
            total_cents: total,
            purchased_at: now,
            dispatched_at: None,
            delivered_at: None,
            updated_at: now,
            lines: vec![],
            payments,
        }
    }

    #[test]
    fn test_overpay_from_coupons_only() {
        assert_eq!(coupon_overpay(&order_with(10000, 0, &[12000])).cents(), 2000);
    }

    #[test]
    fn test_overpay_accounts_for_card() {
        // card covers 30.00, coupons owe 70.00, coupons paid 80.00
        assert_eq!(
            coupon_overpay(&order_with(10000, 3000, &[8000])).cents(),
            1000
        );
    }

    #[test]
    fn test_no_overpay() {
        assert!(coupon_overpay(&order_with(10000, 2000, &[8000])).is_zero());
        assert!(coupon_overpay(&order_with(10000, 10000, &[])).is_zero());
    }

    #[test]
    fn test_change_code_shape() {
        let code = generate_change_code();
        assert!(code.starts_with(CHANGE_COUPON_PREFIX));
        let suffix = &code[CHANGE_COUPON_PREFIX.len()..];
        assert_eq!(suffix.len(), 8);
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase()));
    }

    #[test]
    fn test_change_coupon_fields() {
        let now = Utc::now();
        let coupon =
            change_coupon("cust", Money::from_cents(2000), "TROCO-ABCDEF12".into(), now, 90)
                .unwrap();
        assert_eq!(coupon.coupon_type, CouponType::Exchange);
        assert_eq!(coupon.value_cents, 2000);
        assert!(!coupon.is_used);
        assert_eq!(coupon.expires_at, Some(now + Duration::days(90)));
    }

    #[test]
    fn test_change_coupon_validity_out_of_range() {
        let now = Utc::now();
        let value = Money::from_cents(2000);

        for days in [0, -1, i64::MAX] {
            let err = change_coupon("cust", value, "TROCO-ABCDEF12".into(), now, days).unwrap_err();
            assert!(matches!(err, CoreError::InvalidCouponValidity { days: d } if d == days));
        }
        assert!(change_coupon("cust", value, "TROCO-ABCDEF12".into(), now, MAX_CHANGE_COUPON_VALIDITY_DAYS).is_ok());
    }
}
