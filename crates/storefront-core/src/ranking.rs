//! # Customer Ranking
//!
//! Every approved order raises the customer's loyalty ranking.
//!
//! ```text
//! increment = total / 100          (rounded half-up to 0.01)
//!           + 0.10 × units bought
//!           + 0.05 × payment sources
//!
//! order 55.50, 2 units, coupon + card:
//!   0.56 + 0.20 + 0.10 = 0.86
//! ```
//!
//! Rankings are kept in hundredths of a point, like money in cents, and never
//! go past [`MAX_RANKING`].

use crate::types::Order;

/// Highest ranking a customer can reach: 999.99 points.
pub const MAX_RANKING: i64 = 99_999;

/// Ranking points earned by an approved order, in hundredths.
pub fn ranking_increment(order: &Order) -> i64 {
    // total / 100 measured in hundredths of a point is total_cents / 100
    let order_value = order.total_cents.max(0).saturating_add(50) / 100;

    let units = order
        .lines
        .iter()
        .fold(0i64, |acc, line| acc.saturating_add(line.quantity));

    let sources = order
        .payments
        .iter()
        .filter(|p| p.card_id.is_some() || p.coupon_id.is_some())
        .count() as i64;

    order_value
        .saturating_add(units.saturating_mul(10))
        .saturating_add(sources.saturating_mul(5))
}

/// The ranking after `order` is approved, capped at [`MAX_RANKING`].
pub fn next_ranking(current: i64, order: &Order) -> i64 {
    current
        .max(0)
        .saturating_add(ranking_increment(order))
        .min(MAX_RANKING)
}
