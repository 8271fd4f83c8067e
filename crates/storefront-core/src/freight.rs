//! # Freight
//!
//! Shipping cost for an order, behind the [`FreightRule`] trait so stores can
//! plug in their own pricing.
//!
//! ## Default Rule
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  base = total_weight_kg × 2.50 + 3.00 handling                          │
//! │                                                                         │
//! │  country outside home countries ──► base × 1.80                         │
//! │  state outside home states      ──► base × 1.25                         │
//! │  otherwise                      ──► base                                │
//! │                                                                         │
//! │  Rounded half-up to the cent.                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};

use crate::money::Money;
use crate::types::Address;

/// Weight and quantity of one order line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShippedLine {
    pub weight_grams: i64,
    pub quantity: i64,
}

/// Computes freight for a set of lines shipped to `destination`.
pub trait FreightRule: Send + Sync {
    fn freight(&self, lines: &[ShippedLine], destination: &Address) -> Money;
}

/// Weight-based freight with regional multipliers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeightBasedFreight {
    pub per_kg_cents: i64,
    pub handling_cents: i64,
    /// Percent, e.g. 125 for ×1.25.
    pub interstate_multiplier_pct: i64,
    /// Percent, e.g. 180 for ×1.80.
    pub international_multiplier_pct: i64,
    /// Uppercase country names treated as domestic.
    pub home_countries: Vec<String>,
    /// Uppercase state names that ship without the interstate multiplier.
    pub home_states: Vec<String>,
}

impl Default for WeightBasedFreight {
    fn default() -> Self {
        WeightBasedFreight {
            per_kg_cents: 250,
            handling_cents: 300,
            interstate_multiplier_pct: 125,
            international_multiplier_pct: 180,
            home_countries: vec!["BRASIL".to_string(), "BRAZIL".to_string()],
            home_states: vec!["SP".to_string(), "SAO PAULO".to_string()],
        }
    }
}

impl WeightBasedFreight {
    fn multiplier_pct(&self, destination: &Address) -> i64 {
        let normalized = |s: &Option<String>| s.as_ref().map(|v| v.trim().to_uppercase());

        if let Some(country) = normalized(&destination.country) {
            if !self.home_countries.iter().any(|c| *c == country) {
                return self.international_multiplier_pct;
            }
        }

        if let Some(state) = normalized(&destination.state) {
            if !self.home_states.iter().any(|s| *s == state) {
                return self.interstate_multiplier_pct;
            }
        }

        100
    }
}

impl FreightRule for WeightBasedFreight {
    fn freight(&self, lines: &[ShippedLine], destination: &Address) -> Money {
        let grams: i128 = lines
            .iter()
            .map(|l| l.weight_grams as i128 * l.quantity as i128)
            .sum();

        // milli-cents: grams × cents/kg, plus handling scaled by 1000
        let base = grams * self.per_kg_cents as i128 + self.handling_cents as i128 * 1000;
        let scaled = base * self.multiplier_pct(destination) as i128;

        // ÷ (1000 milli × 100 pct), half-up
        let cents = (scaled + 50_000) / 100_000;
        Money::from_cents(cents as i64)
    }
}

/// Fixed freight regardless of weight or destination.
#[derive(Debug, Clone, Copy, Default)]
pub struct FlatFreight(pub Money);

impl FreightRule for FlatFreight {
    fn freight(&self, _lines: &[ShippedLine], _destination: &Address) -> Money {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn address(state: Option<&str>, country: Option<&str>) -> Address {
        Address {
            id: "addr".into(),
            customer_id: "cust".into(),
            street: "Rua A, 1".into(),
            city: "Cidade".into(),
            state: state.map(String::from),
            country: country.map(String::from),
        }
    }

    #[test]
    fn test_home_state() {
        let rule = WeightBasedFreight::default();
        // 2 × 500g = 1kg → 2.50 + 3.00
        let lines = [ShippedLine { weight_grams: 500, quantity: 2 }];
        let cost = rule.freight(&lines, &address(Some("sp"), Some("Brasil")));
        assert_eq!(cost.cents(), 550);
    }

    #[test]
    fn test_interstate() {
        let rule = WeightBasedFreight::default();
        let lines = [ShippedLine { weight_grams: 1000, quantity: 1 }];
        // 5.50 × 1.25 = 6.875 → 6.88
        let cost = rule.freight(&lines, &address(Some("RJ"), Some("BRAZIL")));
        assert_eq!(cost.cents(), 688);
    }

    #[test]
    fn test_international_ignores_state() {
        let rule = WeightBasedFreight::default();
        let lines = [ShippedLine { weight_grams: 1000, quantity: 1 }];
        // 5.50 × 1.80 = 9.90
        let cost = rule.freight(&lines, &address(Some("SP"), Some("Portugal")));
        assert_eq!(cost.cents(), 990);
    }

    #[test]
    fn test_missing_region_is_domestic() {
        let rule = WeightBasedFreight::default();
        let cost = rule.freight(&[], &address(None, None));
        assert_eq!(cost.cents(), 300);
    }

    #[test]
    fn test_flat() {
        let rule = FlatFreight(Money::zero());
        assert!(rule.freight(&[], &address(None, None)).is_zero());
    }
}
