//! # Card Operator
//!
//! The external authorization seam used by settlement, plus a simulated
//! operator driven by configuration.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use storefront_core::Money;

use crate::config::CardOperatorSettings;
use crate::error::FulfillmentResult;

/// One card charge inside an authorization request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardChargeLine {
    pub card_id: String,
    pub card_number: String,
    pub amount: Money,
}

/// What the operator is asked to authorize.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationRequest {
    pub customer_id: String,
    /// Sum of `lines[*].amount`.
    pub amount: Money,
    pub lines: Vec<CardChargeLine>,
}

/// The operator's answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationDecision {
    pub approved: bool,
    pub message: String,
}

impl AuthorizationDecision {
    pub fn approved(message: impl Into<String>) -> Self {
        AuthorizationDecision {
            approved: true,
            message: message.into(),
        }
    }

    pub fn declined(message: impl Into<String>) -> Self {
        AuthorizationDecision {
            approved: false,
            message: message.into(),
        }
    }
}

/// Authorizes card charges.
///
/// An `Err` means the operator could not answer; settlement treats it like
/// a decline.
#[async_trait]
pub trait CardOperator: Send + Sync {
    async fn authorize(
        &self,
        request: &AuthorizationRequest,
    ) -> FulfillmentResult<AuthorizationDecision>;
}

// =============================================================================
// Simulated Operator
// =============================================================================

/// Rule-based stand-in for a real card network.
#[derive(Debug, Clone)]
pub struct SimulatedCardOperator {
    settings: CardOperatorSettings,
}

impl SimulatedCardOperator {
    pub fn new(settings: CardOperatorSettings) -> Self {
        SimulatedCardOperator { settings }
    }

    fn decide(&self, request: &AuthorizationRequest) -> AuthorizationDecision {
        if !self.settings.enabled {
            return AuthorizationDecision::approved("Card operator disabled");
        }
        if request.lines.is_empty() {
            return AuthorizationDecision::declined("No card payments to authorize");
        }
        if request.customer_id.trim().is_empty() {
            return AuthorizationDecision::declined("Customer is required");
        }
        if !request.amount.is_positive() {
            return AuthorizationDecision::declined("Amount must be positive");
        }

        let limit = Money::from_cents(self.settings.max_amount_per_card_cents);
        for line in &request.lines {
            let digits: String = line
                .card_number
                .chars()
                .filter(|c| c.is_ascii_digit())
                .collect();

            if !(13..=19).contains(&digits.len()) {
                return AuthorizationDecision::declined(format!(
                    "Card {} has an invalid number",
                    line.card_id
                ));
            }
            if line.amount > limit {
                return AuthorizationDecision::declined(format!(
                    "Card {} amount {} exceeds the limit of {}",
                    line.card_id, line.amount, limit
                ));
            }
            if self
                .settings
                .rejected_card_suffixes
                .iter()
                .any(|suffix| !suffix.is_empty() && digits.ends_with(suffix.as_str()))
            {
                return AuthorizationDecision::declined(format!(
                    "Card {} declined by issuer",
                    line.card_id
                ));
            }
        }

        AuthorizationDecision::approved("Authorized")
    }
}

#[async_trait]
impl CardOperator for SimulatedCardOperator {
    async fn authorize(
        &self,
        request: &AuthorizationRequest,
    ) -> FulfillmentResult<AuthorizationDecision> {
        let decision = self.decide(request);
        debug!(
            customer_id = %request.customer_id,
            amount = %request.amount,
            cards = request.lines.len(),
            approved = decision.approved,
            message = %decision.message,
            "Simulated card authorization"
        );
        Ok(decision)
    }
}
