//! # Commands
//!
//! The requests the fulfillment service accepts and what each one returns.
//!
//! ```json
//! {"type": "ReserveItem", "customerId": "c1", "productId": "p1", "quantity": 2}
//! {"type": "CreateOrder", "customerId": "c1", "deliveryAddressId": "a1",
//!  "payments": [{"couponId": "cp1"}, {"cardId": "card1", "amountCents": 550}]}
//! {"type": "ApproveOrder", "orderId": "o1"}
//! ```

use serde::{Deserialize, Serialize};

use storefront_core::payment::PaymentRequest;
use storefront_core::{Cart, Order};

use crate::settlement::Settlement;

/// A command for [`crate::FulfillmentService::execute`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Command {
    #[serde(rename_all = "camelCase")]
    ReserveItem {
        customer_id: String,
        product_id: String,
        quantity: i64,
    },

    #[serde(rename_all = "camelCase")]
    UpdateReservation {
        customer_id: String,
        product_id: String,
        quantity: i64,
    },

    #[serde(rename_all = "camelCase")]
    RemoveReservation {
        customer_id: String,
        product_id: String,
    },

    #[serde(rename_all = "camelCase")]
    ClearCart { customer_id: String },

    #[serde(rename_all = "camelCase")]
    CreateOrder {
        customer_id: String,
        delivery_address_id: String,
        payments: Vec<PaymentRequest>,
    },

    #[serde(rename_all = "camelCase")]
    ApproveOrder { order_id: String },

    #[serde(rename_all = "camelCase")]
    RejectOrder { order_id: String },

    #[serde(rename_all = "camelCase")]
    DispatchOrder { order_id: String },

    #[serde(rename_all = "camelCase")]
    DeliverOrder { order_id: String },

    /// Runs one expiration sweep now.
    ReleaseExpired,
}

impl Command {
    /// Name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Command::ReserveItem { .. } => "ReserveItem",
            Command::UpdateReservation { .. } => "UpdateReservation",
            Command::RemoveReservation { .. } => "RemoveReservation",
            Command::ClearCart { .. } => "ClearCart",
            Command::CreateOrder { .. } => "CreateOrder",
            Command::ApproveOrder { .. } => "ApproveOrder",
            Command::RejectOrder { .. } => "RejectOrder",
            Command::DispatchOrder { .. } => "DispatchOrder",
            Command::DeliverOrder { .. } => "DeliverOrder",
            Command::ReleaseExpired => "ReleaseExpired",
        }
    }
}

/// What a command produced.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum CommandOutcome {
    /// The customer's cart after a reservation change.
    Cart(Cart),
    /// A newly created order.
    Order(Order),
    /// An order after a status transition.
    Settlement(Settlement),
    /// Number of expired holds deleted.
    Released(u64),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_create_order() {
        let json = r#"{
            "type": "CreateOrder",
            "customerId": "c1",
            "deliveryAddressId": "a1",
            "payments": [{"couponId": "cp1"}, {"cardId": "card1", "amountCents": 550}]
        }"#;

        let command: Command = serde_json::from_str(json).unwrap();
        match command {
            Command::CreateOrder {
                customer_id,
                delivery_address_id,
                payments,
            } => {
                assert_eq!(customer_id, "c1");
                assert_eq!(delivery_address_id, "a1");
                assert_eq!(payments[0], PaymentRequest::coupon("cp1"));
                assert_eq!(payments[1].card_id.as_deref(), Some("card1"));
                assert_eq!(payments[1].amount_cents, Some(550));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_tagged_roundtrip() {
        let command = Command::ReserveItem {
            customer_id: "c1".into(),
            product_id: "p1".into(),
            quantity: 2,
        };
        let json = serde_json::to_value(&command).unwrap();
        assert_eq!(json["type"], "ReserveItem");
        assert_eq!(json["customerId"], "c1");

        let unit: Command = serde_json::from_str(r#"{"type": "ReleaseExpired"}"#).unwrap();
        assert_eq!(unit, Command::ReleaseExpired);
        assert_eq!(unit.name(), "ReleaseExpired");
    }

    #[test]
    fn test_unknown_command_is_rejected() {
        assert!(serde_json::from_str::<Command>(r#"{"type": "Refund"}"#).is_err());
    }
}
