//! # Order Transitions
//!
//! The order status machine is strictly linear:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   PROCESSING ──Approve──► APPROVED ──Dispatch──► IN_TRANSIT            │
//! │        │                                             │                  │
//! │        └──Reject──► REJECTED                         └──Deliver──►      │
//! │                                                        DELIVERED       │
//! │                                                                         │
//! │   No backward edges. No skip-ahead. REJECTED and DELIVERED are final.  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Transitions never mutate in place: [`Order::transitioned`] returns the
//! updated order together with the [`StatusChange`] it applied.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{CoreError, CoreResult};
use crate::types::{Order, OrderStatus};

/// A request to move an order forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderEvent {
    Approve,
    Reject,
    Dispatch,
    Deliver,
}

impl fmt::Display for OrderEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OrderEvent::Approve => "approve",
            OrderEvent::Reject => "reject",
            OrderEvent::Dispatch => "dispatch",
            OrderEvent::Deliver => "deliver",
        };
        f.write_str(name)
    }
}

/// The edge taken through the status machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChange {
    pub from: OrderStatus,
    pub to: OrderStatus,
    pub event: OrderEvent,
}

impl OrderStatus {
    /// Returns the status `event` leads to, if the edge exists.
    pub fn next(self, event: OrderEvent) -> Option<OrderStatus> {
        use OrderEvent::*;
        use OrderStatus::*;

        match (self, event) {
            (Processing, Approve) => Some(Approved),
            (Processing, Reject) => Some(Rejected),
            (Approved, Dispatch) => Some(InTransit),
            (InTransit, Deliver) => Some(Delivered),
            _ => None,
        }
    }

    /// True when no event leads anywhere.
    pub fn is_final(self) -> bool {
        matches!(self, OrderStatus::Rejected | OrderStatus::Delivered)
    }
}

impl Order {
    /// Applies `event` at time `at`.
    ///
    /// Dispatch stamps `dispatched_at`; delivery stamps `delivered_at`.
    ///
    /// ## Errors
    /// `InvalidOrderState` when the current status has no edge for `event`.
    pub fn transitioned(
        &self,
        event: OrderEvent,
        at: DateTime<Utc>,
    ) -> CoreResult<(Order, StatusChange)> {
        let to = self
            .status
            .next(event)
            .ok_or_else(|| CoreError::InvalidOrderState {
                order_id: self.id.clone(),
                current: self.status,
                action: event.to_string(),
            })?;

        let mut next = self.clone();
        next.status = to;
        next.updated_at = at;
        match event {
            OrderEvent::Dispatch => next.dispatched_at = Some(at),
            OrderEvent::Deliver => next.delivered_at = Some(at),
            OrderEvent::Approve | OrderEvent::Reject => {}
        }

        let change = StatusChange {
            from: self.status,
            to,
            event,
        };
        Ok((next, change))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn order(status: OrderStatus) -> Order {
        let now = Utc::now();
        Order {
            id: "ord-1".to_string(),
            customer_id: "cust-1".to_string(),
            delivery_address_id: "addr-1".to_string(),
            status,
            subtotal_cents: 1000,
            freight_cost_cents: 0,
            total_cents: 1000,
            purchased_at: now,
            dispatched_at: None,
            delivered_at: None,
            updated_at: now,
            lines: vec![],
            payments: vec![],
        }
    }

    #[test]
    fn test_happy_path_is_linear() {
        let at = Utc::now();
        let (approved, change) = order(OrderStatus::Processing)
            .transitioned(OrderEvent::Approve, at)
            .unwrap();
        assert_eq!(change.from, OrderStatus::Processing);
        assert_eq!(change.to, OrderStatus::Approved);

        let (shipped, _) = approved.transitioned(OrderEvent::Dispatch, at).unwrap();
        assert_eq!(shipped.status, OrderStatus::InTransit);
        assert_eq!(shipped.dispatched_at, Some(at));

        let (delivered, _) = shipped.transitioned(OrderEvent::Deliver, at).unwrap();
        assert_eq!(delivered.status, OrderStatus::Delivered);
        assert_eq!(delivered.delivered_at, Some(at));
        assert!(delivered.status.is_final());
    }

    #[test]
    fn test_dispatch_processing_order_fails() {
        let err = order(OrderStatus::Processing)
            .transitioned(OrderEvent::Dispatch, Utc::now())
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::InvalidOrderState {
                current: OrderStatus::Processing,
                ..
            }
        ));
    }

    #[test]
    fn test_approve_twice_fails() {
        let err = order(OrderStatus::Approved)
            .transitioned(OrderEvent::Approve, Utc::now())
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidOrderState { .. }));
    }

    #[test]
    fn test_no_backward_or_skip_edges() {
        let all = [
            OrderStatus::Processing,
            OrderStatus::Approved,
            OrderStatus::Rejected,
            OrderStatus::InTransit,
            OrderStatus::Delivered,
        ];
        let events = [
            OrderEvent::Approve,
            OrderEvent::Reject,
            OrderEvent::Dispatch,
            OrderEvent::Deliver,
        ];

        let mut edges = 0;
        for status in all {
            for event in events {
                if status.next(event).is_some() {
                    edges += 1;
                }
            }
        }
        assert_eq!(edges, 4);
        assert_eq!(OrderStatus::Rejected.next(OrderEvent::Approve), None);
        assert_eq!(OrderStatus::InTransit.next(OrderEvent::Reject), None);
        assert_eq!(OrderStatus::Approved.next(OrderEvent::Deliver), None);
    }

    #[test]
    fn test_transition_leaves_original_untouched() {
        let original = order(OrderStatus::Processing);
        let (_, change) = original
            .transitioned(OrderEvent::Reject, Utc::now())
            .unwrap();
        assert_eq!(change.to, OrderStatus::Rejected);
        assert_eq!(original.status, OrderStatus::Processing);
    }
}
