//! # Settlement Engine
//!
//! Moves orders through their lifecycle and applies the payment side
//! effects of approval.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                  approve(order_id) (one transaction)                    │
//! │                                                                         │
//! │  PROCESSING? ──no──► InvalidOrderState                                 │
//! │      │                                                                  │
//! │  coupons still valid, stock covers every line                          │
//! │      │                                                                  │
//! │  card payment? ──yes──► CardOperator::authorize (bounded by timeout)   │
//! │      │                     │                                            │
//! │      │            declined / error / timeout ──► REJECTED, done        │
//! │      ▼                                                                  │
//! │  decrement stock ─► mark coupons used ─► change coupon if overpaid     │
//! │      │                                                                  │
//! │  raise customer ranking (capped at 999.99)                             │
//! │      │                                                                  │
//! │      ▼                                                                  │
//! │  APPROVED                                                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `reject`, `dispatch` and `deliver` only move the status.

use serde::Serialize;
use sqlx::SqliteConnection;
use std::sync::Arc;
use tracing::{debug, info, warn};

use storefront_core::coupon::{change_coupon, coupon_overpay, generate_change_code};
use storefront_core::order::{OrderEvent, StatusChange};
use storefront_core::payment::validate_coupon;
use storefront_core::ranking::next_ranking;
use storefront_core::validation::validate_id;
use storefront_core::{CoreError, Coupon, Money, Order};
use storefront_db::{CouponRepository, CustomerRepository, Database, OrderRepository, ProductRepository};

use crate::card_operator::{AuthorizationDecision, AuthorizationRequest, CardChargeLine, CardOperator};
use crate::clock::Clock;
use crate::config::PaymentSettings;
use crate::error::FulfillmentResult;
use crate::ledger::load_product;

/// Result of a settlement step.
#[derive(Debug, Clone, Serialize)]
pub struct Settlement {
    /// The order after the step.
    pub order: Order,
    pub change: StatusChange,
    /// Operator answer, when a card was authorized.
    pub authorization: Option<AuthorizationDecision>,
    /// Change coupon issued on approval.
    pub change_coupon: Option<Coupon>,
    /// Customer ranking after approval, in hundredths of a point.
    pub ranking: Option<i64>,
}

impl Settlement {
    pub fn is_approved(&self) -> bool {
        self.order.status == storefront_core::OrderStatus::Approved
    }
}

/// Applies order status transitions.
#[derive(Clone)]
pub struct SettlementEngine {
    db: Database,
    clock: Arc<dyn Clock>,
    operator: Arc<dyn CardOperator>,
    settings: PaymentSettings,
}

impl std::fmt::Debug for SettlementEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SettlementEngine")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl SettlementEngine {
    pub fn new(
        db: Database,
        clock: Arc<dyn Clock>,
        operator: Arc<dyn CardOperator>,
        settings: PaymentSettings,
    ) -> Self {
        SettlementEngine {
            db,
            clock,
            operator,
            settings,
        }
    }

    /// Approves a PROCESSING order, or rejects it when the card is declined.
    ///
    /// ## Errors
    /// - `OrderNotFound`, `InvalidOrderState`
    /// - `CouponNotFound` / `InvalidCoupon` for a coupon that can no longer pay
    /// - `OutOfStock` when a line's product no longer has the units
    ///
    /// A declined card is not an error: the returned settlement carries the
    /// REJECTED order and the operator's message.
    pub async fn approve(&self, order_id: &str) -> FulfillmentResult<Settlement> {
        validate_id("orderId", order_id)?;

        let now = self.clock.now();
        let mut tx = self.db.begin().await?;

        let order = load_order(&mut tx, order_id).await?;
        let (approved, change) = order.transitioned(OrderEvent::Approve, now)?;

        // =====================================================================
        // Preconditions
        // =====================================================================
        let mut coupon_ids = Vec::new();
        for payment in &order.payments {
            let Some(coupon_id) = &payment.coupon_id else {
                continue;
            };
            let coupon = CouponRepository::new(&mut tx)
                .get_by_id(coupon_id)
                .await?
                .ok_or_else(|| CoreError::CouponNotFound(coupon_id.clone()))?;
            validate_coupon(&coupon, &order.customer_id, now)?;
            coupon_ids.push(coupon.id);
        }

        for line in &order.lines {
            let product = load_product(&mut tx, &line.product_id).await?;
            if product.stock_quantity < line.quantity {
                return Err(CoreError::OutOfStock {
                    product_id: product.id,
                    available: product.stock_quantity,
                    requested: line.quantity,
                }
                .into());
            }
        }

        // =====================================================================
        // Card authorization
        // =====================================================================
        let authorization = if order.has_card_payment() {
            let request = authorization_request(&mut tx, &order).await?;
            let decision = self.authorize(&request).await;

            if !decision.approved {
                let (rejected, change) = order.transitioned(OrderEvent::Reject, now)?;
                OrderRepository::new(&mut tx).save_status(&rejected).await?;
                tx.commit().await?;

                warn!(
                    order_id = %order.id,
                    message = %decision.message,
                    "Card declined, order rejected"
                );

                return Ok(Settlement {
                    order: rejected,
                    change,
                    authorization: Some(decision),
                    change_coupon: None,
                    ranking: None,
                });
            }
            Some(decision)
        } else {
            None
        };

        // =====================================================================
        // Side effects
        // =====================================================================
        for line in &order.lines {
            let decremented = ProductRepository::new(&mut tx)
                .decrement_stock(&line.product_id, line.quantity, now)
                .await?;
            if !decremented {
                let product = load_product(&mut tx, &line.product_id).await?;
                return Err(CoreError::OutOfStock {
                    product_id: product.id,
                    available: product.stock_quantity,
                    requested: line.quantity,
                }
                .into());
            }
        }

        for coupon_id in &coupon_ids {
            if !CouponRepository::new(&mut tx).mark_used(coupon_id, now).await? {
                return Err(CoreError::invalid_coupon(coupon_id, "already used").into());
            }
        }

        let overpay = coupon_overpay(&order);
        let change_coupon = if overpay.is_positive() {
            Some(self.issue_change(&mut tx, &order.customer_id, overpay).await?)
        } else {
            None
        };

        let ranking = self.raise_ranking(&mut tx, &order).await?;

        OrderRepository::new(&mut tx).save_status(&approved).await?;
        tx.commit().await?;

        info!(
            order_id = %approved.id,
            total = %approved.total(),
            coupons_used = coupon_ids.len(),
            change = change_coupon.as_ref().map(|c| c.code.as_str()).unwrap_or("-"),
            ranking,
            "Order approved"
        );

        Ok(Settlement {
            order: approved,
            change,
            authorization,
            change_coupon,
            ranking: Some(ranking),
        })
    }

    /// PROCESSING → REJECTED, with no payment side effects.
    pub async fn reject(&self, order_id: &str) -> FulfillmentResult<Settlement> {
        self.advance(order_id, OrderEvent::Reject).await
    }

    /// APPROVED → IN_TRANSIT.
    pub async fn dispatch(&self, order_id: &str) -> FulfillmentResult<Settlement> {
        self.advance(order_id, OrderEvent::Dispatch).await
    }

    /// IN_TRANSIT → DELIVERED.
    pub async fn deliver(&self, order_id: &str) -> FulfillmentResult<Settlement> {
        self.advance(order_id, OrderEvent::Deliver).await
    }

    /// Loads an order with its lines and payments.
    pub async fn get_order(&self, order_id: &str) -> FulfillmentResult<Order> {
        validate_id("orderId", order_id)?;
        let mut conn = self.db.acquire().await?;
        load_order(&mut conn, order_id).await
    }

    async fn advance(&self, order_id: &str, event: OrderEvent) -> FulfillmentResult<Settlement> {
        validate_id("orderId", order_id)?;

        let now = self.clock.now();
        let mut tx = self.db.begin().await?;

        let order = load_order(&mut tx, order_id).await?;
        let (next, change) = order.transitioned(event, now)?;
        OrderRepository::new(&mut tx).save_status(&next).await?;
        tx.commit().await?;

        info!(order_id = %order_id, from = %change.from, to = %change.to, "Order status changed");

        Ok(Settlement {
            order: next,
            change,
            authorization: None,
            change_coupon: None,
            ranking: None,
        })
    }

    /// Asks the operator, folding errors and timeouts into a decline.
    async fn authorize(&self, request: &AuthorizationRequest) -> AuthorizationDecision {
        let timeout = self.settings.authorization_timeout();
        match tokio::time::timeout(timeout, self.operator.authorize(request)).await {
            Ok(Ok(decision)) => decision,
            Ok(Err(e)) => {
                warn!(?e, customer_id = %request.customer_id, "Card authorization failed");
                AuthorizationDecision::declined(format!("Card operator error: {}", e))
            }
            Err(_) => {
                warn!(
                    customer_id = %request.customer_id,
                    timeout_secs = timeout.as_secs(),
                    "Card authorization timed out"
                );
                AuthorizationDecision::declined("Card authorization timed out")
            }
        }
    }

    async fn issue_change(
        &self,
        conn: &mut SqliteConnection,
        customer_id: &str,
        value: Money,
    ) -> FulfillmentResult<Coupon> {
        let mut coupons = CouponRepository::new(conn);

        let mut code = generate_change_code();
        while coupons.code_exists(&code).await? {
            code = generate_change_code();
        }

        let coupon = change_coupon(
            customer_id,
            value,
            code,
            self.clock.now(),
            self.settings.change_coupon_validity_days,
        )?;
        coupons.insert(&coupon).await?;

        info!(code = %coupon.code, value = %value, customer_id = %customer_id, "Issued change coupon");
        Ok(coupon)
    }

    async fn raise_ranking(
        &self,
        conn: &mut SqliteConnection,
        order: &Order,
    ) -> FulfillmentResult<i64> {
        let mut customers = CustomerRepository::new(conn);
        let customer = customers
            .get_by_id(&order.customer_id)
            .await?
            .ok_or_else(|| CoreError::CustomerNotFound(order.customer_id.clone()))?;

        let ranking = next_ranking(customer.ranking, order);
        customers.update_ranking(&customer.id, ranking).await?;

        debug!(
            customer_id = %customer.id,
            previous = customer.ranking,
            ranking,
            "Customer ranking raised"
        );
        Ok(ranking)
    }
}

async fn load_order(conn: &mut SqliteConnection, order_id: &str) -> FulfillmentResult<Order> {
    OrderRepository::new(conn)
        .get_with_details(order_id)
        .await?
        .ok_or_else(|| CoreError::OrderNotFound(order_id.to_string()).into())
}

async fn authorization_request(
    conn: &mut SqliteConnection,
    order: &Order,
) -> FulfillmentResult<AuthorizationRequest> {
    let mut customers = CustomerRepository::new(conn);
    let mut lines = Vec::new();

    for payment in &order.payments {
        let Some(card_id) = &payment.card_id else {
            continue;
        };
        let card = customers
            .get_card(card_id)
            .await?
            .ok_or_else(|| CoreError::CardNotFound(card_id.clone()))?;
        lines.push(CardChargeLine {
            card_id: card.id,
            card_number: card.card_number,
            amount: payment.amount(),
        });
    }

    Ok(AuthorizationRequest {
        customer_id: order.customer_id.clone(),
        amount: order.card_paid(),
        lines,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocator::PaymentAllocator;
    use crate::assembler::OrderAssembler;
    use crate::card_operator::SimulatedCardOperator;
    use crate::clock::ManualClock;
    use crate::config::CardOperatorSettings;
    use crate::error::FulfillmentError;
    use crate::testing::{
        customer_ranking, load_coupon, load_product as stored_product, seed_address, seed_card,
        seed_coupon, seed_customer, seed_product, seed_reservation, set_customer_ranking, test_db,
    };
    use async_trait::async_trait;
    use chrono::Duration;
    use storefront_core::freight::FlatFreight;
    use storefront_core::payment::PaymentInstruction;
    use storefront_core::ranking::MAX_RANKING;
    use storefront_core::{CouponType, OrderStatus};

    struct Harness {
        db: Database,
        clock: Arc<ManualClock>,
        assembler: OrderAssembler,
    }

    impl Harness {
        async fn new() -> Self {
            let db = test_db().await;
            let clock = Arc::new(ManualClock::starting_now());
            seed_customer(&db, "c1").await;
            seed_address(&db, "a1", "c1", Some("SP"), Some("BRASIL")).await;
            seed_card(&db, "card1", "c1", "4111111111111111").await;
            seed_card(&db, "bad", "c1", "4111111111110000").await;
            let assembler = OrderAssembler::new(
                db.clone(),
                clock.clone(),
                PaymentAllocator::default(),
                Arc::new(FlatFreight(Money::zero())),
            );
            Harness {
                db,
                clock,
                assembler,
            }
        }

        fn engine(&self, operator: Arc<dyn CardOperator>) -> SettlementEngine {
            SettlementEngine::new(
                self.db.clone(),
                self.clock.clone(),
                operator,
                PaymentSettings::default(),
            )
        }

        fn simulated(&self) -> SettlementEngine {
            self.engine(Arc::new(SimulatedCardOperator::new(
                CardOperatorSettings::default(),
            )))
        }

        /// One line of `qty` × `price_cents` of a product with `stock` units.
        async fn order(
            &self,
            stock: i64,
            price_cents: i64,
            qty: i64,
            payments: &[PaymentInstruction],
        ) -> Order {
            seed_product(&self.db, "p1", stock, price_cents).await;
            seed_reservation(&self.db, "c1", "p1", qty, self.clock.now() + Duration::minutes(10))
                .await;
            self.assembler
                .create_order("c1", "a1", payments)
                .await
                .unwrap()
        }
    }

    fn card(id: &str, cents: i64) -> PaymentInstruction {
        PaymentInstruction::Card {
            card_id: id.to_string(),
            amount: Money::from_cents(cents),
        }
    }

    fn coupon(id: &str) -> PaymentInstruction {
        PaymentInstruction::Coupon {
            coupon_id: id.to_string(),
        }
    }

    #[tokio::test]
    async fn test_approve_with_coupon_overpay_issues_change() {
        let h = Harness::new().await;
        seed_coupon(&h.db, "cp120", "c1", CouponType::Exchange, 12000).await;
        let order = h.order(10, 10000, 1, &[coupon("cp120")]).await;

        let settlement = h.simulated().approve(&order.id).await.unwrap();
        assert!(settlement.is_approved());
        assert!(settlement.authorization.is_none());
        assert_eq!(settlement.change.from, OrderStatus::Processing);
        assert_eq!(settlement.change.to, OrderStatus::Approved);

        let change = settlement.change_coupon.unwrap();
        assert_eq!(change.value_cents, 2000);
        assert_eq!(change.coupon_type, CouponType::Exchange);
        assert_eq!(change.customer_id, "c1");
        assert!(change.code.starts_with("TROCO-"));
        assert_eq!(change.expires_at, Some(h.clock.now() + Duration::days(90)));

        let used = load_coupon(&h.db, "cp120").await.unwrap();
        assert!(used.is_used);
        assert_eq!(used.used_at, Some(h.clock.now()));
        assert!(load_coupon(&h.db, &change.id).await.is_some());

        assert_eq!(stored_product(&h.db, "p1").await.stock_quantity, 9);
    }

    #[tokio::test]
    async fn test_approve_with_card_and_coupons() {
        let h = Harness::new().await;
        seed_coupon(&h.db, "cp30", "c1", CouponType::Exchange, 3000).await;
        seed_coupon(&h.db, "cp80", "c1", CouponType::Promotional, 8000).await;
        let order = h
            .order(10, 10000, 1, &[card("card1", 3000), coupon("cp30"), coupon("cp80")])
            .await;

        let coupon_order: Vec<_> = order
            .payments
            .iter()
            .filter_map(|p| p.coupon_id.as_deref())
            .collect();
        assert_eq!(coupon_order, vec!["cp80", "cp30"]);
        // coupons already cover the total, the card is not charged
        assert!(!order.has_card_payment());

        let settlement = h.simulated().approve(&order.id).await.unwrap();
        assert!(settlement.is_approved());
        assert!(settlement.authorization.is_none());
        assert_eq!(settlement.change_coupon.unwrap().value_cents, 1000);
        assert!(load_coupon(&h.db, "cp80").await.unwrap().is_used);
        assert!(load_coupon(&h.db, "cp30").await.unwrap().is_used);
    }

    #[tokio::test]
    async fn test_card_covers_what_coupons_leave() {
        let h = Harness::new().await;
        seed_coupon(&h.db, "cp30", "c1", CouponType::Exchange, 3000).await;
        let order = h.order(10, 10000, 1, &[card("card1", 9000), coupon("cp30")]).await;

        assert_eq!(order.coupon_paid().cents(), 3000);
        assert_eq!(order.card_paid().cents(), 7000);

        let settlement = h.simulated().approve(&order.id).await.unwrap();
        assert!(settlement.is_approved());
        assert!(settlement.authorization.unwrap().approved);
        assert!(settlement.change_coupon.is_none());
    }

    #[tokio::test]
    async fn test_declined_card_rejects_without_side_effects() {
        let h = Harness::new().await;
        seed_coupon(&h.db, "cp20", "c1", CouponType::Exchange, 2000).await;
        let order = h.order(10, 5000, 1, &[coupon("cp20"), card("bad", 3000)]).await;

        let settlement = h.simulated().approve(&order.id).await.unwrap();
        assert_eq!(settlement.order.status, OrderStatus::Rejected);
        let decision = settlement.authorization.unwrap();
        assert!(!decision.approved);
        assert!(decision.message.contains("declined"));

        assert!(!load_coupon(&h.db, "cp20").await.unwrap().is_used);
        assert_eq!(stored_product(&h.db, "p1").await.stock_quantity, 10);
        assert!(settlement.ranking.is_none());
        assert_eq!(customer_ranking(&h.db, "c1").await, 0);

        let stored = h.simulated().get_order(&order.id).await.unwrap();
        assert_eq!(stored.status, OrderStatus::Rejected);
    }

    struct SlowOperator;

    #[async_trait]
    impl CardOperator for SlowOperator {
        async fn authorize(
            &self,
            _request: &AuthorizationRequest,
        ) -> FulfillmentResult<AuthorizationDecision> {
            tokio::time::sleep(std::time::Duration::from_secs(60)).await;
            Ok(AuthorizationDecision::approved("too late"))
        }
    }

    struct BrokenOperator;

    #[async_trait]
    impl CardOperator for BrokenOperator {
        async fn authorize(
            &self,
            _request: &AuthorizationRequest,
        ) -> FulfillmentResult<AuthorizationDecision> {
            Err(FulfillmentError::CardOperator("connection refused".into()))
        }
    }

    #[tokio::test]
    async fn test_timeout_and_operator_error_reject() {
        let h = Harness::new().await;
        let order = h.order(10, 5000, 1, &[card("card1", 5000)]).await;

        let engine = SettlementEngine::new(
            h.db.clone(),
            h.clock.clone(),
            Arc::new(SlowOperator),
            PaymentSettings {
                authorization_timeout_secs: 1,
                ..PaymentSettings::default()
            },
        );
        let settlement = engine.approve(&order.id).await.unwrap();
        assert_eq!(settlement.order.status, OrderStatus::Rejected);
        assert_eq!(
            settlement.authorization.unwrap().message,
            "Card authorization timed out"
        );

        // a second order through an operator that errors out
        seed_reservation(&h.db, "c1", "p1", 1, h.clock.now() + Duration::minutes(10)).await;
        let second = h
            .assembler
            .create_order("c1", "a1", &[card("card1", 5000)])
            .await
            .unwrap();
        let settlement = h.engine(Arc::new(BrokenOperator)).approve(&second.id).await.unwrap();
        assert_eq!(settlement.order.status, OrderStatus::Rejected);
        assert!(settlement
            .authorization
            .unwrap()
            .message
            .contains("connection refused"));
    }

    #[tokio::test]
    async fn test_forward_only_transitions() {
        let h = Harness::new().await;
        let order = h.order(10, 5000, 1, &[card("card1", 5000)]).await;
        let engine = h.simulated();

        let err = engine.dispatch(&order.id).await.unwrap_err();
        assert!(matches!(
            err.as_core(),
            Some(CoreError::InvalidOrderState {
                current: OrderStatus::Processing,
                ..
            })
        ));

        engine.approve(&order.id).await.unwrap();
        let err = engine.approve(&order.id).await.unwrap_err();
        assert!(matches!(err.as_core(), Some(CoreError::InvalidOrderState { .. })));

        h.clock.advance(Duration::hours(1));
        let dispatched = engine.dispatch(&order.id).await.unwrap();
        assert_eq!(dispatched.order.status, OrderStatus::InTransit);
        assert_eq!(dispatched.order.dispatched_at, Some(h.clock.now()));

        h.clock.advance(Duration::days(2));
        let delivered = engine.deliver(&order.id).await.unwrap();
        assert_eq!(delivered.order.status, OrderStatus::Delivered);
        assert_eq!(delivered.order.delivered_at, Some(h.clock.now()));

        let err = engine.reject(&order.id).await.unwrap_err();
        assert!(matches!(err.as_core(), Some(CoreError::InvalidOrderState { .. })));
    }

    #[tokio::test]
    async fn test_reject_has_no_side_effects() {
        let h = Harness::new().await;
        seed_coupon(&h.db, "cp60", "c1", CouponType::Exchange, 6000).await;
        let order = h.order(10, 5000, 1, &[coupon("cp60")]).await;

        let settlement = h.simulated().reject(&order.id).await.unwrap();
        assert_eq!(settlement.order.status, OrderStatus::Rejected);
        assert!(settlement.change_coupon.is_none());
        assert!(!load_coupon(&h.db, "cp60").await.unwrap().is_used);
    }

    #[tokio::test]
    async fn test_approve_revalidates_coupons_and_stock() {
        let h = Harness::new().await;
        seed_coupon(&h.db, "cp60", "c1", CouponType::Exchange, 6000).await;
        let order = h.order(1, 5000, 1, &[coupon("cp60")]).await;

        // coupon spent elsewhere in the meantime
        {
            let mut conn = h.db.acquire().await.unwrap();
            CouponRepository::new(&mut conn)
                .mark_used("cp60", h.clock.now())
                .await
                .unwrap();
        }
        let err = h.simulated().approve(&order.id).await.unwrap_err();
        assert!(matches!(err.as_core(), Some(CoreError::InvalidCoupon { .. })));

        let unknown = h.simulated().approve("ghost").await.unwrap_err();
        assert!(matches!(unknown.as_core(), Some(CoreError::OrderNotFound(_))));
    }

    #[tokio::test]
    async fn test_approve_fails_when_stock_is_gone() {
        let h = Harness::new().await;
        let order = h.order(2, 5000, 2, &[card("card1", 10000)]).await;

        {
            let mut conn = h.db.acquire().await.unwrap();
            ProductRepository::new(&mut conn)
                .decrement_stock("p1", 1, h.clock.now())
                .await
                .unwrap();
        }

        let err = h.simulated().approve(&order.id).await.unwrap_err();
        assert!(matches!(
            err.as_core(),
            Some(CoreError::OutOfStock { available: 1, requested: 2, .. })
        ));
        let stored = h.simulated().get_order(&order.id).await.unwrap();
        assert_eq!(stored.status, OrderStatus::Processing);
    }

    #[tokio::test]
    async fn test_approve_raises_customer_ranking() {
        let h = Harness::new().await;
        let order = h.order(10, 5000, 2, &[card("card1", 10000)]).await;

        let settlement = h.simulated().approve(&order.id).await.unwrap();
        // 100.00 → 1.00, 2 units → 0.20, one card → 0.05
        assert_eq!(settlement.ranking, Some(125));
        assert_eq!(customer_ranking(&h.db, "c1").await, 125);
    }

    #[tokio::test]
    async fn test_customer_ranking_is_capped() {
        let h = Harness::new().await;
        set_customer_ranking(&h.db, "c1", MAX_RANKING - 50).await;
        let order = h.order(10, 5000, 2, &[card("card1", 10000)]).await;

        let settlement = h.simulated().approve(&order.id).await.unwrap();
        assert_eq!(settlement.ranking, Some(MAX_RANKING));
        assert_eq!(customer_ranking(&h.db, "c1").await, MAX_RANKING);
    }

    #[tokio::test]
    async fn test_unrepresentable_change_expiry_rolls_back() {
        let h = Harness::new().await;
        seed_coupon(&h.db, "cp120", "c1", CouponType::Exchange, 12000).await;
        let order = h.order(10, 10000, 1, &[coupon("cp120")]).await;

        let engine = SettlementEngine::new(
            h.db.clone(),
            h.clock.clone(),
            Arc::new(SimulatedCardOperator::new(CardOperatorSettings::default())),
            PaymentSettings {
                change_coupon_validity_days: i64::MAX,
                ..PaymentSettings::default()
            },
        );
        let err = engine.approve(&order.id).await.unwrap_err();
        assert!(matches!(
            err.as_core(),
            Some(CoreError::InvalidCouponValidity { days: i64::MAX })
        ));

        assert!(!load_coupon(&h.db, "cp120").await.unwrap().is_used);
        assert_eq!(stored_product(&h.db, "p1").await.stock_quantity, 10);
        assert_eq!(customer_ranking(&h.db, "c1").await, 0);
        let stored = engine.get_order(&order.id).await.unwrap();
        assert_eq!(stored.status, OrderStatus::Processing);
    }
}
