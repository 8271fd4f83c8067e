//! # Fulfillment Service
//!
//! Single entry point that owns the components and routes [`Command`]s.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Command                         Component                              │
//! │  ─────────────────────────────   ─────────────────────────────────────  │
//! │  ReserveItem, UpdateReservation  ReservationManager (ttl from config)   │
//! │  RemoveReservation, ClearCart    ReservationManager                     │
//! │  CreateOrder                     OrderAssembler ─► PaymentAllocator     │
//! │  Approve/Reject/Dispatch/Deliver SettlementEngine ─► CardOperator       │
//! │  ReleaseExpired                  ExpirationSweeper::sweep_once (if on)  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;
use tracing::{debug, warn};

use storefront_core::freight::FreightRule;
use storefront_core::payment::instructions_from;
use storefront_core::{Cart, Order};
use storefront_db::Database;

use crate::allocator::PaymentAllocator;
use crate::assembler::OrderAssembler;
use crate::card_operator::{CardOperator, SimulatedCardOperator};
use crate::clock::{Clock, SystemClock};
use crate::commands::{Command, CommandOutcome};
use crate::config::FulfillmentConfig;
use crate::error::FulfillmentResult;
use crate::reservation::ReservationManager;
use crate::settlement::SettlementEngine;
use crate::sweeper::{ExpirationSweeper, SweeperHandle};

/// Reservation and settlement operations behind one command interface.
#[derive(Debug, Clone)]
pub struct FulfillmentService {
    db: Database,
    clock: Arc<dyn Clock>,
    config: FulfillmentConfig,
    reservations: ReservationManager,
    assembler: OrderAssembler,
    settlement: SettlementEngine,
}

impl FulfillmentService {
    /// Wires every component from `config`.
    pub fn new(
        db: Database,
        config: FulfillmentConfig,
        clock: Arc<dyn Clock>,
        operator: Arc<dyn CardOperator>,
    ) -> Self {
        let freight: Arc<dyn FreightRule> = Arc::new(config.freight.clone());
        Self::with_freight(db, config, clock, operator, freight)
    }

    /// Like [`FulfillmentService::new`] with a custom freight rule.
    pub fn with_freight(
        db: Database,
        config: FulfillmentConfig,
        clock: Arc<dyn Clock>,
        operator: Arc<dyn CardOperator>,
        freight: Arc<dyn FreightRule>,
    ) -> Self {
        let reservations = ReservationManager::new(db.clone(), clock.clone());
        let allocator = PaymentAllocator::new(config.payment.allocation_policy());
        let assembler = OrderAssembler::new(db.clone(), clock.clone(), allocator, freight);
        let settlement = SettlementEngine::new(
            db.clone(),
            clock.clone(),
            operator,
            config.payment.clone(),
        );

        FulfillmentService {
            db,
            clock,
            config,
            reservations,
            assembler,
            settlement,
        }
    }

    /// System clock and the simulated card operator.
    pub fn from_config(db: Database, config: FulfillmentConfig) -> Self {
        let operator = Arc::new(SimulatedCardOperator::new(config.card_operator.clone()));
        Self::new(db, config, Arc::new(SystemClock), operator)
    }

    pub fn config(&self) -> &FulfillmentConfig {
        &self.config
    }

    /// Builds a sweeper over the same database and clock.
    pub fn sweeper(&self) -> (ExpirationSweeper, SweeperHandle) {
        ExpirationSweeper::new(
            self.db.clone(),
            self.clock.clone(),
            self.config.sweeper.clone(),
        )
    }

    /// Executes one command.
    pub async fn execute(&self, command: Command) -> FulfillmentResult<CommandOutcome> {
        let name = command.name();
        debug!(command = name, "Executing command");

        let result = self.dispatch(command).await;
        if let Err(e) = &result {
            warn!(command = name, kind = ?e.kind(), error = %e, "Command failed");
        }
        result
    }

    /// Parses a JSON command and executes it.
    pub async fn execute_json(&self, json: &str) -> FulfillmentResult<CommandOutcome> {
        let command: Command = serde_json::from_str(json)?;
        self.execute(command).await
    }

    async fn dispatch(&self, command: Command) -> FulfillmentResult<CommandOutcome> {
        let ttl = self.config.reservation.ttl_minutes;

        let outcome = match command {
            Command::ReserveItem {
                customer_id,
                product_id,
                quantity,
            } => CommandOutcome::Cart(
                self.reservations
                    .reserve(&customer_id, &product_id, quantity, ttl)
                    .await?,
            ),
            Command::UpdateReservation {
                customer_id,
                product_id,
                quantity,
            } => CommandOutcome::Cart(
                self.reservations
                    .update_quantity(&customer_id, &product_id, quantity, ttl)
                    .await?,
            ),
            Command::RemoveReservation {
                customer_id,
                product_id,
            } => CommandOutcome::Cart(self.reservations.remove(&customer_id, &product_id).await?),
            Command::ClearCart { customer_id } => {
                CommandOutcome::Cart(self.reservations.clear(&customer_id).await?)
            }
            Command::CreateOrder {
                customer_id,
                delivery_address_id,
                payments,
            } => {
                let instructions = instructions_from(payments)?;
                CommandOutcome::Order(
                    self.assembler
                        .create_order(&customer_id, &delivery_address_id, &instructions)
                        .await?,
                )
            }
            Command::ApproveOrder { order_id } => {
                CommandOutcome::Settlement(self.settlement.approve(&order_id).await?)
            }
            Command::RejectOrder { order_id } => {
                CommandOutcome::Settlement(self.settlement.reject(&order_id).await?)
            }
            Command::DispatchOrder { order_id } => {
                CommandOutcome::Settlement(self.settlement.dispatch(&order_id).await?)
            }
            Command::DeliverOrder { order_id } => {
                CommandOutcome::Settlement(self.settlement.deliver(&order_id).await?)
            }
            Command::ReleaseExpired => {
                if !self.config.sweeper.enabled {
                    debug!("Expiration sweeper disabled, nothing released");
                    return Ok(CommandOutcome::Released(0));
                }
                let (sweeper, _handle) = self.sweeper();
                CommandOutcome::Released(sweeper.sweep_once().await?)
            }
        };

        Ok(outcome)
    }

    pub async fn view_cart(&self, customer_id: &str) -> FulfillmentResult<Option<Cart>> {
        self.reservations.view_cart(customer_id).await
    }

    pub async fn get_order(&self, order_id: &str) -> FulfillmentResult<Order> {
        self.settlement.get_order(order_id).await
    }

    pub async fn available_stock(&self, product_id: &str) -> FulfillmentResult<i64> {
        self.reservations.available_stock(product_id).await
    }
}
