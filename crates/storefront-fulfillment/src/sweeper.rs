//! # Expiration Sweeper
//!
//! Background task that deletes lapsed holds.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Sweeper Loop                                     │
//! │                                                                         │
//! │   every period_secs ──► enabled? ──no──► skip                          │
//! │                            │                                            │
//! │                           yes                                           │
//! │                            ▼                                            │
//! │        DELETE reservations WHERE is_blocked AND expires_at < now        │
//! │                            │                                            │
//! │                  error? ──► logged, next tick runs as usual            │
//! │                                                                         │
//! │   shutdown() ──► loop exits                                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A tick that finds nothing deletes nothing. A failed or missed tick leaves
//! the rows for the next one. Expired holds already stopped counting against
//! stock; deleting them only tidies the carts.

use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use storefront_db::{CartRepository, Database};

use crate::clock::Clock;
use crate::config::SweeperSettings;
use crate::error::{FulfillmentError, FulfillmentResult};

// =============================================================================
// Expiration Sweeper
// =============================================================================

/// Periodically deletes expired reservations.
pub struct ExpirationSweeper {
    db: Database,
    clock: Arc<dyn Clock>,
    settings: SweeperSettings,

    /// Shutdown receiver.
    shutdown_rx: mpsc::Receiver<()>,
}

/// Handle for stopping a running sweeper.
#[derive(Clone)]
pub struct SweeperHandle {
    shutdown_tx: mpsc::Sender<()>,
}

impl SweeperHandle {
    /// Stops the sweeper loop after its current tick.
    pub async fn shutdown(&self) -> FulfillmentResult<()> {
        self.shutdown_tx
            .send(())
            .await
            .map_err(|_| FulfillmentError::ChannelError("Sweeper shutdown channel closed".into()))
    }
}

impl ExpirationSweeper {
    /// Creates a sweeper and the handle that stops it.
    pub fn new(
        db: Database,
        clock: Arc<dyn Clock>,
        settings: SweeperSettings,
    ) -> (Self, SweeperHandle) {
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        let sweeper = ExpirationSweeper {
            db,
            clock,
            settings,
            shutdown_rx,
        };

        (sweeper, SweeperHandle { shutdown_tx })
    }

    /// Runs the sweeper loop until shut down.
    ///
    /// This should be spawned as a background task.
    pub async fn run(mut self) {
        info!(
            period_secs = self.settings.period_secs,
            enabled = self.settings.enabled,
            "Expiration sweeper starting"
        );

        let mut interval = tokio::time::interval(self.settings.period());
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.tick().await;
                }

                _ = self.shutdown_rx.recv() => {
                    info!("Expiration sweeper shutting down");
                    break;
                }
            }
        }

        info!("Expiration sweeper stopped");
    }

    /// One scheduled run. Never fails; returns how many holds were deleted.
    pub async fn tick(&self) -> u64 {
        if !self.settings.enabled {
            debug!("Expiration sweeper disabled, skipping tick");
            return 0;
        }

        match self.sweep_once().await {
            Ok(0) => {
                debug!("No expired reservations");
                0
            }
            Ok(released) => {
                info!(released, "Released expired reservations");
                released
            }
            Err(e) => {
                error!(?e, "Expiration sweep failed");
                0
            }
        }
    }

    /// Deletes every blocked reservation whose window ended before now.
    pub async fn sweep_once(&self) -> FulfillmentResult<u64> {
        let now = self.clock.now();
        let mut tx = self.db.begin().await?;
        let released = CartRepository::new(&mut tx).delete_expired(now).await?;
        tx.commit().await?;
        Ok(released)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::testing::{seed_product, seed_reservation, test_db};
    use chrono::Duration;

    fn settings(enabled: bool) -> SweeperSettings {
        SweeperSettings {
            enabled,
            period_secs: 60,
        }
    }

    #[tokio::test]
    async fn test_sweep_removes_exact_count_then_nothing() {
        let db = test_db().await;
        let clock = Arc::new(ManualClock::starting_now());
        let now = clock.now();

        seed_product(&db, "p1", 10, 1000).await;
        seed_product(&db, "p2", 10, 1000).await;
        seed_reservation(&db, "c1", "p1", 1, now - Duration::minutes(1)).await;
        seed_reservation(&db, "c2", "p1", 2, now - Duration::seconds(1)).await;
        seed_reservation(&db, "c3", "p2", 3, now + Duration::minutes(5)).await;

        let (sweeper, _handle) = ExpirationSweeper::new(db.clone(), clock.clone(), settings(true));
        assert_eq!(sweeper.sweep_once().await.unwrap(), 2);
        assert_eq!(sweeper.sweep_once().await.unwrap(), 0);

        clock.advance(Duration::minutes(6));
        assert_eq!(sweeper.tick().await, 1);
    }

    #[tokio::test]
    async fn test_disabled_tick_leaves_rows() {
        let db = test_db().await;
        let clock = Arc::new(ManualClock::starting_now());
        seed_product(&db, "p1", 10, 1000).await;
        seed_reservation(&db, "c1", "p1", 1, clock.now() - Duration::minutes(1)).await;

        let (disabled, _h) = ExpirationSweeper::new(db.clone(), clock.clone(), settings(false));
        assert_eq!(disabled.tick().await, 0);

        let (enabled, _h) = ExpirationSweeper::new(db, clock, settings(true));
        assert_eq!(enabled.sweep_once().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_tick_swallows_failures() {
        let db = test_db().await;
        let (sweeper, _handle) = ExpirationSweeper::new(
            db.clone(),
            Arc::new(ManualClock::starting_now()),
            settings(true),
        );

        db.close().await;
        assert!(sweeper.sweep_once().await.is_err());
        assert_eq!(sweeper.tick().await, 0);
    }

    #[tokio::test]
    async fn test_run_until_shutdown() {
        let db = test_db().await;
        let clock = Arc::new(ManualClock::starting_now());
        seed_product(&db, "p1", 10, 1000).await;
        seed_reservation(&db, "c1", "p1", 1, clock.now() - Duration::minutes(1)).await;

        let (sweeper, handle) = ExpirationSweeper::new(
            db.clone(),
            clock.clone(),
            SweeperSettings {
                enabled: true,
                period_secs: 1,
            },
        );
        let task = tokio::spawn(sweeper.run());

        // the first interval tick fires immediately
        tokio::time::sleep(std::time::Duration::from_millis(200)).await;
        handle.shutdown().await.unwrap();
        task.await.unwrap();

        let (check, _h) = ExpirationSweeper::new(db, clock, settings(true));
        assert_eq!(check.sweep_once().await.unwrap(), 0);
    }
}
