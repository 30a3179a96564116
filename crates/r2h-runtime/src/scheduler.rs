//! [`Scheduler`] – fixed-period, one-at-a-time tick driver.
//!
//! Fires a handler every `period` until the shutdown signal flips to `true`.
//! The handler runs inline on the scheduler task, so two ticks never
//! overlap.  When a tick overruns the period the missed boundaries are
//! skipped rather than replayed: the next tick starts at the next boundary
//! after the slow one returns.
//!
//! A handler error is logged and the schedule carries on.
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use r2h_runtime::scheduler::Scheduler;
//! use r2h_types::LocalisationError;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let (tx, rx) = tokio::sync::watch::channel(false);
//! let scheduler = Scheduler::new(Duration::from_millis(1)).unwrap();
//! let mut count = 0;
//! let ticks = scheduler
//!     .run(
//!         || {
//!             count += 1;
//!             if count == 3 {
//!                 let _ = tx.send(true);
//!             }
//!             Ok::<_, LocalisationError>(())
//!         },
//!         rx,
//!     )
//!     .await;
//! assert_eq!(ticks, 3);
//! # }
//! ```

use std::time::Duration;

use r2h_types::LocalisationError;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

/// Periodic tick driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scheduler {
    period: Duration,
}

impl Scheduler {
    /// Create a scheduler firing every `period`.
    ///
    /// # Errors
    ///
    /// Returns [`LocalisationError::Config`] for a zero period.
    pub fn new(period: Duration) -> Result<Self, LocalisationError> {
        if period.is_zero() {
            return Err(LocalisationError::Config(
                "tick period must be greater than zero".to_string(),
            ));
        }
        Ok(Self { period })
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Drive `handler` until `shutdown` reads `true` or its sender is dropped.
    ///
    /// The first tick fires immediately.  Shutdown is checked before every
    /// tick; a tick already running is allowed to finish.  Returns the number
    /// of ticks executed.
    pub async fn run<H, T>(&self, mut handler: H, mut shutdown: watch::Receiver<bool>) -> u64
    where
        H: FnMut() -> Result<T, LocalisationError>,
    {
        let mut ticker = tokio::time::interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut ticks: u64 = 0;

        loop {
            if *shutdown.borrow_and_update() {
                break;
            }
            tokio::select! {
                biased;
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        debug!("shutdown sender dropped; stopping scheduler");
                        break;
                    }
                    continue;
                }
                _ = ticker.tick() => {}
            }

            ticks += 1;
            if let Err(e) = handler() {
                warn!(tick = ticks, error = %e, "tick failed");
            }
        }

        debug!(ticks, "scheduler stopped");
        ticks
    }
}
