//! [`TickOrchestrator`] – the state-gated publish cycle.
//!
//! Each tick runs the same five steps, in this order:
//!
//! 1. **Stamp** – read the [`Clock`] once.  Every query and publish of the
//!    tick uses that single stamp.
//! 2. **Sample** – read the filter's [`FsmState`].
//! 3. **Gate** – if [`should_publish_position`] accepts the state, query the
//!    filter results as of the stamp, derive the leader [`Position2D`] and
//!    publish it.  Otherwise the results query is skipped entirely.
//! 4. **Status** – publish the sampled state.
//! 5. **Diagnostics** – query the diagnostic report as of the stamp and
//!    publish it.
//!
//! Steps 4 and 5 run on every tick whatever the state.  A failing query or
//! publish ends the tick with that error; steps already done stay done.
//!
//! The orchestrator keeps nothing between ticks.

use std::sync::Arc;

use r2h_filter::LocalisationFilter;
use r2h_middleware::{Publisher, TelemetryBus};
use r2h_types::{DiagnosticReport, FsmState, LocalisationError, Position2D, Timestamp};
use tracing::debug;

use crate::clock::{Clock, SystemClock};
use crate::gate::should_publish_position;

/// The three sinks a tick publishes to.
#[derive(Clone)]
pub struct OutputChannels {
    pub leader_position: Arc<dyn Publisher<Position2D>>,
    pub status: Arc<dyn Publisher<FsmState>>,
    pub diagnostics: Arc<dyn Publisher<DiagnosticReport>>,
}

impl OutputChannels {
    /// Publish to the lanes of `bus`.
    pub fn from_bus(bus: &TelemetryBus) -> Self {
        Self {
            leader_position: bus.leader_position_publisher(),
            status: bus.status_publisher(),
            diagnostics: bus.diagnostic_publisher(),
        }
    }
}

/// What a successful tick did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickReport {
    pub stamp: Timestamp,
    pub state: FsmState,
    /// The published leader position, `None` when the gate was closed.
    pub leader_position: Option<Position2D>,
}

/// Runs one publish cycle per call to [`tick`][Self::tick].
pub struct TickOrchestrator {
    filter: Box<dyn LocalisationFilter>,
    channels: OutputChannels,
    clock: Arc<dyn Clock>,
}

impl TickOrchestrator {
    /// Build an orchestrator reading the wall clock.
    pub fn new(filter: Box<dyn LocalisationFilter>, channels: OutputChannels) -> Self {
        Self {
            filter,
            channels,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the time source.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Execute one tick.
    ///
    /// # Errors
    ///
    /// Returns the first [`LocalisationError`] raised by a filter query or a
    /// channel.  The remaining steps of the tick are not run.
    pub fn tick(&self) -> Result<TickReport, LocalisationError> {
        let stamp = self.clock.now();
        let state = self.filter.fsm_state()?;

        let leader_position = if should_publish_position(state) {
            let results = self.filter.results(stamp)?;
            let position = results.to_leader_position();
            debug!(x = position.x, y = position.y, "leader position");
            self.channels.leader_position.publish(stamp, position)?;
            Some(position)
        } else {
            None
        };

        self.channels.status.publish(stamp, state)?;
        self.publish_diagnostics(stamp)?;

        Ok(TickReport {
            stamp,
            state,
            leader_position,
        })
    }

    fn publish_diagnostics(&self, stamp: Timestamp) -> Result<(), LocalisationError> {
        let report = self.filter.diagnostic_report(stamp)?;
        self.channels.diagnostics.publish(stamp, report)
    }
}
