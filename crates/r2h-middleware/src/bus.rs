//! Telemetry bus of a localisation node.
//!
//! Groups the three output lanes the node publishes on every tick:
//!
//! | Topic | Payload | Channel |
//! |---|---|---|
//! | [`Topic::LeaderPosition`] | [`Position2D`] in the base-footprint frame | [`StampedPublisher`] |
//! | [`Topic::Status`] | [`FsmState`] | [`LatchedPublisher`] |
//! | [`Topic::Diagnostics`] | [`DiagnosticMessage`] | [`DiagnosticPublisher`] |
//!
//! The bus hands out `Arc` handles, so the publishing side (the tick
//! orchestrator) and any number of consumers share the same channels.

use std::sync::Arc;
use std::time::Duration;

use r2h_types::{FsmState, LocalisationError, Position2D, Stamped};
use tokio::sync::{broadcast, watch};
use tracing::debug;

use crate::diagnostics::{DEFAULT_DIAGNOSTIC_PERIOD, DiagnosticMessage, DiagnosticPublisher};
use crate::publisher::{LatchedPublisher, StampedPublisher};

/// Default per-subscriber buffer of the broadcast lanes.
const DEFAULT_CAPACITY: usize = 64;

/// The lanes of the telemetry bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    /// Filtered leader position, published only while the filter runs.
    LeaderPosition,
    /// Filter lifecycle state, published every tick.
    Status,
    /// Filter health, handed over every tick and forwarded at 1 Hz.
    Diagnostics,
}

impl Topic {
    pub const ALL: [Topic; 3] = [Topic::LeaderPosition, Topic::Status, Topic::Diagnostics];

    /// Topic name relative to the node namespace.
    pub fn name(self) -> &'static str {
        match self {
            Topic::LeaderPosition => "filtered_leader_position",
            Topic::Status => "status",
            Topic::Diagnostics => "diagnostics",
        }
    }
}

/// Settings needed to build a [`TelemetryBus`].
#[derive(Debug, Clone)]
pub struct BusConfig {
    /// Fully qualified node name, used as diagnostics hardware id.
    pub node_name: String,
    /// Frame attached to every leader position.
    pub base_footprint_frame_id: String,
    /// Forwarding period of the diagnostics lane.
    pub diagnostic_period: Duration,
    /// Per-subscriber buffer of the broadcast lanes.
    pub capacity: usize,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            node_name: "/robot_to_human_localisation".to_string(),
            base_footprint_frame_id: "base_link".to_string(),
            diagnostic_period: DEFAULT_DIAGNOSTIC_PERIOD,
            capacity: DEFAULT_CAPACITY,
        }
    }
}

/// The three output channels of the node.
#[derive(Clone)]
pub struct TelemetryBus {
    leader_position: Arc<StampedPublisher<Position2D>>,
    status: Arc<LatchedPublisher<FsmState>>,
    diagnostics: Arc<DiagnosticPublisher>,
}

impl TelemetryBus {
    /// Build every channel.
    ///
    /// # Errors
    ///
    /// Returns [`LocalisationError::Config`] if the frame id is empty or any
    /// channel cannot be created.
    pub fn new(config: &BusConfig) -> Result<Self, LocalisationError> {
        if config.base_footprint_frame_id.trim().is_empty() {
            return Err(LocalisationError::Config(
                "base_footprint_frame_id must not be empty".to_string(),
            ));
        }
        let leader_position = StampedPublisher::new(
            Topic::LeaderPosition.name(),
            config.base_footprint_frame_id.clone(),
            config.capacity,
        )?;
        let status = LatchedPublisher::new(Topic::Status.name());
        let diagnostics = DiagnosticPublisher::new(
            Topic::Diagnostics.name(),
            config.node_name.clone(),
            config.diagnostic_period,
            config.capacity,
        )?;
        debug!(
            frame_id = %config.base_footprint_frame_id,
            node = %config.node_name,
            "telemetry bus ready"
        );
        Ok(Self {
            leader_position: Arc::new(leader_position),
            status: Arc::new(status),
            diagnostics: Arc::new(diagnostics),
        })
    }

    // -----------------------------------------------------------------------
    // Publishing side
    // -----------------------------------------------------------------------

    pub fn leader_position_publisher(&self) -> Arc<StampedPublisher<Position2D>> {
        Arc::clone(&self.leader_position)
    }

    pub fn status_publisher(&self) -> Arc<LatchedPublisher<FsmState>> {
        Arc::clone(&self.status)
    }

    pub fn diagnostic_publisher(&self) -> Arc<DiagnosticPublisher> {
        Arc::clone(&self.diagnostics)
    }

    // -----------------------------------------------------------------------
    // Consuming side
    // -----------------------------------------------------------------------

    pub fn subscribe_leader_position(&self) -> broadcast::Receiver<Stamped<Position2D>> {
        self.leader_position.subscribe()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<Option<Stamped<FsmState>>> {
        self.status.subscribe()
    }

    pub fn subscribe_diagnostics(&self) -> broadcast::Receiver<Stamped<DiagnosticMessage>> {
        self.diagnostics.subscribe()
    }
}
