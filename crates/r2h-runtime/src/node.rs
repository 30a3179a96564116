//! [`LocalisationNode`] – assembles the robot-to-human localisation node.
//!
//! Construction validates the configuration, builds the telemetry bus, the
//! tick orchestrator and the scheduler.  Any failure aborts construction, so
//! a node that exists always has every collaborator in place.
//!
//! # Example
//!
//! ```rust,no_run
//! use r2h_filter::{SimFilter, SimFilterConfig};
//! use r2h_runtime::node::{LocalisationNode, NodeConfig};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let filter = SimFilter::new(SimFilterConfig::default());
//! let node = LocalisationNode::new(NodeConfig::default(), Box::new(filter))
//!     .expect("valid configuration");
//! let (_stop, shutdown) = tokio::sync::watch::channel(false);
//! node.spin(shutdown).await;
//! # }
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use r2h_filter::LocalisationFilter;
use r2h_middleware::{BusConfig, TelemetryBus};
use r2h_types::LocalisationError;
use tokio::sync::watch;
use tracing::info;

use crate::clock::Clock;
use crate::orchestrator::{OutputChannels, TickOrchestrator, TickReport};
use crate::scheduler::Scheduler;

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Default tick frequency (Hz).
pub const DEFAULT_PUBLISH_RATE: f64 = 10.0;

/// Configuration bundle for [`LocalisationNode`].
#[derive(Debug, Clone, PartialEq)]
pub struct NodeConfig {
    /// Node name, e.g. `"robot_to_human_localisation"`.
    pub node_name: String,
    /// Namespace the node lives in; empty for the root namespace.
    pub namespace: String,
    /// Tick frequency in Hz.  Must be finite and strictly positive.
    pub publish_rate: f64,
    /// Frame attached to every published leader position.
    pub base_footprint_frame_id: String,
    /// Forwarding period of the diagnostics channel.
    pub diagnostic_period: Duration,
    /// Per-subscriber buffer of the broadcast channels.
    pub channel_capacity: usize,
    /// Verbose logging.
    pub debug: bool,
    /// Directory receiving a log file, if any.
    pub log_directory: Option<PathBuf>,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            node_name: "robot_to_human_localisation".to_string(),
            namespace: String::new(),
            publish_rate: DEFAULT_PUBLISH_RATE,
            base_footprint_frame_id: "base_link".to_string(),
            diagnostic_period: Duration::from_secs(1),
            channel_capacity: 64,
            debug: false,
            log_directory: None,
        }
    }
}

impl NodeConfig {
    /// Tick period derived from [`publish_rate`][Self::publish_rate].
    ///
    /// # Errors
    ///
    /// Returns [`LocalisationError::Config`] when the rate is zero, negative,
    /// NaN, infinite, or so small that the period overflows.
    pub fn tick_period(&self) -> Result<Duration, LocalisationError> {
        let rate = self.publish_rate;
        if !rate.is_finite() || rate <= 0.0 {
            return Err(LocalisationError::Config(format!(
                "publish_rate must be a positive number of Hz, got {rate}"
            )));
        }
        Duration::try_from_secs_f64(1.0 / rate).map_err(|e| {
            LocalisationError::Config(format!("publish_rate {rate} gives no usable period: {e}"))
        })
    }

    /// `/<namespace>/<node_name>` with empty segments removed.
    pub fn fully_qualified_name(&self) -> String {
        let ns = self.namespace.trim_matches('/');
        if ns.is_empty() {
            format!("/{}", self.node_name)
        } else {
            format!("/{}/{}", ns, self.node_name)
        }
    }

    /// Check every field needed to start the node.
    ///
    /// # Errors
    ///
    /// Returns [`LocalisationError::Config`] describing the first invalid
    /// field.
    pub fn validate(&self) -> Result<(), LocalisationError> {
        if self.node_name.trim().is_empty() {
            return Err(LocalisationError::Config(
                "node_name must not be empty".to_string(),
            ));
        }
        self.tick_period()?;
        if self.diagnostic_period.is_zero() {
            return Err(LocalisationError::Config(
                "diagnostic_period must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    fn bus_config(&self) -> BusConfig {
        BusConfig {
            node_name: self.fully_qualified_name(),
            base_footprint_frame_id: self.base_footprint_frame_id.clone(),
            diagnostic_period: self.diagnostic_period,
            capacity: self.channel_capacity,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// LocalisationNode
// ─────────────────────────────────────────────────────────────────────────────

/// A fully wired localisation node.
pub struct LocalisationNode {
    config: NodeConfig,
    bus: TelemetryBus,
    orchestrator: TickOrchestrator,
    scheduler: Scheduler,
}

impl LocalisationNode {
    /// Build the node around `filter`.
    ///
    /// # Errors
    ///
    /// Returns [`LocalisationError::Config`] if the configuration is invalid
    /// or an output channel cannot be created.  No scheduler exists in that
    /// case.
    pub fn new(
        config: NodeConfig,
        filter: Box<dyn LocalisationFilter>,
    ) -> Result<Self, LocalisationError> {
        config.validate()?;
        let period = config.tick_period()?;
        let bus = TelemetryBus::new(&config.bus_config())?;
        let orchestrator = TickOrchestrator::new(filter, OutputChannels::from_bus(&bus));
        let scheduler = Scheduler::new(period)?;

        info!(
            node = %config.fully_qualified_name(),
            publish_rate = config.publish_rate,
            frame_id = %config.base_footprint_frame_id,
            "localisation node constructed"
        );

        Ok(Self {
            config,
            bus,
            orchestrator,
            scheduler,
        })
    }

    /// Replace the wall clock used to stamp ticks.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.orchestrator = self.orchestrator.with_clock(clock);
        self
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    /// Output channels, for consumers to subscribe to.
    pub fn bus(&self) -> &TelemetryBus {
        &self.bus
    }

    pub fn tick_period(&self) -> Duration {
        self.scheduler.period()
    }

    pub fn fully_qualified_name(&self) -> String {
        self.config.fully_qualified_name()
    }

    /// Run a single tick outside the scheduler.
    ///
    /// # Errors
    ///
    /// Propagates the tick's [`LocalisationError`].
    pub fn tick_once(&self) -> Result<TickReport, LocalisationError> {
        self.orchestrator.tick()
    }

    /// Tick at the configured rate until `shutdown` reads `true`.
    ///
    /// Returns the number of ticks executed.
    pub async fn spin(&self, shutdown: watch::Receiver<bool>) -> u64 {
        info!(
            node = %self.fully_qualified_name(),
            period_ms = self.tick_period().as_millis() as u64,
            "spinning"
        );
        let ticks = self
            .scheduler
            .run(|| self.orchestrator.tick(), shutdown)
            .await;
        info!(node = %self.fully_qualified_name(), ticks, "stopped");
        ticks
    }
}
