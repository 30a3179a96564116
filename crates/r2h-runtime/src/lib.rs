//! `r2h-runtime` – The Publish Cycle
//!
//! Drives the robot-to-human localisation node: at a fixed rate it samples
//! the filter, decides what may be published, and pushes leader position,
//! status and diagnostics to the telemetry bus.
//!
//! # Modules
//!
//! - [`gate`] – [`should_publish_position`][gate::should_publish_position]:
//!   the lifecycle gate.  Only a running filter yields a leader position.
//! - [`orchestrator`] – [`TickOrchestrator`][orchestrator::TickOrchestrator]:
//!   one stamp per tick, conditional results query, then status and
//!   diagnostics, always in that order.
//! - [`scheduler`] – [`Scheduler`][scheduler::Scheduler]: fixed-period,
//!   non-overlapping tick driver that survives failing ticks.
//! - [`node`] – [`LocalisationNode`][node::LocalisationNode]: validates the
//!   [`NodeConfig`][node::NodeConfig] and wires filter, bus, orchestrator and
//!   scheduler together.
//! - [`clock`] – [`Clock`][clock::Clock]: the time source stamped on ticks.
//! - [`telemetry`] – [`init_tracing`][telemetry::init_tracing]: console,
//!   file and optional OTLP output for `tracing`.

pub mod clock;
pub mod gate;
pub mod node;
pub mod orchestrator;
pub mod scheduler;
pub mod telemetry;

#[cfg(test)]
mod test_support;

pub use clock::{Clock, SystemClock};
pub use gate::should_publish_position;
pub use node::{LocalisationNode, NodeConfig};
pub use orchestrator::{OutputChannels, TickOrchestrator, TickReport};
pub use scheduler::Scheduler;
pub use telemetry::{LogSettings, TracerProviderGuard, init_tracing};
