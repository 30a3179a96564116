//! `r2h-middleware` – Output Channels
//!
//! Carries what the node produces to whoever listens, without caring what
//! the data means.
//!
//! # Modules
//!
//! - [`publisher`] – the [`Publisher`][publisher::Publisher] trait plus the
//!   broadcast-backed [`StampedPublisher`][publisher::StampedPublisher] and the
//!   watch-backed [`LatchedPublisher`][publisher::LatchedPublisher].
//! - [`diagnostics`] – [`DiagnosticPublisher`][diagnostics::DiagnosticPublisher]:
//!   accepts a report every tick, forwards it at the diagnostic cadence.
//! - [`bus`] – [`TelemetryBus`][bus::TelemetryBus]: the three channels of a
//!   localisation node (leader position, status, diagnostics).

pub mod bus;
pub mod diagnostics;
pub mod publisher;

pub use bus::{BusConfig, TelemetryBus, Topic};
pub use diagnostics::{DiagnosticMessage, DiagnosticPublisher};
pub use publisher::{LatchedPublisher, Publisher, StampedPublisher};
