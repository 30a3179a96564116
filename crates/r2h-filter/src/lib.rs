//! `r2h-filter` – The Filter Handle
//!
//! The localisation filter fuses sensor data into a leader estimate.  Its
//! estimation algorithm lives outside this workspace; the node only reaches
//! it through the [`LocalisationFilter`] trait.
//!
//! # Modules
//!
//! - [`filter`] – [`LocalisationFilter`][filter::LocalisationFilter]: the
//!   read-only query surface (lifecycle state, results, diagnostics).
//! - [`sim`] – [`SimFilter`][sim::SimFilter]: a headless stand-in that warms
//!   up, then reports a leader walking a circle in front of the robot.  Lets
//!   the whole node run in CI without sensors.

pub mod filter;
pub mod sim;

pub use filter::LocalisationFilter;
pub use sim::{SimFilter, SimFilterConfig};
