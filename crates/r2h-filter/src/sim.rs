//! In-process simulated filter for CI and demo runs without sensors.
//!
//! [`SimFilter`] reports [`FsmState::Initializing`] for a configurable number
//! of state queries, then switches to [`FsmState::Running`] and places the
//! leader on a circle in front of the robot.  The circle is parameterised by
//! the query stamp, so the same stamp always yields the same estimate.
//!
//! # Example
//!
//! ```rust
//! use chrono::Utc;
//! use r2h_filter::{LocalisationFilter, SimFilter, SimFilterConfig};
//! use r2h_types::FsmState;
//!
//! let filter = SimFilter::new(SimFilterConfig {
//!     warmup_ticks: 1,
//!     ..SimFilterConfig::default()
//! });
//!
//! assert_eq!(filter.fsm_state().unwrap(), FsmState::Initializing);
//! assert_eq!(filter.fsm_state().unwrap(), FsmState::Running);
//! let results = filter.results(Utc::now()).expect("running filter yields results");
//! assert!(results.leader_x > 0.0);
//! ```

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use r2h_types::{DiagnosticReport, FsmState, LocalisationError, LocalisationResults, Timestamp};
use tracing::debug;

use crate::filter::LocalisationFilter;

/// Tuning knobs for [`SimFilter`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimFilterConfig {
    /// Number of state queries answered with `Initializing` before running.
    pub warmup_ticks: u64,
    /// Distance from the robot to the centre of the leader's circle (metres).
    pub standoff_m: f64,
    /// Radius of the leader's circle (metres).
    pub radius_m: f64,
    /// Angular speed of the leader along the circle (rad/s).
    pub angular_speed_rad_s: f64,
    /// Diagonal position variance reported with every estimate (m²).
    pub position_variance: f64,
}

impl Default for SimFilterConfig {
    fn default() -> Self {
        Self {
            warmup_ticks: 10,
            standoff_m: 3.0,
            radius_m: 1.0,
            angular_speed_rad_s: 0.2,
            position_variance: 0.04,
        }
    }
}

/// Simulated localisation filter.
pub struct SimFilter {
    config: SimFilterConfig,
    origin: Timestamp,
    state_queries: AtomicU64,
    forced_state: Option<FsmState>,
}

impl SimFilter {
    /// Create a simulated filter whose circle starts at the current time.
    pub fn new(config: SimFilterConfig) -> Self {
        Self::with_origin(config, Utc::now())
    }

    /// Create a simulated filter whose circle starts at `origin`.
    pub fn with_origin(config: SimFilterConfig, origin: Timestamp) -> Self {
        Self {
            config,
            origin,
            state_queries: AtomicU64::new(0),
            forced_state: None,
        }
    }

    /// Pin the reported lifecycle state, bypassing the warm-up logic.
    /// `None` restores the normal behaviour.
    pub fn set_forced_state(&mut self, state: Option<FsmState>) {
        self.forced_state = state;
    }

    fn current_state(&self) -> FsmState {
        if let Some(state) = self.forced_state {
            return state;
        }
        if self.state_queries.load(Ordering::Acquire) > self.config.warmup_ticks {
            FsmState::Running
        } else {
            FsmState::Initializing
        }
    }

    fn leader_xy(&self, stamp: Timestamp) -> (f64, f64, f64) {
        let elapsed = (stamp - self.origin).num_milliseconds() as f64 / 1000.0;
        let theta = self.config.angular_speed_rad_s * elapsed;
        let x = self.config.standoff_m + self.config.radius_m * theta.cos();
        let y = self.config.radius_m * theta.sin();
        // Tangent to the circle, counter-clockwise.
        let course = theta + std::f64::consts::FRAC_PI_2;
        (x, y, course)
    }
}

impl LocalisationFilter for SimFilter {
    fn fsm_state(&self) -> Result<FsmState, LocalisationError> {
        self.state_queries.fetch_add(1, Ordering::AcqRel);
        Ok(self.current_state())
    }

    fn results(&self, stamp: Timestamp) -> Result<LocalisationResults, LocalisationError> {
        let state = self.current_state();
        if !state.is_running() {
            return Err(LocalisationError::filter_query(
                "results",
                format!("no estimate available in state {state}"),
            ));
        }
        let (leader_x, leader_y, leader_course_rad) = self.leader_xy(stamp);
        let v = self.config.position_variance;
        debug!(leader_x, leader_y, "sim filter estimate");
        Ok(LocalisationResults {
            stamp,
            leader_x,
            leader_y,
            leader_course_rad,
            covariance: [v, 0.0, 0.0, 0.0, v, 0.0, 0.0, 0.0, v],
        })
    }

    fn diagnostic_report(&self, stamp: Timestamp) -> Result<DiagnosticReport, LocalisationError> {
        let state = self.current_state();
        let report = match state {
            FsmState::Running => {
                let (x, y, _) = self.leader_xy(stamp);
                DiagnosticReport::ok("leader tracked")
                    .with_detail("leader_range_m", format!("{:.3}", x.hypot(y)))
            }
            FsmState::Initializing => DiagnosticReport::warn("filter warming up").with_detail(
                "state_queries",
                self.state_queries.load(Ordering::Acquire),
            ),
            FsmState::Degraded => DiagnosticReport::warn("leader estimate degraded"),
            FsmState::Aborted => DiagnosticReport::error("filter aborted"),
        };
        Ok(report.with_detail("fsm_state", state))
    }
}
