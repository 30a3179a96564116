use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Instant at which a tick samples the filter and stamps its outputs.
pub type Timestamp = DateTime<Utc>;

/// Lifecycle phase of the localisation filter.
///
/// The filter owns every transition.  Consumers only care whether the value
/// is [`FsmState::Running`]; the other members all mean "not ready yet".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FsmState {
    /// The filter is waiting for enough sensor data to initialise.
    Initializing,
    /// The filter produces trustworthy estimates.
    Running,
    /// The filter is alive but its estimate should not be trusted.
    Degraded,
    /// The filter gave up and must be reset externally.
    Aborted,
}

impl FsmState {
    /// Every member, in declaration order.
    pub const ALL: [FsmState; 4] = [
        FsmState::Initializing,
        FsmState::Running,
        FsmState::Degraded,
        FsmState::Aborted,
    ];

    pub fn is_running(self) -> bool {
        self == FsmState::Running
    }
}

impl fmt::Display for FsmState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FsmState::Initializing => write!(f, "INITIALIZING"),
            FsmState::Running => write!(f, "RUNNING"),
            FsmState::Degraded => write!(f, "DEGRADED"),
            FsmState::Aborted => write!(f, "ABORTED"),
        }
    }
}

/// Leader position expressed in the robot base-footprint frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position2D {
    /// Longitudinal offset of the leader (metres).
    pub x: f64,
    /// Lateral offset of the leader (metres).
    pub y: f64,
    /// Row-major 2×2 position covariance (m²).
    pub covariance: [f64; 4],
}

impl Position2D {
    /// A position with zero covariance.
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            covariance: [0.0; 4],
        }
    }
}

/// Estimate produced by the filter for a given stamp.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocalisationResults {
    pub stamp: Timestamp,
    /// Leader X in the base-footprint frame (metres).
    pub leader_x: f64,
    /// Leader Y in the base-footprint frame (metres).
    pub leader_y: f64,
    /// Leader course relative to the robot heading (radians).
    pub leader_course_rad: f64,
    /// Row-major 3×3 covariance over (x, y, course).
    pub covariance: [f64; 9],
}

impl LocalisationResults {
    /// Project the estimate onto the 2-D leader position that gets published.
    ///
    /// The position covariance is the upper-left 2×2 block of the full
    /// covariance.
    pub fn to_leader_position(&self) -> Position2D {
        let c = &self.covariance;
        Position2D {
            x: self.leader_x,
            y: self.leader_y,
            covariance: [c[0], c[1], c[3], c[4]],
        }
    }
}

/// Severity carried by a [`DiagnosticReport`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticLevel {
    Ok,
    Warn,
    Error,
    Stale,
}

/// Health summary produced by the filter on every tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticReport {
    pub level: DiagnosticLevel,
    pub summary: String,
    /// Ordered key/value pairs, e.g. `("leader_range", "3.2")`.
    pub details: Vec<(String, String)>,
}

impl DiagnosticReport {
    pub fn new(level: DiagnosticLevel, summary: impl Into<String>) -> Self {
        Self {
            level,
            summary: summary.into(),
            details: Vec::new(),
        }
    }

    pub fn ok(summary: impl Into<String>) -> Self {
        Self::new(DiagnosticLevel::Ok, summary)
    }

    pub fn warn(summary: impl Into<String>) -> Self {
        Self::new(DiagnosticLevel::Warn, summary)
    }

    pub fn error(summary: impl Into<String>) -> Self {
        Self::new(DiagnosticLevel::Error, summary)
    }

    /// Append a key/value detail, keeping insertion order.
    pub fn with_detail(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.details.push((key.into(), value.to_string()));
        self
    }
}

/// Envelope handed to channel subscribers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stamped<T> {
    pub stamp: Timestamp,
    /// Reference frame of `data`; empty when the payload is frame-less.
    pub frame_id: String,
    pub data: T,
}

/// Global error type for the localisation node.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LocalisationError {
    #[error("Configuration Error: {0}")]
    Config(String),

    #[error("Filter Unavailable: {0}")]
    FilterUnavailable(String),

    #[error("Filter Query `{operation}` failed: {details}")]
    FilterQuery { operation: String, details: String },

    #[error("Channel `{channel}` error: {details}")]
    Channel { channel: String, details: String },

    #[error("Scheduler Error: {0}")]
    Scheduler(String),
}

impl LocalisationError {
    pub fn filter_query(operation: impl Into<String>, details: impl Into<String>) -> Self {
        Self::FilterQuery {
            operation: operation.into(),
            details: details.into(),
        }
    }

    pub fn channel(channel: impl Into<String>, details: impl Into<String>) -> Self {
        Self::Channel {
            channel: channel.into(),
            details: details.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fsm_state_serializes_screaming_case() {
        let json = serde_json::to_string(&FsmState::Initializing).unwrap();
        assert_eq!(json, "\"INITIALIZING\"");
        let back: FsmState = serde_json::from_str("\"RUNNING\"").unwrap();
        assert_eq!(back, FsmState::Running);
    }

    #[test]
    fn fsm_state_display_matches_serde_name() {
        for state in FsmState::ALL {
            let json = serde_json::to_string(&state).unwrap();
            assert_eq!(json.trim_matches('"'), state.to_string());
        }
    }

    #[test]
    fn only_running_is_running() {
        let running: Vec<_> = FsmState::ALL.into_iter().filter(|s| s.is_running()).collect();
        assert_eq!(running, vec![FsmState::Running]);
    }

    #[test]
    fn leader_position_keeps_xy_block_of_covariance() {
        let results = LocalisationResults {
            stamp: Utc::now(),
            leader_x: 2.5,
            leader_y: -1.0,
            leader_course_rad: 0.3,
            covariance: [1.0, 0.1, 0.2, 0.1, 2.0, 0.3, 0.2, 0.3, 3.0],
        };
        let position = results.to_leader_position();
        assert_eq!(position.x, 2.5);
        assert_eq!(position.y, -1.0);
        assert_eq!(position.covariance, [1.0, 0.1, 0.1, 2.0]);
    }

    #[test]
    fn diagnostic_report_details_keep_order() {
        let report = DiagnosticReport::warn("warming up")
            .with_detail("samples", 3)
            .with_detail("leader_range", 4.5);
        assert_eq!(report.level, DiagnosticLevel::Warn);
        assert_eq!(report.details[0], ("samples".to_string(), "3".to_string()));
        assert_eq!(report.details[1].0, "leader_range");
    }

    #[test]
    fn localisation_error_display() {
        let err = LocalisationError::Config("publish_rate must be > 0".to_string());
        assert!(err.to_string().contains("Configuration Error"));

        let err = LocalisationError::filter_query("diagnostic_report", "sensor timeout");
        assert!(err.to_string().contains("diagnostic_report"));
        assert!(err.to_string().contains("sensor timeout"));
    }

    #[test]
    fn localisation_error_roundtrip() {
        let err = LocalisationError::channel("status", "closed");
        let json = serde_json::to_string(&err).unwrap();
        let back: LocalisationError = serde_json::from_str(&json).unwrap();
        assert_eq!(err, back);
    }
}
