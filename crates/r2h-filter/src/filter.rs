//! Generic `LocalisationFilter` trait for anything that can estimate the
//! leader position relative to the robot.
//!
//! The node owns exactly one filter and only ever queries it.  Filters keep
//! their own lifecycle state machine; the node never drives transitions.

use r2h_types::{DiagnosticReport, FsmState, LocalisationError, LocalisationResults, Timestamp};

/// Read-only query surface of a robot-to-human localisation filter.
pub trait LocalisationFilter: Send {
    /// Current lifecycle state of the filter.
    ///
    /// # Errors
    ///
    /// Returns [`LocalisationError::FilterQuery`] if the state cannot be read.
    fn fsm_state(&self) -> Result<FsmState, LocalisationError>;

    /// Leader estimate as of `stamp`.
    ///
    /// Only meaningful while [`fsm_state`][Self::fsm_state] is
    /// [`FsmState::Running`].
    ///
    /// # Errors
    ///
    /// Returns [`LocalisationError::FilterQuery`] when called outside the
    /// running state or when the estimate cannot be produced.
    fn results(&self, stamp: Timestamp) -> Result<LocalisationResults, LocalisationError>;

    /// Health summary as of `stamp`.  Valid in every lifecycle state.
    ///
    /// # Errors
    ///
    /// Returns [`LocalisationError::FilterQuery`] if the report cannot be
    /// built.
    fn diagnostic_report(&self, stamp: Timestamp) -> Result<DiagnosticReport, LocalisationError>;
}

impl<F: LocalisationFilter + Sync> LocalisationFilter for std::sync::Arc<F> {
    fn fsm_state(&self) -> Result<FsmState, LocalisationError> {
        (**self).fsm_state()
    }

    fn results(&self, stamp: Timestamp) -> Result<LocalisationResults, LocalisationError> {
        (**self).results(stamp)
    }

    fn diagnostic_report(&self, stamp: Timestamp) -> Result<DiagnosticReport, LocalisationError> {
        (**self).diagnostic_report(stamp)
    }
}
