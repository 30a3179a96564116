//! Recording doubles shared by the runtime tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use chrono::{Duration, TimeZone, Utc};
use r2h_filter::LocalisationFilter;
use r2h_middleware::Publisher;
use r2h_types::{
    DiagnosticReport, FsmState, LocalisationError, LocalisationResults, Position2D, Timestamp,
};

use crate::clock::Clock;
use crate::orchestrator::OutputChannels;

/// One observable interaction with a collaborator.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    StateQuery,
    ResultsQuery(Timestamp),
    DiagnosticsQuery(Timestamp),
    Publish(&'static str, Timestamp),
}

pub type CallLog = Arc<Mutex<Vec<Call>>>;

pub fn new_log() -> CallLog {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn count(log: &CallLog, pred: impl Fn(&Call) -> bool) -> usize {
    log.lock().unwrap().iter().filter(|c| pred(c)).count()
}

pub fn publishes(log: &CallLog, channel: &str) -> usize {
    count(log, |c| matches!(c, Call::Publish(name, _) if *name == channel))
}

pub fn results_queries(log: &CallLog) -> usize {
    count(log, |c| matches!(c, Call::ResultsQuery(_)))
}

/// Filter that replays a fixed sequence of states, one per state query.
/// The last state repeats once the script runs out.
pub struct ScriptedFilter {
    states: Mutex<VecDeque<FsmState>>,
    last: Mutex<FsmState>,
    /// 1-based state-query numbers whose diagnostics query fails.
    failing_diagnostics: Vec<usize>,
    state_queries: Mutex<usize>,
    log: CallLog,
}

impl ScriptedFilter {
    pub fn new(states: &[FsmState], log: CallLog) -> Self {
        Self {
            states: Mutex::new(states.iter().copied().collect()),
            last: Mutex::new(states.last().copied().unwrap_or(FsmState::Initializing)),
            failing_diagnostics: Vec::new(),
            state_queries: Mutex::new(0),
            log,
        }
    }

    pub fn failing_diagnostics_on(mut self, ticks: &[usize]) -> Self {
        self.failing_diagnostics = ticks.to_vec();
        self
    }
}

impl LocalisationFilter for ScriptedFilter {
    fn fsm_state(&self) -> Result<FsmState, LocalisationError> {
        self.log.lock().unwrap().push(Call::StateQuery);
        *self.state_queries.lock().unwrap() += 1;
        let next = self.states.lock().unwrap().pop_front();
        let mut last = self.last.lock().unwrap();
        if let Some(state) = next {
            *last = state;
        }
        Ok(*last)
    }

    fn results(&self, stamp: Timestamp) -> Result<LocalisationResults, LocalisationError> {
        self.log.lock().unwrap().push(Call::ResultsQuery(stamp));
        Ok(LocalisationResults {
            stamp,
            leader_x: 2.0,
            leader_y: 0.5,
            leader_course_rad: 0.0,
            covariance: [0.0; 9],
        })
    }

    fn diagnostic_report(&self, stamp: Timestamp) -> Result<DiagnosticReport, LocalisationError> {
        self.log.lock().unwrap().push(Call::DiagnosticsQuery(stamp));
        let tick = *self.state_queries.lock().unwrap();
        if self.failing_diagnostics.contains(&tick) {
            return Err(LocalisationError::filter_query(
                "diagnostic_report",
                "injected fault",
            ));
        }
        Ok(DiagnosticReport::ok("scripted"))
    }
}

/// Channel that only records the publish in the shared log.
pub struct RecordingPublisher {
    name: &'static str,
    log: CallLog,
}

impl<T> Publisher<T> for RecordingPublisher {
    fn publish(&self, stamp: Timestamp, _value: T) -> Result<(), LocalisationError> {
        self.log.lock().unwrap().push(Call::Publish(self.name, stamp));
        Ok(())
    }
}

pub fn recording_channels(log: &CallLog) -> OutputChannels {
    OutputChannels {
        leader_position: Arc::new(RecordingPublisher {
            name: "position",
            log: Arc::clone(log),
        }) as Arc<dyn Publisher<Position2D>>,
        status: Arc::new(RecordingPublisher {
            name: "status",
            log: Arc::clone(log),
        }) as Arc<dyn Publisher<FsmState>>,
        diagnostics: Arc::new(RecordingPublisher {
            name: "diagnostics",
            log: Arc::clone(log),
        }) as Arc<dyn Publisher<DiagnosticReport>>,
    }
}

/// Clock that advances by `step` on every read, so a second read within a
/// tick would be visible as a different stamp.
pub struct SteppingClock {
    next: Mutex<Timestamp>,
    step: Duration,
}

impl SteppingClock {
    pub fn new(step_ms: i64) -> Self {
        Self {
            next: Mutex::new(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()),
            step: Duration::milliseconds(step_ms),
        }
    }
}

impl Clock for SteppingClock {
    fn now(&self) -> Timestamp {
        let mut next = self.next.lock().unwrap();
        let now = *next;
        *next = now + self.step;
        now
    }
}
