//! [`DiagnosticPublisher`] – rate-limited diagnostics channel.
//!
//! The node hands a [`DiagnosticReport`] to this channel on every tick.  The
//! channel forwards to subscribers at most once per diagnostic period,
//! measured on the message stamps, so a 10 Hz node still emits 1 Hz
//! diagnostics.  A change of [`DiagnosticLevel`] is forwarded immediately so
//! that faults are never hidden by the throttle.
//!
//! A stamp earlier than the last forwarded one (wall-clock jump) resets the
//! throttle and is forwarded.

use std::sync::Mutex;
use std::time::Duration;

use r2h_types::{DiagnosticLevel, DiagnosticReport, LocalisationError, Stamped, Timestamp};
use tokio::sync::broadcast;
use tracing::trace;

use crate::publisher::Publisher;

/// Default forwarding period of the diagnostics channel.
pub const DEFAULT_DIAGNOSTIC_PERIOD: Duration = Duration::from_secs(1);

/// What subscribers of the diagnostics channel receive.
#[derive(Debug, Clone, PartialEq)]
pub struct DiagnosticMessage {
    /// Fully qualified name of the reporting node.
    pub hardware_id: String,
    pub report: DiagnosticReport,
}

struct Forwarded {
    stamp: Timestamp,
    level: DiagnosticLevel,
}

/// Diagnostics channel throttled to one message per period.
pub struct DiagnosticPublisher {
    topic: String,
    hardware_id: String,
    period: chrono::Duration,
    sender: broadcast::Sender<Stamped<DiagnosticMessage>>,
    last: Mutex<Option<Forwarded>>,
}

impl DiagnosticPublisher {
    /// Create a diagnostics channel.
    ///
    /// # Errors
    ///
    /// Returns [`LocalisationError::Config`] when `capacity` is zero or
    /// `period` does not fit a signed duration.
    pub fn new(
        topic: impl Into<String>,
        hardware_id: impl Into<String>,
        period: Duration,
        capacity: usize,
    ) -> Result<Self, LocalisationError> {
        let topic = topic.into();
        if capacity == 0 {
            return Err(LocalisationError::Config(format!(
                "channel `{topic}` needs a capacity of at least 1"
            )));
        }
        let period = chrono::Duration::from_std(period).map_err(|e| {
            LocalisationError::Config(format!("invalid diagnostic period: {e}"))
        })?;
        let (sender, _) = broadcast::channel(capacity);
        Ok(Self {
            topic,
            hardware_id: hardware_id.into(),
            period,
            sender,
            last: Mutex::new(None),
        })
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Stamped<DiagnosticMessage>> {
        self.sender.subscribe()
    }

    fn should_forward(&self, last: Option<&Forwarded>, stamp: Timestamp, level: DiagnosticLevel) -> bool {
        match last {
            None => true,
            Some(prev) if prev.level != level => true,
            Some(prev) => {
                let elapsed = stamp - prev.stamp;
                elapsed >= self.period || elapsed < chrono::Duration::zero()
            }
        }
    }
}

impl Publisher<DiagnosticReport> for DiagnosticPublisher {
    fn publish(&self, stamp: Timestamp, report: DiagnosticReport) -> Result<(), LocalisationError> {
        let mut last = self
            .last
            .lock()
            .map_err(|e| LocalisationError::channel(self.topic.clone(), e.to_string()))?;

        if !self.should_forward(last.as_ref(), stamp, report.level) {
            trace!(topic = %self.topic, "diagnostics throttled");
            return Ok(());
        }
        *last = Some(Forwarded {
            stamp,
            level: report.level,
        });

        let message = Stamped {
            stamp,
            frame_id: String::new(),
            data: DiagnosticMessage {
                hardware_id: self.hardware_id.clone(),
                report,
            },
        };
        // No subscribers is not an error.
        let _ = self.sender.send(message);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn publisher() -> DiagnosticPublisher {
        DiagnosticPublisher::new("diagnostics", "/r2h/localisation", Duration::from_secs(1), 16)
            .unwrap()
    }

    fn drain(rx: &mut broadcast::Receiver<Stamped<DiagnosticMessage>>) -> Vec<Stamped<DiagnosticMessage>> {
        let mut out = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            out.push(msg);
        }
        out
    }

    #[test]
    fn zero_capacity_is_a_config_error() {
        let result =
            DiagnosticPublisher::new("diagnostics", "node", Duration::from_secs(1), 0);
        assert!(matches!(result, Err(LocalisationError::Config(_))));
    }

    #[test]
    fn forwards_once_per_period_at_tick_rate() {
        let publisher = publisher();
        let mut rx = publisher.subscribe();
        let start = Utc::now();
        // 25 ticks at 10 Hz span 2.4 s.
        for i in 0..25 {
            let stamp = start + chrono::Duration::milliseconds(100 * i);
            publisher.publish(stamp, DiagnosticReport::ok("fine")).unwrap();
        }
        let forwarded = drain(&mut rx);
        assert_eq!(forwarded.len(), 3);
        assert_eq!(forwarded[0].stamp, start);
        assert_eq!(forwarded[1].stamp, start + chrono::Duration::seconds(1));
        assert_eq!(forwarded[2].data.hardware_id, "/r2h/localisation");
    }

    #[test]
    fn level_change_is_forwarded_immediately() {
        let publisher = publisher();
        let mut rx = publisher.subscribe();
        let start = Utc::now();
        publisher.publish(start, DiagnosticReport::ok("fine")).unwrap();
        publisher
            .publish(start + chrono::Duration::milliseconds(100), DiagnosticReport::error("lost"))
            .unwrap();
        let forwarded = drain(&mut rx);
        assert_eq!(forwarded.len(), 2);
        assert_eq!(forwarded[1].data.report.level, DiagnosticLevel::Error);
    }

    #[test]
    fn backwards_stamp_resets_throttle() {
        let publisher = publisher();
        let mut rx = publisher.subscribe();
        let start = Utc::now();
        publisher.publish(start, DiagnosticReport::ok("fine")).unwrap();
        publisher
            .publish(start - chrono::Duration::seconds(5), DiagnosticReport::ok("fine"))
            .unwrap();
        assert_eq!(drain(&mut rx).len(), 2);
    }
}
