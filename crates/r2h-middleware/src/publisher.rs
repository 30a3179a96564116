//! Typed, stamped output channels.
//!
//! Every channel implements [`Publisher`], so the node can be wired to a
//! broadcast lane, a latched lane, or a test double without changing the
//! publishing code.
//!
//! | Type | Backing | Late subscribers |
//! |---|---|---|
//! | [`StampedPublisher`] | [`tokio::sync::broadcast`] | see only new messages |
//! | [`LatchedPublisher`] | [`tokio::sync::watch`] | see the last message |

use r2h_types::{LocalisationError, Stamped, Timestamp};
use tokio::sync::{broadcast, watch};
use tracing::trace;

/// One-way sink accepting a stamp and a typed value.
pub trait Publisher<T>: Send + Sync {
    /// Publish `value` stamped with `stamp`.
    ///
    /// Having no subscribers is a normal condition, not an error.
    ///
    /// # Errors
    ///
    /// Returns [`LocalisationError::Channel`] when the channel cannot accept
    /// the message.
    fn publish(&self, stamp: Timestamp, value: T) -> Result<(), LocalisationError>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Broadcast channel
// ─────────────────────────────────────────────────────────────────────────────

/// Fan-out channel: every subscriber receives every message published after
/// it subscribed.  Each message carries the configured frame id.
#[derive(Debug, Clone)]
pub struct StampedPublisher<T> {
    topic: String,
    frame_id: String,
    sender: broadcast::Sender<Stamped<T>>,
}

impl<T: Clone + Send + 'static> StampedPublisher<T> {
    /// Create a channel for `topic` buffering up to `capacity` messages per
    /// slow subscriber.
    ///
    /// # Errors
    ///
    /// Returns [`LocalisationError::Config`] when `capacity` is zero.
    pub fn new(
        topic: impl Into<String>,
        frame_id: impl Into<String>,
        capacity: usize,
    ) -> Result<Self, LocalisationError> {
        let topic = topic.into();
        if capacity == 0 {
            return Err(LocalisationError::Config(format!(
                "channel `{topic}` needs a capacity of at least 1"
            )));
        }
        let (sender, _) = broadcast::channel(capacity);
        Ok(Self {
            topic,
            frame_id: frame_id.into(),
            sender,
        })
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn frame_id(&self) -> &str {
        &self.frame_id
    }

    /// Subscribe to messages published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Stamped<T>> {
        self.sender.subscribe()
    }
}

impl<T: Clone + Send + Sync + 'static> Publisher<T> for StampedPublisher<T> {
    fn publish(&self, stamp: Timestamp, value: T) -> Result<(), LocalisationError> {
        let message = Stamped {
            stamp,
            frame_id: self.frame_id.clone(),
            data: value,
        };
        match self.sender.send(message) {
            Ok(n) => trace!(topic = %self.topic, receivers = n, "published"),
            Err(broadcast::error::SendError(_)) => {
                trace!(topic = %self.topic, "published with no subscribers")
            }
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Latched channel
// ─────────────────────────────────────────────────────────────────────────────

/// Depth-one channel that keeps the last message for late subscribers.
#[derive(Debug)]
pub struct LatchedPublisher<T> {
    topic: String,
    sender: watch::Sender<Option<Stamped<T>>>,
}

impl<T: Clone + Send + Sync + 'static> LatchedPublisher<T> {
    pub fn new(topic: impl Into<String>) -> Self {
        let (sender, _) = watch::channel(None);
        Self {
            topic: topic.into(),
            sender,
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Subscribe; the receiver immediately sees the latched message, if any.
    pub fn subscribe(&self) -> watch::Receiver<Option<Stamped<T>>> {
        self.sender.subscribe()
    }

    /// The most recently published message.
    pub fn latest(&self) -> Option<Stamped<T>> {
        self.sender.borrow().clone()
    }
}

impl<T: Clone + Send + Sync + 'static> Publisher<T> for LatchedPublisher<T> {
    fn publish(&self, stamp: Timestamp, value: T) -> Result<(), LocalisationError> {
        self.sender.send_replace(Some(Stamped {
            stamp,
            frame_id: String::new(),
            data: value,
        }));
        trace!(topic = %self.topic, "latched");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use r2h_types::{FsmState, Position2D};

    #[test]
    fn zero_capacity_is_a_config_error() {
        let result = StampedPublisher::<Position2D>::new("leader", "base_link", 0);
        assert!(matches!(result, Err(LocalisationError::Config(_))));
    }

    #[test]
    fn publish_without_subscribers_is_ok() {
        let publisher = StampedPublisher::new("leader", "base_link", 4).unwrap();
        assert!(publisher.publish(Utc::now(), Position2D::new(1.0, 2.0)).is_ok());
    }

    #[test]
    fn subscriber_receives_stamped_message_with_frame() {
        let publisher = StampedPublisher::new("leader", "base_footprint", 4).unwrap();
        let mut rx = publisher.subscribe();
        let stamp = Utc::now();
        publisher.publish(stamp, Position2D::new(3.0, -0.5)).unwrap();

        let msg = rx.try_recv().expect("message should be buffered");
        assert_eq!(msg.stamp, stamp);
        assert_eq!(msg.frame_id, "base_footprint");
        assert_eq!(msg.data, Position2D::new(3.0, -0.5));
    }

    #[test]
    fn latched_value_visible_to_late_subscriber() {
        let publisher = LatchedPublisher::new("status");
        assert!(publisher.latest().is_none());

        let stamp = Utc::now();
        publisher.publish(stamp, FsmState::Initializing).unwrap();
        publisher.publish(stamp, FsmState::Running).unwrap();

        let rx = publisher.subscribe();
        let latched = rx.borrow().clone().expect("latched status");
        assert_eq!(latched.data, FsmState::Running);
        assert_eq!(latched.stamp, stamp);
    }

    #[test]
    fn publishers_are_usable_as_trait_objects() {
        let sinks: Vec<Box<dyn Publisher<FsmState>>> = vec![
            Box::new(LatchedPublisher::new("status")),
            Box::new(StampedPublisher::new("status_stream", "", 2).unwrap()),
        ];
        for sink in &sinks {
            sink.publish(Utc::now(), FsmState::Degraded).unwrap();
        }
    }
}
