//! Publish gate.
//!
//! Decides, from the filter lifecycle state alone, whether a leader position
//! may be computed and published on the current tick.  The state space is
//! split in two: [`FsmState::Running`] opens the gate, every other member
//! keeps it closed.

use r2h_types::FsmState;

/// `true` iff `state` is [`FsmState::Running`].
pub fn should_publish_position(state: FsmState) -> bool {
    state == FsmState::Running
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn running_opens_gate() {
        assert!(should_publish_position(FsmState::Running));
    }

    #[test]
    fn every_other_state_keeps_gate_closed() {
        for state in FsmState::ALL {
            assert_eq!(should_publish_position(state), state == FsmState::Running);
        }
        assert!(!should_publish_position(FsmState::Initializing));
        assert!(!should_publish_position(FsmState::Degraded));
        assert!(!should_publish_position(FsmState::Aborted));
    }
}
