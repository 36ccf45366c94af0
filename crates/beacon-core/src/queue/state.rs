//! Queue lifecycle state machine.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle of a queue.
///
/// Transitions are linear and never re-entered:
/// - Created -> Running (start)
/// - Running -> Draining (stop)
/// - Created -> Draining (stop without start)
/// - Draining -> Stopped (all tasks joined within the deadline)
///
/// A queue whose stop timed out stays in Draining.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    Created,
    Running,
    Draining,
    Stopped,
}

impl LifecycleState {
    /// Can producers still enqueue?
    pub fn accepts_enqueue(self) -> bool {
        matches!(self, LifecycleState::Created | LifecycleState::Running)
    }

    /// Is this a state `stop` may be called from?
    pub fn can_stop(self) -> bool {
        matches!(self, LifecycleState::Created | LifecycleState::Running)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LifecycleState::Created => "created",
            LifecycleState::Running => "running",
            LifecycleState::Draining => "draining",
            LifecycleState::Stopped => "stopped",
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(LifecycleState::Created, true)]
    #[case(LifecycleState::Running, true)]
    #[case(LifecycleState::Draining, false)]
    #[case(LifecycleState::Stopped, false)]
    fn only_live_states_accept_work(#[case] state: LifecycleState, #[case] accepts: bool) {
        assert_eq!(state.accepts_enqueue(), accepts);
        assert_eq!(state.can_stop(), accepts);
    }
}
