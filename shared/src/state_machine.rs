//! Vehicle Run State Machine
//!
//! Starting -> Running -> Stopped. Stopped is terminal; a new run needs a
//! process restart.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lifecycle state of the vehicle control loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    #[default]
    Starting,
    Running,
    Stopped,
}

impl RunState {
    pub fn is_running(self) -> bool {
        self == RunState::Running
    }

    /// Apply an event, returning the next state
    pub fn apply(self, event: VehicleEvent) -> Result<RunState, TransitionError> {
        use RunState::*;
        use VehicleEvent::*;

        match (self, event) {
            (Starting, LoopStarted) => Ok(Running),
            // Shutdown is accepted from any live state
            (Starting | Running, ShutdownRequested) => Ok(Stopped),
            (Stopped, ShutdownRequested) => Ok(Stopped),
            (from, event) => Err(TransitionError { from, event }),
        }
    }
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunState::Starting => write!(f, "starting"),
            RunState::Running => write!(f, "running"),
            RunState::Stopped => write!(f, "stopped"),
        }
    }
}

/// Events that drive run state transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VehicleEvent {
    /// Control loop entered its scheduling loop
    LoopStarted,
    /// Interrupt signal or explicit stop
    ShutdownRequested,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid run state transition: {event:?} while {from}")]
pub struct TransitionError {
    pub from: RunState,
    pub event: VehicleEvent,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        assert_eq!(RunState::default(), RunState::Starting);
    }

    #[test]
    fn test_normal_lifecycle() {
        let state = RunState::Starting.apply(VehicleEvent::LoopStarted).unwrap();
        assert_eq!(state, RunState::Running);
        let state = state.apply(VehicleEvent::ShutdownRequested).unwrap();
        assert_eq!(state, RunState::Stopped);
    }

    #[test]
    fn test_stopped_is_terminal() {
        let result = RunState::Stopped.apply(VehicleEvent::LoopStarted);
        assert!(result.is_err());
        assert_eq!(
            RunState::Stopped.apply(VehicleEvent::ShutdownRequested),
            Ok(RunState::Stopped)
        );
    }

    #[test]
    fn test_cannot_start_twice() {
        assert!(RunState::Running.apply(VehicleEvent::LoopStarted).is_err());
    }

    #[test]
    fn test_serializes_lowercase() {
        assert_eq!(serde_json::to_value(RunState::Running).unwrap(), "running");
    }
}
