//! Task state and runtime statistics

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Lifecycle state of the processing task
///
/// `Waiting` and `Draining` alternate for the life of the process; there is
/// no terminal state.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    Created = 0,
    Initializing = 1,
    Waiting = 2,
    Draining = 3,
}

impl TaskState {
    #[inline]
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(TaskState::Created),
            1 => Some(TaskState::Initializing),
            2 => Some(TaskState::Waiting),
            3 => Some(TaskState::Draining),
            _ => None,
        }
    }

    #[inline]
    pub fn is_running(self) -> bool {
        matches!(self, TaskState::Waiting | TaskState::Draining)
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TaskState::Created => "created",
            TaskState::Initializing => "initializing",
            TaskState::Waiting => "waiting",
            TaskState::Draining => "draining",
        };
        f.write_str(name)
    }
}

/// Snapshot of processing task counters
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeStats {
    /// Successful waits on the signal set
    pub wakeups: u64,
    /// Waits that returned without a pending signal
    pub interrupted_waits: u64,
    /// Completed drain passes
    pub drain_passes: u64,
    /// Gate acquisitions that failed and proceeded without exclusion
    pub lock_failures: u64,
    /// Releases by a context that did not hold the gate
    pub tolerated_releases: u64,
    pub last_drain_duration: Duration,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_state_roundtrip_and_bounds() {
        for state in [
            TaskState::Created,
            TaskState::Initializing,
            TaskState::Waiting,
            TaskState::Draining,
        ] {
            assert_eq!(TaskState::from_u8(state as u8), Some(state));
        }
        assert_eq!(TaskState::from_u8(4), None);
    }

    #[test]
    fn test_task_state_running() {
        assert!(!TaskState::Created.is_running());
        assert!(!TaskState::Initializing.is_running());
        assert!(TaskState::Waiting.is_running());
        assert!(TaskState::Draining.is_running());
        assert_eq!(TaskState::Draining.to_string(), "draining");
    }

    #[test]
    fn test_stats_snapshot_exports_as_json() {
        let stats = RuntimeStats {
            wakeups: 4,
            drain_passes: 3,
            tolerated_releases: 1,
            last_drain_duration: Duration::from_micros(250),
            ..RuntimeStats::default()
        };
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["wakeups"], 4);
        assert_eq!(json["drain_passes"], 3);
        assert_eq!(json["last_drain_duration"]["nanos"], 250_000);

        let state = serde_json::to_value(TaskState::Draining).unwrap();
        assert_eq!(state, "draining");
    }
}
