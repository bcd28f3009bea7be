//! Stack harness configuration

use serde::{Deserialize, Serialize};

use crate::{MeshError, MeshResult};

/// Processing task and capability configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StackConfig {
    /// Name of the processing task thread
    pub task_name: String,
    /// Scheduling priority of the processing task
    pub task_priority: u8,
    /// Stack size of the processing task, in bytes
    pub task_stack_size: usize,
    /// Enables the clear-all completion handshake
    pub clear_all_handshake: bool,
}

impl Default for StackConfig {
    fn default() -> Self {
        StackConfig {
            task_name: "mesh-stack".to_string(),
            task_priority: 3,
            task_stack_size: 8192,
            clear_all_handshake: false,
        }
    }
}

impl StackConfig {
    pub fn with_task_name(mut self, name: impl Into<String>) -> Self {
        self.task_name = name.into();
        self
    }

    pub fn with_task_priority(mut self, priority: u8) -> Self {
        self.task_priority = priority;
        self
    }

    pub fn with_task_stack_size(mut self, bytes: usize) -> Self {
        self.task_stack_size = bytes;
        self
    }

    pub fn with_clear_all_handshake(mut self, enabled: bool) -> Self {
        self.clear_all_handshake = enabled;
        self
    }

    /// Reject values the processing task cannot be created with
    pub fn validate(&self) -> MeshResult<()> {
        if self.task_name.is_empty() {
            return Err(MeshError::InvalidConfig("task_name is empty".into()));
        }
        if self.task_name.as_bytes().contains(&0) {
            return Err(MeshError::InvalidConfig(
                "task_name contains a NUL byte".into(),
            ));
        }
        if self.task_stack_size == 0 {
            return Err(MeshError::InvalidConfig("task_stack_size is zero".into()));
        }
        Ok(())
    }
}
