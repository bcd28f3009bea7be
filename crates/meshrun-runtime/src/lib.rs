//! meshrun Runtime - Execution harness for a single-consumer protocol engine
//!
//! The engine runs on one dedicated processing task:
//! 1. Wait on the signal set (any bit wakes the task)
//! 2. Acquire the stack gate
//! 3. Run one drain pass of the engine
//! 4. Release the gate and wait again
//!
//! Other threads signal activity through [`EngineHooks`] and take the gate
//! through [`StackManager::stack_guard`] before touching engine state.

pub mod engine;
pub mod logging;
pub mod manager;
pub mod memory;
pub mod registry;

pub use engine::*;
pub use manager::*;
pub use memory::{PlatformMemory, SystemMemory};

pub use meshrun_core::{ContextId, MeshError, MeshResult, RuntimeStats, StackConfig, TaskState};
pub use meshrun_sync::{ClearAllTicket, Notified, Released, Signal};
