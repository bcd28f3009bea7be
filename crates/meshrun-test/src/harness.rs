//! Started-stack harness
//!
//! Brings a [`StackManager`] over a [`SimulatedEngine`] through init and
//! task start, and offers bounded polling for assertions on the
//! asynchronous processing task.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use meshrun_core::{MeshResult, StackConfig, TaskState};
use meshrun_runtime::StackManager;

use crate::engine::SimulatedEngine;

/// Default bound for [`wait_until`]
pub const DEFAULT_PATIENCE: Duration = Duration::from_secs(5);

/// Poll `cond` until it holds or `patience` runs out. Returns whether it
/// held.
pub fn wait_until(patience: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + patience;
    loop {
        if cond() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        thread::sleep(Duration::from_millis(1));
    }
}

/// A manager and its simulated engine, initialized and running
pub struct TestStack {
    pub engine: Arc<SimulatedEngine>,
    pub manager: Arc<StackManager>,
}

impl TestStack {
    /// Init and start with the default configuration
    pub fn start() -> MeshResult<Self> {
        Self::start_with(StackConfig::default())
    }

    /// Init and start, then wait for the task to reach `Waiting`
    pub fn start_with(config: StackConfig) -> MeshResult<Self> {
        let stack = Self::unstarted(config);
        stack.manager.init_stack()?;
        stack.manager.start_task()?;
        wait_until(DEFAULT_PATIENCE, || {
            stack.manager.task_state() == TaskState::Waiting
        });
        Ok(stack)
    }

    /// Construct without running any lifecycle step
    pub fn unstarted(config: StackConfig) -> Self {
        let engine = Arc::new(SimulatedEngine::new());
        let manager = StackManager::new(engine.clone(), config);
        TestStack { engine, manager }
    }

    /// Wait until the task has completed `count` drain passes
    pub fn wait_drain_passes(&self, count: u64) -> bool {
        wait_until(DEFAULT_PATIENCE, || self.manager.stats().drain_passes >= count)
    }

    /// Wait until the task is parked on the signal set with no drain in
    /// flight
    pub fn wait_idle(&self) -> bool {
        wait_until(DEFAULT_PATIENCE, || {
            self.manager.task_state() == TaskState::Waiting
                && self.manager.stats().drain_passes == self.engine.drain_passes()
        })
    }
}
