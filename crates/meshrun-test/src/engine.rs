//! Simulated protocol engine
//!
//! Stands in for the wrapped mesh stack: work is queued from any thread,
//! the engine asks for a drain pass through its hooks, and each drain pass
//! empties the queue. A clear-all request completes asynchronously on the
//! next drain pass and reports through the clear-all hook.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::OnceLock;

use crossbeam_queue::ArrayQueue;
use parking_lot::{Condvar, Mutex};
use tracing::{debug, warn};

use meshrun_core::{MeshError, MeshResult};
use meshrun_runtime::{EngineHooks, ProtocolEngine};

/// Inbox slots; a full inbox drops the newest work
pub const INBOX_CAPACITY: usize = 4096;

// ============================================================================
// WORK ITEMS
// ============================================================================

/// A unit of engine work
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EngineWork {
    /// Internal deferred work
    Tasklet(u32),
    /// A frame delivered by the radio driver
    RadioFrame(Vec<u8>),
    /// A timer expiry
    TimerFired(u32),
}

#[derive(Default)]
struct DrainLatch {
    paused: bool,
    entered: u64,
}

// ============================================================================
// SIMULATED ENGINE
// ============================================================================

/// In-memory protocol engine for harness testing
///
/// The inbox is a bounded lock-free queue and the hooks are write-once, so
/// [`post_from_isr`](Self::post_from_isr) takes no lock and never allocates.
pub struct SimulatedEngine {
    hooks: OnceLock<EngineHooks>,
    inbox: ArrayQueue<EngineWork>,
    dropped: AtomicU64,
    processed: Mutex<Vec<EngineWork>>,
    records: Mutex<Vec<u64>>,
    clear_requested: AtomicBool,
    fail_init: bool,
    inits: AtomicU64,
    drain_passes: AtomicU64,
    /// Contexts currently inside engine state
    occupants: AtomicUsize,
    overlaps: AtomicU64,
    latch: Mutex<DrainLatch>,
    latch_changed: Condvar,
}

impl Default for SimulatedEngine {
    fn default() -> Self {
        SimulatedEngine {
            hooks: OnceLock::new(),
            inbox: ArrayQueue::new(INBOX_CAPACITY),
            dropped: AtomicU64::new(0),
            processed: Mutex::new(Vec::new()),
            records: Mutex::new(Vec::new()),
            clear_requested: AtomicBool::new(false),
            fail_init: false,
            inits: AtomicU64::new(0),
            drain_passes: AtomicU64::new(0),
            occupants: AtomicUsize::new(0),
            overlaps: AtomicU64::new(0),
            latch: Mutex::new(DrainLatch::default()),
            latch_changed: Condvar::new(),
        }
    }
}

impl SimulatedEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Engine whose system init reports a missing radio
    pub fn failing() -> Self {
        SimulatedEngine {
            fail_init: true,
            ..Self::default()
        }
    }

    fn hooks(&self) -> Option<&EngineHooks> {
        self.hooks.get()
    }

    fn enqueue(&self, work: EngineWork) -> bool {
        if self.inbox.push(work).is_err() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            return false;
        }
        true
    }

    /// Queue work from a thread context and request a drain pass
    pub fn post(&self, work: EngineWork) {
        if !self.enqueue(work) {
            warn!("engine inbox full, work dropped");
            return;
        }
        if let Some(hooks) = self.hooks() {
            hooks.signal_pending();
        }
    }

    /// Queue work as a radio driver would and request a drain pass through
    /// the interrupt-context hook
    pub fn post_from_isr(&self, work: EngineWork) {
        if self.enqueue(work) {
            if let Some(hooks) = self.hooks() {
                hooks.signal_pending_from_isr();
            }
        }
    }

    /// Work rejected because the inbox was full
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Add a registered service record. Caller holds the stack gate.
    pub fn add_record(&self, record: u64) {
        self.with_state(|| self.records.lock().push(record));
    }

    pub fn records(&self) -> Vec<u64> {
        self.records.lock().clone()
    }

    /// Request asynchronous removal of every record. Completion is reported
    /// through the clear-all hook on the next drain pass.
    pub fn clear_all_records(&self) {
        self.clear_requested.store(true, Ordering::SeqCst);
        if let Some(hooks) = self.hooks() {
            hooks.signal_pending();
        }
    }

    /// Run `f` as an access to engine state, recording any overlap with
    /// another context doing the same.
    pub fn with_state<R>(&self, f: impl FnOnce() -> R) -> R {
        if self.occupants.fetch_add(1, Ordering::SeqCst) > 0 {
            self.overlaps.fetch_add(1, Ordering::SeqCst);
        }
        let result = f();
        self.occupants.fetch_sub(1, Ordering::SeqCst);
        result
    }

    pub fn inits(&self) -> u64 {
        self.inits.load(Ordering::SeqCst)
    }

    pub fn drain_passes(&self) -> u64 {
        self.drain_passes.load(Ordering::SeqCst)
    }

    /// Times two contexts were inside engine state at once
    pub fn overlaps(&self) -> u64 {
        self.overlaps.load(Ordering::SeqCst)
    }

    pub fn processed(&self) -> Vec<EngineWork> {
        self.processed.lock().clone()
    }

    pub fn queued(&self) -> usize {
        self.inbox.len()
    }

    /// Make subsequent drain passes stop on entry until resumed
    pub fn pause_drains(&self) {
        self.latch.lock().paused = true;
    }

    pub fn resume_drains(&self) {
        self.latch.lock().paused = false;
        self.latch_changed.notify_all();
    }

    /// Block until at least `count` drain passes have started
    pub fn wait_drains_entered(&self, count: u64) {
        let mut latch = self.latch.lock();
        while latch.entered < count {
            self.latch_changed.wait(&mut latch);
        }
    }

    fn enter_drain(&self) {
        let mut latch = self.latch.lock();
        latch.entered += 1;
        self.latch_changed.notify_all();
        while latch.paused {
            self.latch_changed.wait(&mut latch);
        }
    }

    fn finish_clear_all(&self) {
        if !self.clear_requested.swap(false, Ordering::SeqCst) {
            return;
        }
        self.records.lock().clear();
        if let Some(hooks) = self.hooks() {
            match hooks.notify_clear_all_complete() {
                Ok(outcome) => debug!(?outcome, "clear-all complete"),
                Err(e) => debug!(error = %e, "clear-all completion not delivered"),
            }
        }
    }
}

impl ProtocolEngine for SimulatedEngine {
    fn system_init(&self, hooks: EngineHooks) -> MeshResult<()> {
        self.inits.fetch_add(1, Ordering::SeqCst);
        if self.fail_init {
            return Err(MeshError::EngineInit("radio not present".into()));
        }
        self.hooks
            .set(hooks)
            .map_err(|_| MeshError::AlreadyInitialized)
    }

    fn process_pending(&self) {
        self.enter_drain();
        self.with_state(|| {
            let mut processed = self.processed.lock();
            while let Some(work) = self.inbox.pop() {
                processed.push(work);
            }
            drop(processed);
            self.finish_clear_all();
        });
        self.drain_passes.fetch_add(1, Ordering::SeqCst);
    }
}
