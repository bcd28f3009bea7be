//! Stack manager - lifecycle, processing task, and stack gate
//!
//! Lifecycle: `new` (Created) → `init_stack` (Initializing: primitives are
//! created and the engine is initialized) → `start_task` (the processing
//! task alternates Waiting ⇄ Draining for the life of the process).

use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{debug, error, info, trace, warn};

use meshrun_core::{MeshError, MeshResult, RuntimeStats, StackConfig, TaskState};
use meshrun_sync::{ClearAllTicket, EventFlags, Gate, Notified, Released, Rendezvous, Signal};

use crate::engine::{EngineHooks, ProtocolEngine};

/// Primitives created once during `init_stack`
struct Primitives {
    flags: Arc<EventFlags>,
    gate: Gate,
    rendezvous: Arc<Rendezvous>,
}

#[derive(Default)]
struct StatsCounters {
    wakeups: AtomicU64,
    interrupted_waits: AtomicU64,
    drain_passes: AtomicU64,
    lock_failures: AtomicU64,
    tolerated_releases: AtomicU64,
    last_drain_nanos: AtomicU64,
}

impl StatsCounters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> RuntimeStats {
        RuntimeStats {
            wakeups: self.wakeups.load(Ordering::Relaxed),
            interrupted_waits: self.interrupted_waits.load(Ordering::Relaxed),
            drain_passes: self.drain_passes.load(Ordering::Relaxed),
            lock_failures: self.lock_failures.load(Ordering::Relaxed),
            tolerated_releases: self.tolerated_releases.load(Ordering::Relaxed),
            last_drain_duration: Duration::from_nanos(
                self.last_drain_nanos.load(Ordering::Relaxed),
            ),
        }
    }
}

/// Owner of the processing task, signal set, stack gate, and clear-all
/// rendezvous for one protocol engine
pub struct StackManager {
    engine: Arc<dyn ProtocolEngine>,
    config: StackConfig,
    primitives: OnceLock<Primitives>,
    state: AtomicU8,
    stats: StatsCounters,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl StackManager {
    pub fn new(engine: Arc<dyn ProtocolEngine>, config: StackConfig) -> Arc<Self> {
        Arc::new(StackManager {
            engine,
            config,
            primitives: OnceLock::new(),
            state: AtomicU8::new(TaskState::Created as u8),
            stats: StatsCounters::default(),
            task: Mutex::new(None),
        })
    }

    pub fn config(&self) -> &StackConfig {
        &self.config
    }

    pub fn task_state(&self) -> TaskState {
        TaskState::from_u8(self.state.load(Ordering::Acquire)).unwrap_or(TaskState::Created)
    }

    fn set_state(&self, state: TaskState) {
        self.state.store(state as u8, Ordering::Release);
    }

    pub fn stats(&self) -> RuntimeStats {
        self.stats.snapshot()
    }

    pub fn is_initialized(&self) -> bool {
        self.primitives.get().is_some()
    }

    fn primitives(&self) -> MeshResult<&Primitives> {
        self.primitives.get().ok_or(MeshError::NotInitialized)
    }

    /// Create the primitives and run the engine's one-time system init.
    ///
    /// A failure leaves the manager in `Created` with nothing installed.
    pub fn init_stack(&self) -> MeshResult<()> {
        self.config.validate()?;

        self.state
            .compare_exchange(
                TaskState::Created as u8,
                TaskState::Initializing as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .map_err(|_| MeshError::AlreadyInitialized)?;

        let primitives = Primitives {
            flags: Arc::new(EventFlags::new()),
            gate: Gate::new(),
            rendezvous: Arc::new(Rendezvous::new(self.config.clear_all_handshake)),
        };
        let hooks = EngineHooks::new(
            Arc::clone(&primitives.flags),
            Arc::clone(&primitives.rendezvous),
        );

        if let Err(e) = self.engine.system_init(hooks) {
            error!(error = %e, "protocol engine system init failed");
            self.set_state(TaskState::Created);
            return Err(e);
        }

        if self.primitives.set(primitives).is_err() {
            return Err(MeshError::Internal("stack primitives already set".into()));
        }

        info!(
            clear_all_handshake = self.config.clear_all_handshake,
            "stack initialized"
        );
        Ok(())
    }

    /// Spawn the dedicated processing task
    pub fn start_task(self: &Arc<Self>) -> MeshResult<()> {
        self.primitives()?;

        let mut task = self.task.lock();
        if task.is_some() {
            return Err(MeshError::AlreadyStarted);
        }

        let manager = Arc::clone(self);
        let handle = thread::Builder::new()
            .name(self.config.task_name.clone())
            .stack_size(self.config.task_stack_size)
            .spawn(move || manager.task_main())
            .map_err(|e| {
                error!(error = %e, "failed to spawn processing task");
                MeshError::NoMemory
            })?;
        *task = Some(handle);

        info!(
            name = %self.config.task_name,
            priority = self.config.task_priority,
            stack_size = self.config.task_stack_size,
            "processing task started"
        );
        Ok(())
    }

    pub fn is_task_started(&self) -> bool {
        self.task.lock().is_some()
    }

    fn task_main(&self) {
        let flags = match self.primitives() {
            Ok(primitives) => Arc::clone(&primitives.flags),
            Err(e) => {
                error!(error = %e, "processing task started without primitives");
                return;
            }
        };
        if let Err(e) = flags.bind_waiter() {
            error!(error = %e, "processing task could not bind the signal set");
            return;
        }

        info!("processing task running");
        loop {
            self.set_state(TaskState::Waiting);
            match flags.wait_any_forever() {
                Ok(bits) => {
                    StatsCounters::bump(&self.stats.wakeups);
                    trace!(?bits, "processing task woke");
                }
                Err(e) if e.is_transient() => {
                    StatsCounters::bump(&self.stats.interrupted_waits);
                    continue;
                }
                Err(e) => {
                    warn!(error = %e, "signal wait failed");
                    continue;
                }
            }

            self.set_state(TaskState::Draining);
            self.drain_pass();
        }
    }

    /// One engine drain pass under the stack gate
    fn drain_pass(&self) {
        let start = Instant::now();

        // Fail-open: a failed acquire is already logged by lock_stack, and
        // the drain proceeds without exclusion.
        let guard = self.stack_guard().ok();
        self.engine.process_pending();
        drop(guard);

        let elapsed = start.elapsed();
        let nanos = u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX);
        self.stats.last_drain_nanos.store(nanos, Ordering::Relaxed);
        StatsCounters::bump(&self.stats.drain_passes);
        debug!(elapsed_us = elapsed.as_micros() as u64, "drain pass complete");
    }

    /// Signal pending engine work from a normal thread context.
    ///
    /// Dropped before `init_stack`, when no signal set exists yet.
    pub fn signal_activity_pending(&self) {
        if let Some(primitives) = self.primitives.get() {
            primitives.flags.set(Signal::ACTIVITY_PENDING);
        }
    }

    /// Signal pending engine work from interrupt context
    #[inline]
    #[cfg_attr(feature = "ram-isr", link_section = ".text_in_ram")]
    pub fn signal_activity_pending_from_isr(&self) {
        if let Some(primitives) = self.primitives.get() {
            primitives.flags.set(Signal::ACTIVITY_PENDING_FROM_ISR);
        }
    }

    /// Hooks for the engine, available after `init_stack`
    pub fn hooks(&self) -> MeshResult<EngineHooks> {
        let primitives = self.primitives()?;
        Ok(EngineHooks::new(
            Arc::clone(&primitives.flags),
            Arc::clone(&primitives.rendezvous),
        ))
    }

    /// Take the stack gate.
    ///
    /// Failures are logged and counted. Callers that proceed anyway, as the
    /// processing task does, run without exclusion.
    pub fn lock_stack(&self) -> MeshResult<()> {
        let result = self
            .primitives()
            .map_err(|_| MeshError::LockFailure("stack not initialized".into()))
            .and_then(|primitives| primitives.gate.acquire());

        if let Err(e) = &result {
            StatsCounters::bump(&self.stats.lock_failures);
            error!(error = %e, "lock_stack failed");
        }
        result
    }

    /// Release the stack gate. Releasing a gate the caller does not hold is
    /// tolerated and reported as [`Released::NotHeld`].
    pub fn unlock_stack(&self) -> Released {
        let released = match self.primitives.get() {
            Some(primitives) => primitives.gate.release(),
            None => Released::NotHeld,
        };
        if released == Released::NotHeld {
            StatsCounters::bump(&self.stats.tolerated_releases);
            debug!("unlock_stack by a context not holding the gate");
        }
        released
    }

    /// Scoped stack gate acquisition
    pub fn stack_guard(&self) -> MeshResult<StackGuard<'_>> {
        self.lock_stack()?;
        Ok(StackGuard {
            manager: self,
            _not_send: PhantomData,
        })
    }

    /// True if the calling context holds the stack gate
    pub fn is_stack_locked_by_current(&self) -> bool {
        self.primitives
            .get()
            .map(|p| p.gate.is_held_by_current())
            .unwrap_or(false)
    }

    /// Arm the clear-all handshake ahead of issuing the request.
    ///
    /// Wait on the returned ticket; dropping it abandons the cycle.
    pub fn arm_clear_all(&self) -> MeshResult<ClearAllTicket<'_>> {
        let ticket = self.primitives()?.rendezvous.arm();
        if let Err(e) = &ticket {
            warn!(error = %e, "arm_clear_all rejected");
        }
        ticket
    }

    /// Arm a fresh cycle and block until the engine reports clear-all
    /// completion
    pub fn wait_on_clear_all_complete(&self) -> MeshResult<()> {
        let result = self.primitives()?.rendezvous.wait_until_complete();
        if let Err(e) = &result {
            warn!(error = %e, "wait_on_clear_all_complete rejected");
        }
        result
    }

    /// True while a clear-all cycle is armed and not yet notified
    pub fn is_clear_all_armed(&self) -> bool {
        self.primitives
            .get()
            .map(|p| p.rendezvous.is_armed())
            .unwrap_or(false)
    }

    /// Release the clear-all waiter
    pub fn notify_clear_all_complete(&self) -> MeshResult<Notified> {
        let notified = self.primitives()?.rendezvous.notify_complete()?;
        if notified == Notified::NoWaiter {
            warn!("clear-all completion with no armed waiter dropped");
        }
        Ok(notified)
    }
}

/// Holds the stack gate until dropped
///
/// Dropped on the acquiring thread only; the guard is not `Send`.
///
/// ```compile_fail
/// fn assert_send<T: Send>() {}
/// assert_send::<meshrun_runtime::StackGuard<'static>>();
/// ```
#[must_use = "the stack gate is released as soon as the guard is dropped"]
pub struct StackGuard<'a> {
    manager: &'a StackManager,
    _not_send: PhantomData<*const ()>,
}

impl Drop for StackGuard<'_> {
    fn drop(&mut self) {
        self.manager.unlock_stack();
    }
}
