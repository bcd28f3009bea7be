//! Protocol engine seam and the hooks the engine calls back through

use std::sync::Arc;

use meshrun_core::MeshResult;
use meshrun_sync::{EventFlags, Notified, Rendezvous, Signal};

/// The wrapped protocol engine.
///
/// The engine's state is shared between the processing task and external
/// callers; the stack gate orders access to it. Implementations keep their
/// own memory safety (`Sync`), because gate acquisition is fail-open.
pub trait ProtocolEngine: Send + Sync + 'static {
    /// One-time system initialization. `hooks` is how the engine asks the
    /// harness for a drain pass and reports clear-all completion.
    fn system_init(&self, hooks: EngineHooks) -> MeshResult<()>;

    /// Process all pending work. Called with the stack gate held.
    fn process_pending(&self);
}

/// Typed callback handles handed to the engine at system init
#[derive(Clone)]
pub struct EngineHooks {
    flags: Arc<EventFlags>,
    rendezvous: Arc<Rendezvous>,
}

impl EngineHooks {
    pub(crate) fn new(flags: Arc<EventFlags>, rendezvous: Arc<Rendezvous>) -> Self {
        EngineHooks { flags, rendezvous }
    }

    /// Task-wake request from a normal thread context
    #[inline]
    pub fn signal_pending(&self) {
        self.flags.set(Signal::ACTIVITY_PENDING);
    }

    /// Task-wake request from interrupt context.
    ///
    /// Lock-free and allocation-free; never logs.
    #[inline]
    #[cfg_attr(feature = "ram-isr", link_section = ".text_in_ram")]
    pub fn signal_pending_from_isr(&self) {
        self.flags.set(Signal::ACTIVITY_PENDING_FROM_ISR);
    }

    /// Completion callback for a clear-all request
    pub fn notify_clear_all_complete(&self) -> MeshResult<Notified> {
        self.rendezvous.notify_complete()
    }
}
