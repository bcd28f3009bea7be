//! Event signal set
//!
//! Producers (threads and interrupt handlers) OR bits into a single atomic
//! word and unpark the bound waiter. The waiter swaps the word to zero, so
//! observation and clearing are one atomic step. Flags saturate: setting a
//! bit twice before a drain yields one observation.
//!
//! `set` takes no lock and never allocates. Its only side effects are one
//! atomic RMW, one fence, and an unpark of an already-registered thread
//! handle.

use std::sync::atomic::{fence, AtomicU32, Ordering};
use std::sync::OnceLock;
use std::thread::{self, Thread};

use bitflags::bitflags;
use meshrun_core::{ContextId, MeshError, MeshResult};

bitflags! {
    /// Named bits of the signal set
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct Signal: u32 {
        /// Work raised from a normal thread context
        const ACTIVITY_PENDING = 1 << 0;
        /// Work raised from interrupt context
        const ACTIVITY_PENDING_FROM_ISR = 1 << 1;
    }
}

struct Waiter {
    id: ContextId,
    thread: Thread,
}

/// Saturating flag container with a single blocking waiter
pub struct EventFlags {
    pending: AtomicU32,
    waiter: OnceLock<Waiter>,
}

impl EventFlags {
    pub const fn new() -> Self {
        EventFlags {
            pending: AtomicU32::new(0),
            waiter: OnceLock::new(),
        }
    }

    /// Mark `bits` pending and wake the waiter.
    ///
    /// Safe from any context, including interrupt handlers.
    #[inline]
    pub fn set(&self, bits: Signal) {
        if bits.is_empty() {
            return;
        }
        self.pending.fetch_or(bits.bits(), Ordering::SeqCst);
        // Pairs with the fence in `bind_waiter`: either we see the waiter,
        // or the waiter's first take sees our bits.
        fence(Ordering::SeqCst);
        if let Some(waiter) = self.waiter.get() {
            waiter.thread.unpark();
        }
    }

    /// Bind the calling thread as the only context allowed to wait.
    ///
    /// Binding again from the same thread is a no-op.
    pub fn bind_waiter(&self) -> MeshResult<()> {
        let me = ContextId::current();
        let waiter = self.waiter.get_or_init(|| Waiter {
            id: me,
            thread: thread::current(),
        });
        fence(Ordering::SeqCst);
        if waiter.id == me {
            Ok(())
        } else {
            Err(MeshError::NotWaiter)
        }
    }

    /// Identity of the bound waiter, if any
    pub fn waiter(&self) -> Option<ContextId> {
        self.waiter.get().map(|w| w.id)
    }

    /// Block until at least one bit is pending, then clear and return the
    /// pending bits.
    ///
    /// The first caller becomes the bound waiter. A wake that finds nothing
    /// pending returns [`MeshError::WaitInterrupted`]; the caller retries.
    pub fn wait_any_forever(&self) -> MeshResult<Signal> {
        self.bind_waiter()?;

        let bits = self.take();
        if !bits.is_empty() {
            return Ok(bits);
        }

        // A set that raced ahead of us left the park token behind, so this
        // returns immediately in that case.
        thread::park();

        let bits = self.take();
        if bits.is_empty() {
            Err(MeshError::WaitInterrupted)
        } else {
            Ok(bits)
        }
    }

    /// Clear and return the pending bits without blocking
    #[inline]
    pub fn take(&self) -> Signal {
        Signal::from_bits_truncate(self.pending.swap(0, Ordering::SeqCst))
    }

    /// Pending bits, without clearing them
    #[inline]
    pub fn pending(&self) -> Signal {
        Signal::from_bits_truncate(self.pending.load(Ordering::Acquire))
    }
}

impl Default for EventFlags {
    fn default() -> Self {
        Self::new()
    }
}
