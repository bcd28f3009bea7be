//! Execution-context identity
//!
//! Every thread that touches the harness gets a process-unique 64-bit id the
//! first time it asks for one. Ids are never reused, so a stale owner can
//! never alias a live one.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_CONTEXT: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static CURRENT: ContextId = ContextId(NEXT_CONTEXT.fetch_add(1, Ordering::Relaxed));
}

/// Opaque identity of an execution context (a thread)
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextId(u64);

impl ContextId {
    /// Identity of the calling thread
    #[inline]
    pub fn current() -> Self {
        CURRENT.with(|id| *id)
    }

    #[inline]
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Context({})", self.0)
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ctx#{}", self.0)
    }
}
