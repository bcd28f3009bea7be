//! Mutual exclusion gate over protocol engine state
//!
//! The gate is a tri-state owner record (`Free` or `HeldBy(ctx)`) behind a
//! short-held mutex, with a condvar for contended acquirers. Unlike a plain
//! mutex, `release` from a context that does not hold the gate is a defined
//! no-op: the processing task's drain cycle and an external unlock-on-error
//! path may both release, and that race is benign.

use std::marker::PhantomData;

use parking_lot::{Condvar, Mutex};

use meshrun_core::{ContextId, MeshError, MeshResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum GateState {
    Free,
    HeldBy(ContextId),
}

/// Outcome of [`Gate::release`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Released {
    /// The caller held the gate and it is now free
    Freed,
    /// The caller did not hold the gate; nothing changed
    NotHeld,
}

impl Released {
    #[inline]
    pub fn was_held(self) -> bool {
        self == Released::Freed
    }
}

/// Owner-tracking, non-reentrant exclusion gate
pub struct Gate {
    state: Mutex<GateState>,
    freed: Condvar,
}

impl Gate {
    pub fn new() -> Self {
        Gate {
            state: Mutex::new(GateState::Free),
            freed: Condvar::new(),
        }
    }

    /// Block until the gate is free, then take it for the calling context.
    ///
    /// Acquiring a gate the caller already holds is a programming error and
    /// returns [`MeshError::LockFailure`] instead of deadlocking.
    pub fn acquire(&self) -> MeshResult<()> {
        let me = ContextId::current();
        let mut state = self.state.lock();
        loop {
            match *state {
                GateState::Free => {
                    *state = GateState::HeldBy(me);
                    return Ok(());
                }
                GateState::HeldBy(owner) if owner == me => {
                    return Err(MeshError::LockFailure(format!(
                        "reentrant acquire by {me}"
                    )));
                }
                GateState::HeldBy(_) => self.freed.wait(&mut state),
            }
        }
    }

    /// Take the gate only if it is free right now
    pub fn try_acquire(&self) -> bool {
        let mut state = self.state.lock();
        if *state == GateState::Free {
            *state = GateState::HeldBy(ContextId::current());
            true
        } else {
            false
        }
    }

    /// Free the gate if the calling context holds it.
    ///
    /// Never fails. A release by a non-holder, or of a free gate, reports
    /// [`Released::NotHeld`].
    pub fn release(&self) -> Released {
        let me = ContextId::current();
        let mut state = self.state.lock();
        match *state {
            GateState::HeldBy(owner) if owner == me => {
                *state = GateState::Free;
                drop(state);
                self.freed.notify_one();
                Released::Freed
            }
            _ => Released::NotHeld,
        }
    }

    /// Scoped acquisition; the gate is released when the guard drops
    pub fn guard(&self) -> MeshResult<GateGuard<'_>> {
        self.acquire()?;
        Ok(GateGuard {
            gate: self,
            _not_send: PhantomData,
        })
    }

    /// Current holder, if any
    pub fn holder(&self) -> Option<ContextId> {
        match *self.state.lock() {
            GateState::Free => None,
            GateState::HeldBy(owner) => Some(owner),
        }
    }

    pub fn is_held_by_current(&self) -> bool {
        self.holder() == Some(ContextId::current())
    }
}

impl Default for Gate {
    fn default() -> Self {
        Self::new()
    }
}

/// Holds a [`Gate`] until dropped
///
/// The gate is owned by the acquiring context, so the guard cannot leave
/// that thread:
///
/// ```compile_fail
/// use meshrun_sync::Gate;
///
/// let gate = Gate::new();
/// let guard = gate.guard().unwrap();
/// std::thread::scope(|s| {
///     s.spawn(move || drop(guard));
/// });
/// ```
#[must_use = "the gate is released as soon as the guard is dropped"]
pub struct GateGuard<'a> {
    gate: &'a Gate,
    _not_send: PhantomData<*const ()>,
}

impl Drop for GateGuard<'_> {
    fn drop(&mut self) {
        self.gate.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_acquire_release() {
        let gate = Gate::new();
        gate.acquire().unwrap();
        assert!(gate.is_held_by_current());
        assert_eq!(gate.release(), Released::Freed);
        assert_eq!(gate.holder(), None);
    }

    #[test]
    fn test_release_without_acquire_is_tolerated() {
        let gate = Gate::new();
        assert_eq!(gate.release(), Released::NotHeld);
        assert_eq!(gate.release(), Released::NotHeld);
        assert!(gate.try_acquire());
    }

    #[test]
    fn test_double_release_is_tolerated() {
        let gate = Gate::new();
        gate.acquire().unwrap();
        assert!(gate.release().was_held());
        assert!(!gate.release().was_held());
    }

    #[test]
    fn test_release_by_non_holder_keeps_gate_held() {
        let gate = Arc::new(Gate::new());
        gate.acquire().unwrap();

        let outcome = {
            let gate = Arc::clone(&gate);
            thread::spawn(move || gate.release()).join().unwrap()
        };

        assert_eq!(outcome, Released::NotHeld);
        assert!(gate.is_held_by_current());
        assert_eq!(gate.release(), Released::Freed);
    }

    #[test]
    fn test_reentrant_acquire_fails_instead_of_deadlocking() {
        let gate = Gate::new();
        gate.acquire().unwrap();
        assert!(matches!(gate.acquire(), Err(MeshError::LockFailure(_))));
        assert!(gate.is_held_by_current());
        gate.release();
    }

    #[test]
    fn test_second_acquire_blocks_until_release() {
        let gate = Arc::new(Gate::new());
        gate.acquire().unwrap();

        let contender = {
            let gate = Arc::clone(&gate);
            thread::spawn(move || {
                gate.acquire().unwrap();
                gate.release()
            })
        };

        thread::sleep(Duration::from_millis(20));
        assert!(!contender.is_finished());
        assert!(!gate.try_acquire());

        gate.release();
        assert_eq!(contender.join().unwrap(), Released::Freed);
    }

    #[test]
    fn test_guard_releases_on_early_return() {
        fn fallible(gate: &Gate) -> MeshResult<()> {
            let _guard = gate.guard()?;
            Err(MeshError::Internal("engine busy".into()))
        }

        let gate = Gate::new();
        assert!(fallible(&gate).is_err());
        assert_eq!(gate.holder(), None);
    }

    #[test]
    fn test_guard_dropped_by_acquirer_frees_for_other_thread() {
        let gate = Arc::new(Gate::new());
        let guard = gate.guard().unwrap();

        let contender = {
            let gate = Arc::clone(&gate);
            thread::spawn(move || {
                let _guard = gate.guard().unwrap();
                gate.is_held_by_current()
            })
        };
        thread::sleep(Duration::from_millis(10));
        assert!(!contender.is_finished());

        drop(guard);
        assert!(contender.join().unwrap());
        assert_eq!(gate.holder(), None);
    }

    #[test]
    fn test_mutual_exclusion_across_threads() {
        let gate = Arc::new(Gate::new());
        let inside = Arc::new(AtomicUsize::new(0));

        let workers: Vec<_> = (0..4)
            .map(|_| {
                let gate = Arc::clone(&gate);
                let inside = Arc::clone(&inside);
                thread::spawn(move || {
                    for _ in 0..200 {
                        let _guard = gate.guard().unwrap();
                        assert_eq!(inside.fetch_add(1, Ordering::SeqCst), 0);
                        inside.fetch_sub(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();

        for worker in workers {
            worker.join().unwrap();
        }
        assert_eq!(gate.holder(), None);
    }
}
