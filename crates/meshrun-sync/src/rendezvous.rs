//! One-shot completion handshake for clear-all requests
//!
//! A requester arms the rendezvous and blocks until the engine's completion
//! callback calls [`Rendezvous::notify_complete`]. A notify that finds
//! nobody armed is dropped, so a completion from an earlier cycle never
//! satisfies a later wait. Only one outstanding handshake is supported.
//!
//! [`Rendezvous::arm`] hands out a [`ClearAllTicket`] bound to one cycle.
//! Waiting consumes the ticket; dropping it unused abandons the cycle, along
//! with any completion it already received.
//!
//! A disabled rendezvous keeps the same interface and rejects every call
//! with [`MeshError::CapabilityDisabled`].

use parking_lot::{Condvar, Mutex};

use meshrun_core::{MeshError, MeshResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    Idle,
    Armed,
    Completed,
}

struct Cycle {
    phase: Phase,
    generation: u64,
}

/// Outcome of [`Rendezvous::notify_complete`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Notified {
    /// An armed waiter was released
    Completed,
    /// Nobody was armed; the notification was dropped
    NoWaiter,
}

pub struct Rendezvous {
    enabled: bool,
    cycle: Mutex<Cycle>,
    completed: Condvar,
}

impl Rendezvous {
    pub fn new(enabled: bool) -> Self {
        Rendezvous {
            enabled,
            cycle: Mutex::new(Cycle {
                phase: Phase::Idle,
                generation: 0,
            }),
            completed: Condvar::new(),
        }
    }

    pub fn disabled() -> Self {
        Self::new(false)
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn check_enabled(&self) -> MeshResult<()> {
        if self.enabled {
            Ok(())
        } else {
            Err(MeshError::CapabilityDisabled)
        }
    }

    /// Open a new cycle. Fails with [`MeshError::HandshakeInProgress`] while
    /// another cycle is outstanding.
    fn open_cycle(&self) -> MeshResult<u64> {
        self.check_enabled()?;
        let mut cycle = self.cycle.lock();
        if cycle.phase != Phase::Idle {
            return Err(MeshError::HandshakeInProgress);
        }
        cycle.phase = Phase::Armed;
        cycle.generation += 1;
        Ok(cycle.generation)
    }

    /// Block until cycle `generation` is notified, then reset to idle
    fn wait_cycle(&self, generation: u64) -> MeshResult<()> {
        let mut cycle = self.cycle.lock();
        loop {
            if cycle.generation != generation || cycle.phase == Phase::Idle {
                return Err(MeshError::Internal("clear-all cycle abandoned".into()));
            }
            match cycle.phase {
                Phase::Completed => {
                    cycle.phase = Phase::Idle;
                    return Ok(());
                }
                _ => self.completed.wait(&mut cycle),
            }
        }
    }

    /// Reset cycle `generation` if it is still the current one
    fn abandon_cycle(&self, generation: u64) {
        let mut cycle = self.cycle.lock();
        if cycle.generation == generation && cycle.phase != Phase::Idle {
            cycle.phase = Phase::Idle;
        }
    }

    /// Register interest before issuing the request, so a completion that
    /// arrives ahead of the wait is kept for this cycle only.
    pub fn arm(&self) -> MeshResult<ClearAllTicket<'_>> {
        let generation = self.open_cycle()?;
        Ok(ClearAllTicket {
            rendezvous: self,
            generation,
        })
    }

    /// Arm a fresh cycle and block until it is notified
    pub fn wait_until_complete(&self) -> MeshResult<()> {
        self.arm()?.wait()
    }

    /// Release the armed waiter, if any
    pub fn notify_complete(&self) -> MeshResult<Notified> {
        self.check_enabled()?;
        let mut cycle = self.cycle.lock();
        match cycle.phase {
            Phase::Armed => {
                cycle.phase = Phase::Completed;
                drop(cycle);
                self.completed.notify_all();
                Ok(Notified::Completed)
            }
            Phase::Idle | Phase::Completed => Ok(Notified::NoWaiter),
        }
    }

    /// True while a cycle is armed and not yet notified
    pub fn is_armed(&self) -> bool {
        self.cycle.lock().phase == Phase::Armed
    }

    /// True when no cycle is outstanding
    pub fn is_idle(&self) -> bool {
        self.cycle.lock().phase == Phase::Idle
    }
}

/// One armed clear-all cycle
///
/// [`wait`](Self::wait) consumes the ticket. Dropping it without waiting
/// resets the rendezvous, discarding a completion that already arrived.
#[must_use = "dropping the ticket abandons the clear-all cycle"]
pub struct ClearAllTicket<'a> {
    rendezvous: &'a Rendezvous,
    generation: u64,
}

impl ClearAllTicket<'_> {
    /// Block until this cycle is notified
    pub fn wait(self) -> MeshResult<()> {
        self.rendezvous.wait_cycle(self.generation)
    }
}

impl Drop for ClearAllTicket<'_> {
    fn drop(&mut self) {
        self.rendezvous.abandon_cycle(self.generation);
    }
}
