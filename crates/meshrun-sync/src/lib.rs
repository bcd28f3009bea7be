//! meshrun Sync - Synchronization primitives for the stack harness
//!
//! - [`EventFlags`]: saturating signal bits, settable from any context,
//!   drained by a single blocking waiter
//! - [`Gate`]: exclusion over protocol engine state, where release by a
//!   non-holder is a defined no-op
//! - [`Rendezvous`]: one-shot wait/notify for clear-all completion, present
//!   but disabled when the capability is off

pub mod flags;
pub mod gate;
pub mod rendezvous;

pub use flags::*;
pub use gate::*;
pub use rendezvous::*;
