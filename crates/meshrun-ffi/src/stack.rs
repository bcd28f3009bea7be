//! FFI stack lifecycle and locking

use std::cell::RefCell;
use std::ffi::c_int;

use tracing::error;

use meshrun_core::MeshResult;
use meshrun_runtime::{registry, ClearAllTicket, Notified};

use crate::error::result_to_int;

/// Initialize the installed stack manager
/// Returns 0 on success, negative on error
#[no_mangle]
pub extern "C" fn mesh_stack_init() -> c_int {
    result_to_int(registry::require().and_then(|manager| manager.init_stack()))
}

/// Start the processing task
/// Returns 0 on success, negative on error
#[no_mangle]
pub extern "C" fn mesh_stack_start_task() -> c_int {
    result_to_int(registry::require().and_then(|manager| manager.start_task()))
}

/// Take the stack gate. Failures are logged; the caller proceeds.
#[no_mangle]
pub extern "C" fn mesh_stack_lock() {
    match registry::require() {
        Ok(manager) => {
            // lock_stack logs its own failures.
            let _ = manager.lock_stack();
        }
        Err(e) => error!(error = %e, "mesh_stack_lock"),
    }
}

/// Release the stack gate. Releasing an unheld gate is a no-op.
#[no_mangle]
pub extern "C" fn mesh_stack_unlock() {
    if let Some(manager) = registry::global() {
        manager.unlock_stack();
    }
}

thread_local! {
    /// Cycle armed by this thread and not yet waited on
    static ARMED: RefCell<Option<ClearAllTicket<'static>>> = const { RefCell::new(None) };
}

/// Arm the clear-all handshake before issuing the request.
/// The same thread must then call `mesh_stack_wait_on_clear_all_complete`.
/// Arming again abandons the previous cycle armed by this thread.
#[no_mangle]
pub extern "C" fn mesh_stack_arm_clear_all() -> c_int {
    drop(ARMED.with(|slot| slot.borrow_mut().take()));
    let armed = registry::require().and_then(|manager| manager.arm_clear_all());
    match armed {
        Ok(ticket) => {
            ARMED.with(|slot| *slot.borrow_mut() = Some(ticket));
            0
        }
        Err(e) => result_to_int::<()>(Err(e)),
    }
}

/// Block until clear-all completes. Waits on the cycle this thread armed,
/// or arms a fresh one.
#[no_mangle]
pub extern "C" fn mesh_stack_wait_on_clear_all_complete() -> c_int {
    let armed = ARMED.with(|slot| slot.borrow_mut().take());
    let result = match armed {
        Some(ticket) => ticket.wait(),
        None => registry::require().and_then(|manager| manager.wait_on_clear_all_complete()),
    };
    result_to_int(result)
}

/// Signal clear-all completion
/// Returns 1 if a waiter was released, 0 if none was armed, negative on error
#[no_mangle]
pub extern "C" fn mesh_stack_notify_clear_all_complete() -> c_int {
    let result: MeshResult<Notified> =
        registry::require().and_then(|manager| manager.notify_clear_all_complete());
    match result {
        Ok(Notified::Completed) => 1,
        Ok(Notified::NoWaiter) => 0,
        Err(e) => result_to_int::<()>(Err(e)),
    }
}
