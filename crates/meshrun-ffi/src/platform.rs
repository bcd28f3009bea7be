#![allow(clippy::missing_safety_doc)]
//! FFI callbacks invoked by the protocol engine

use std::ffi::c_void;

use meshrun_runtime::{memory, registry};

/// Task-wake request from the engine's tasklet scheduler.
///
/// The instance pointer is unused: there is one engine per process.
#[no_mangle]
pub extern "C" fn mesh_tasklets_signal_pending(_instance: *mut c_void) {
    if let Some(manager) = registry::global() {
        manager.signal_activity_pending();
    }
}

/// Task-wake request from interrupt context. Lock-free, allocation-free.
#[no_mangle]
#[cfg_attr(feature = "ram-isr", link_section = ".text_in_ram")]
pub extern "C" fn mesh_sys_event_signal_pending() {
    if let Some(manager) = registry::global() {
        manager.signal_activity_pending_from_isr();
    }
}

/// Zeroed allocation through the platform memory façade
#[no_mangle]
pub extern "C" fn mesh_plat_calloc(num: usize, size: usize) -> *mut c_void {
    memory::calloc(num, size).cast()
}

/// Free through the platform memory façade
#[no_mangle]
pub unsafe extern "C" fn mesh_plat_free(ptr: *mut c_void) {
    memory::free(ptr.cast())
}
