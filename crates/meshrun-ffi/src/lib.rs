#![allow(clippy::missing_safety_doc)]
//! meshrun FFI - Foreign Function Interface
//!
//! C-compatible entry points for the wrapped protocol engine and for the
//! platform bring-up code. All calls go through the process-wide manager
//! installed with `meshrun_runtime::registry::install`.

pub mod error;
pub mod platform;
pub mod stack;

use std::ffi::c_char;

pub use error::*;
pub use platform::*;
pub use stack::*;

/// Library version
#[no_mangle]
pub extern "C" fn mesh_version() -> *const c_char {
    static VERSION: &[u8] = b"0.2.0\0";
    VERSION.as_ptr() as *const c_char
}
