//! FFI Error handling

use std::ffi::{c_char, c_int, CString};

use meshrun_core::MeshError;

/// Error codes for FFI functions
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeshErrorCode {
    /// Success
    Ok = 0,
    /// Invalid argument or configuration
    InvalidArgument = -1,
    /// Stack not initialized
    NotInitialized = -2,
    /// Already initialized
    AlreadyInitialized = -3,
    /// Out of memory
    OutOfMemory = -4,
    /// Processing task already started
    AlreadyStarted = -5,
    /// Stack gate could not be taken
    LockFailure = -6,
    /// Optional capability is disabled
    CapabilityDisabled = -7,
    /// Caller is not the processing task
    NotWaiter = -8,
    /// Wait returned with nothing pending
    WaitInterrupted = -9,
    /// A clear-all handshake is already outstanding
    HandshakeInProgress = -10,
    /// Internal error
    InternalError = -99,
}

impl From<MeshErrorCode> for c_int {
    fn from(code: MeshErrorCode) -> Self {
        code as c_int
    }
}

impl From<&MeshError> for MeshErrorCode {
    fn from(err: &MeshError) -> Self {
        match err {
            MeshError::NoMemory => MeshErrorCode::OutOfMemory,
            MeshError::Internal(_) | MeshError::EngineInit(_) => MeshErrorCode::InternalError,
            MeshError::InvalidConfig(_) => MeshErrorCode::InvalidArgument,
            MeshError::NotInitialized => MeshErrorCode::NotInitialized,
            MeshError::AlreadyInitialized => MeshErrorCode::AlreadyInitialized,
            MeshError::AlreadyStarted => MeshErrorCode::AlreadyStarted,
            MeshError::WaitInterrupted => MeshErrorCode::WaitInterrupted,
            MeshError::NotWaiter => MeshErrorCode::NotWaiter,
            MeshError::LockFailure(_) => MeshErrorCode::LockFailure,
            MeshError::CapabilityDisabled => MeshErrorCode::CapabilityDisabled,
            MeshError::HandshakeInProgress => MeshErrorCode::HandshakeInProgress,
        }
    }
}

thread_local! {
    static LAST_ERROR: std::cell::RefCell<Option<CString>> =
        const { std::cell::RefCell::new(None) };
}

/// Set the last error message
pub fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

/// Get the last error message
/// Returns NULL if no error
#[no_mangle]
pub extern "C" fn mesh_get_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match e.borrow().as_ref() {
        Some(s) => s.as_ptr(),
        None => std::ptr::null(),
    })
}

/// Clear the last error
#[no_mangle]
pub extern "C" fn mesh_clear_error() {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = None;
    });
}

/// Convert a harness result to a C int, recording the message on failure
pub fn result_to_int<T>(result: Result<T, MeshError>) -> c_int {
    match result {
        Ok(_) => MeshErrorCode::Ok.into(),
        Err(err) => {
            set_last_error(&err.to_string());
            MeshErrorCode::from(&err).into()
        }
    }
}
