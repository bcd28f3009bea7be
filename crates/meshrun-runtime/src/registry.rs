//! Process-wide stack manager registry
//!
//! The manager is installed once by bring-up code and lives for the rest of
//! the process. C entry points and engine shims reach it through
//! [`global`].

use std::sync::{Arc, OnceLock};

use tracing::info;

use meshrun_core::{MeshError, MeshResult};

use crate::manager::StackManager;

static MANAGER: OnceLock<Arc<StackManager>> = OnceLock::new();

/// Install `manager` as the process-wide instance
pub fn install(manager: Arc<StackManager>) -> MeshResult<&'static Arc<StackManager>> {
    MANAGER
        .set(manager)
        .map_err(|_| MeshError::AlreadyInitialized)?;
    info!("stack manager installed");
    MANAGER.get().ok_or(MeshError::NotInitialized)
}

/// The process-wide manager, if installed
#[inline]
pub fn global() -> Option<&'static Arc<StackManager>> {
    MANAGER.get()
}

/// The process-wide manager, or `NotInitialized`
pub fn require() -> MeshResult<&'static Arc<StackManager>> {
    global().ok_or(MeshError::NotInitialized)
}
