//! Error types for the stack harness

use thiserror::Error;

/// Core harness errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MeshError {
    // Startup errors
    #[error("Out of memory while creating stack resources")]
    NoMemory,

    #[error("Internal fault: {0}")]
    Internal(String),

    #[error("Protocol engine initialization failed: {0}")]
    EngineInit(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // Lifecycle errors
    #[error("Stack not initialized")]
    NotInitialized,

    #[error("Stack already initialized")]
    AlreadyInitialized,

    #[error("Processing task already started")]
    AlreadyStarted,

    // Primitive errors
    #[error("Wait interrupted without a pending signal")]
    WaitInterrupted,

    #[error("Only the processing task may wait on the signal set")]
    NotWaiter,

    #[error("Lock failure: {0}")]
    LockFailure(String),

    #[error("Capability disabled")]
    CapabilityDisabled,

    #[error("Clear-all handshake already in progress")]
    HandshakeInProgress,
}

impl MeshError {
    /// Transient errors are recovered locally and never abort bring-up
    pub fn is_transient(&self) -> bool {
        matches!(self, MeshError::WaitInterrupted)
    }

    /// Errors that abort stack bring-up when returned from init/start
    pub fn is_fatal_to_startup(&self) -> bool {
        matches!(
            self,
            MeshError::NoMemory
                | MeshError::Internal(_)
                | MeshError::EngineInit(_)
                | MeshError::InvalidConfig(_)
        )
    }
}

/// Result type for harness operations
pub type MeshResult<T> = Result<T, MeshError>;
