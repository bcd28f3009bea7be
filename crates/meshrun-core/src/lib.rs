//! meshrun Core - Fundamental types shared by the stack harness
//!
//! This crate defines the types used throughout the harness:
//! - Execution-context identity (ContextId)
//! - Stack configuration (StackConfig)
//! - Task state and runtime statistics
//! - The error taxonomy

pub mod config;
pub mod error;
pub mod id;
pub mod stats;

pub use config::*;
pub use error::*;
pub use id::*;
pub use stats::*;
