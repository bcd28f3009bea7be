//! meshrun Test Harness - Simulated engine and stack bring-up helpers
//!
//! This crate provides:
//! - A simulated protocol engine with an internal work queue
//! - Exclusion checking for engine state access
//! - A started-stack harness for integration tests and benches

pub mod engine;
pub mod harness;

pub use engine::*;
pub use harness::*;
