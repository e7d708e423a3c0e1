//! coldstore-batch library interface
//!
//! Exposes the pipeline services for integration testing.

pub mod services;

pub use services::orchestrator::{Orchestrator, RunSummary};
