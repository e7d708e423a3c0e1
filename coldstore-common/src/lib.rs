//! # Coldstore Common Library
//!
//! Shared code for the coldstore archiving pipeline:
//! - Error types
//! - Configuration resolution
//! - Provenance store schema and queries

pub mod config;
pub mod db;
pub mod error;

pub use config::Config;
pub use error::{Error, Result};
