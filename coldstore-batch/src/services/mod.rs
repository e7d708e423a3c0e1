//! Pipeline services
//!
//! Each stage of the archive-and-record pipeline lives in its own module:
//! metadata reading, path resolution, filesystem counting, archiving, and the
//! orchestrator that drives one batch run.

pub mod archiver;
pub mod fs_counter;
pub mod metadata_reader;
pub mod orchestrator;
pub mod path_resolver;
