//! Provenance store access layer

pub mod init;
pub mod provenance;

pub use init::init_index_db;
pub use provenance::{ensure_patient, record_archive, NewArchiveEntry};
