//! Provenance store initialization
//!
//! Opens (or creates) the index database and applies the two-table schema.
//! Safe to call on every startup; all statements are idempotent.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Open the provenance store, creating the file and schema if needed.
pub async fn init_index_db(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new provenance store: {}", db_path.display());
    } else {
        info!("Opened existing provenance store: {}", db_path.display());
    }

    // Enforce the Study -> Patient reference
    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(&pool)
        .await?;

    create_patient_table(&pool).await?;
    create_study_table(&pool).await?;

    Ok(pool)
}

async fn create_patient_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS Patient (
            UID INTEGER PRIMARY KEY,
            PatientID TEXT NOT NULL UNIQUE,
            PatientName TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_study_table(pool: &SqlitePool) -> Result<()> {
    // Intentionally no uniqueness on StudyID: the store is an append-only
    // audit log and a re-run of the same date appends a second entry.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS Study (
            id INTEGER PRIMARY KEY,
            PatientUID INTEGER NOT NULL,
            StudyID TEXT NOT NULL,
            StudyInstanceUID TEXT NOT NULL,
            Modality TEXT NOT NULL,
            ImportedPath TEXT NOT NULL,
            ImportedDate TIMESTAMP,
            DirCount INTEGER NOT NULL,
            FilesCount INTEGER NOT NULL,
            ArchivePath TEXT NOT NULL,
            ArchiveDate TIMESTAMP,
            FOREIGN KEY (PatientUID) REFERENCES Patient(UID)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_study_patient ON Study(PatientUID)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_study_study_id ON Study(StudyID)")
        .execute(pool)
        .await?;

    Ok(())
}
