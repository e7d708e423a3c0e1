//! Provenance recording
//!
//! Writes the durable record of what was archived, when, and where: one
//! `Patient` row per natural patient id and one `Study` row per processed
//! study. Rows are only ever inserted; nothing here updates or deletes.

use crate::Result;
use chrono::NaiveDateTime;
use sqlx::SqlitePool;
use tracing::debug;

/// All fields of one study archive entry, as recorded after a successful
/// copy + compress.
#[derive(Debug, Clone)]
pub struct NewArchiveEntry<'a> {
    pub patient_id: &'a str,
    pub patient_name: &'a str,
    pub study_id: &'a str,
    pub study_instance_uid: &'a str,
    pub modality: &'a str,
    /// Source folder at import time
    pub imported_path: &'a str,
    /// Last-updated timestamp from the source metadata
    pub imported_date: NaiveDateTime,
    pub dir_count: i64,
    pub files_count: i64,
    /// Final ZIP location
    pub archive_path: &'a str,
    pub archive_date: NaiveDateTime,
}

/// Look up a patient by natural id, inserting the row if absent.
///
/// Returns the surrogate `UID`. Repeated calls with the same `patient_id`
/// always return the same id; the display name of an existing row is left
/// untouched.
pub async fn ensure_patient(
    pool: &SqlitePool,
    patient_id: &str,
    patient_name: &str,
) -> Result<i64> {
    let existing: Option<(i64,)> = sqlx::query_as("SELECT UID FROM Patient WHERE PatientID = ?")
        .bind(patient_id)
        .fetch_optional(pool)
        .await?;

    if let Some((uid,)) = existing {
        return Ok(uid);
    }

    let result = sqlx::query("INSERT INTO Patient (PatientID, PatientName) VALUES (?, ?)")
        .bind(patient_id)
        .bind(patient_name)
        .execute(pool)
        .await?;

    let uid = result.last_insert_rowid();
    debug!(patient_id = %patient_id, uid = uid, "created patient row");
    Ok(uid)
}

/// Insert one `Study` row for `entry`, creating the referenced `Patient` row
/// first if this is the patient's first archive.
///
/// Returns the surrogate id of the new entry. There is no update path:
/// recording the same study id twice appends a second row.
pub async fn record_archive(pool: &SqlitePool, entry: &NewArchiveEntry<'_>) -> Result<i64> {
    let patient_uid = ensure_patient(pool, entry.patient_id, entry.patient_name).await?;

    let result = sqlx::query(
        r#"
        INSERT INTO Study (
            PatientUID, StudyID, StudyInstanceUID, Modality,
            ImportedPath, ImportedDate, DirCount, FilesCount,
            ArchivePath, ArchiveDate
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(patient_uid)
    .bind(entry.study_id)
    .bind(entry.study_instance_uid)
    .bind(entry.modality)
    .bind(entry.imported_path)
    .bind(entry.imported_date)
    .bind(entry.dir_count)
    .bind(entry.files_count)
    .bind(entry.archive_path)
    .bind(entry.archive_date)
    .execute(pool)
    .await?;

    debug!(
        study_id = %entry.study_id,
        patient_uid = patient_uid,
        "recorded archive entry"
    );

    Ok(result.last_insert_rowid())
}
