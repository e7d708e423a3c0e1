//! Batch run orchestration
//!
//! Drives one calendar date's worth of studies through the pipeline: select
//! rows due on the run date, resolve each source folder, count its contents,
//! archive it, and record provenance. Rows are processed strictly one at a
//! time; a row failure is logged and the batch continues.

use crate::services::archiver::{archive_study, ArchiveError, ArchiveOutcome, ArchiveRequest};
use crate::services::fs_counter::{count_folders_and_files, CountError};
use crate::services::metadata_reader::{connect_source, read_studies, StudyRecord};
use crate::services::path_resolver::resolve_source_prefix;
use chrono::{Local, NaiveDate};
use coldstore_common::db::{record_archive, NewArchiveEntry};
use coldstore_common::Config;
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{debug, error, info};

/// Only study folders under this hot-area subtree are archived; everything
/// else in the viewer's file list is non-DICOM working data.
const DICOM_SUBTREE: &str = "dicom";

/// Any failure that is scoped to a single study row.
#[derive(Debug, Error)]
pub enum RowError {
    #[error(transparent)]
    Count(#[from] CountError),

    #[error(transparent)]
    Archive(#[from] ArchiveError),

    #[error(transparent)]
    Record(#[from] coldstore_common::Error),
}

/// Totals for one batch run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// Rows archived and recorded
    pub processed: usize,
    /// Rows that hit a row-scoped failure
    pub failed: usize,
    /// Rows skipped before any side effect (no resolvable DICOM folder)
    pub skipped: usize,
}

/// One-per-process pipeline driver.
pub struct Orchestrator {
    config: Config,
    index_pool: SqlitePool,
}

impl Orchestrator {
    pub fn new(config: Config, index_pool: SqlitePool) -> Self {
        Self { config, index_pool }
    }

    /// Process every study whose last-updated timestamp falls on `date`.
    ///
    /// A source store failure ends the run with a zero summary; per-row
    /// failures are logged and the batch continues. Never panics, never
    /// returns an error: failures are visible through the log stream and the
    /// summary only.
    pub async fn run(&self, date: NaiveDate) -> RunSummary {
        let records = match self.load_records().await {
            Ok(records) => records,
            Err(e) => {
                error!("Failed to read source metadata: {}", e);
                return RunSummary::default();
            }
        };

        let due: Vec<&StudyRecord> = records
            .iter()
            .filter(|r| r.updated_at.date() == date)
            .collect();
        info!(
            date = %date,
            total = records.len(),
            due = due.len(),
            "selected studies for run date"
        );

        let mut summary = RunSummary::default();
        for record in due {
            match self.process_row(record, date).await {
                Ok(Some(_)) => {
                    summary.processed += 1;
                }
                Ok(None) => {
                    summary.skipped += 1;
                }
                Err(e) => {
                    error!(
                        study_id = %record.study_id,
                        patient_id = %record.patient_id,
                        error = %e,
                        "study archiving failed"
                    );
                    summary.failed += 1;
                }
            }
        }

        summary
    }

    /// Convenience wrapper: run for today's date.
    pub async fn run_today(&self) -> RunSummary {
        self.run(Local::now().date_naive()).await
    }

    async fn load_records(&self) -> coldstore_common::Result<Vec<StudyRecord>> {
        let source_pool = connect_source(&self.config.source_db).await?;
        let records = read_studies(&source_pool).await;
        source_pool.close().await;
        records
    }

    /// Take one row through count → archive → record.
    ///
    /// `Ok(None)` means the row was skipped before any side effect.
    async fn process_row(
        &self,
        record: &StudyRecord,
        date: NaiveDate,
    ) -> Result<Option<ArchiveOutcome>, RowError> {
        let Some(prefix) = resolve_source_prefix(&record.filename) else {
            debug!(
                study_id = %record.study_id,
                filename = %record.filename,
                "filename token has no resolvable folder, skipping"
            );
            return Ok(None);
        };
        if !prefix.contains(DICOM_SUBTREE) {
            debug!(
                study_id = %record.study_id,
                prefix = %prefix,
                "source folder outside the dicom subtree, skipping"
            );
            return Ok(None);
        }

        let source_dir = self.config.root_dir.join(&prefix);

        // Audit counts are taken before any per-file filtering
        let (dir_count, files_count) = count_folders_and_files(&source_dir)?;

        let outcome = archive_study(&ArchiveRequest {
            source_dir: &source_dir,
            output_dir: &self.config.output_dir,
            patient_id: &record.patient_id,
            patient_name: &record.patients_name,
            modality: &record.modality,
            study_id: &record.study_id,
            date,
        })?;

        let archive_path = outcome.zip_path.display().to_string();
        let imported_path = source_dir.display().to_string();
        record_archive(
            &self.index_pool,
            &NewArchiveEntry {
                patient_id: &record.patient_id,
                patient_name: &record.patients_name,
                study_id: &record.study_id,
                study_instance_uid: &record.study_instance_uid,
                modality: &record.modality,
                imported_path: &imported_path,
                imported_date: record.updated_at,
                dir_count: dir_count as i64,
                files_count: files_count as i64,
                archive_path: &archive_path,
                archive_date: Local::now().naive_local(),
            },
        )
        .await?;

        info!(
            filename = %record.filename,
            patient_id = %record.patient_id,
            patient_name = %record.patients_name,
            study_id = %record.study_id,
            dir_count = dir_count,
            files_count = files_count,
            archive = %outcome.zip_path.display(),
            files_copied = outcome.files_copied,
            files_skipped = outcome.files_skipped,
            imported = %record.updated_at,
            "archived study"
        );

        Ok(Some(outcome))
    }
}
