//! Source metadata reader
//!
//! Joins the four viewer tables (Images, Series, Studies, Patients) into one
//! row per study. The joins run in memory with keep-first deduplication at
//! each stage, so the reader's output order follows the Studies table and
//! never contains two records with the same study id.

use chrono::NaiveDateTime;
use coldstore_common::Result;
use sqlx::SqlitePool;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use tracing::warn;

/// One archivable study, as selected from the source store.
///
/// Identifying fields here come from the metadata join and are used for
/// paths, archive naming, and logging. The archiver reads patient/instance
/// ids again from each file's own header; the two sources are deliberately
/// not reconciled.
#[derive(Debug, Clone)]
pub struct StudyRecord {
    pub patients_uid: i64,
    pub patients_name: String,
    pub patient_id: String,
    pub sop_instance_uid: String,
    pub study_instance_uid: String,
    pub series_instance_uid: String,
    pub study_id: String,
    pub modality: String,
    /// Raw filename token the source folder is derived from
    pub filename: String,
    /// Last-updated timestamp, the batch date filter key
    pub updated_at: NaiveDateTime,
}

/// Connect to the source store in read-only mode.
///
/// The batch job never writes to the viewer database; mode=ro makes that a
/// hard guarantee rather than a convention.
pub async fn connect_source(db_path: &Path) -> Result<SqlitePool> {
    if !db_path.exists() {
        return Err(coldstore_common::Error::NotFound(format!(
            "source store not found: {}",
            db_path.display()
        )));
    }

    let db_url = format!("sqlite://{}?mode=ro", db_path.display());
    let pool = SqlitePool::connect(&db_url).await?;
    Ok(pool)
}

/// Produce one deduplicated `StudyRecord` per distinct study id.
///
/// Join order: Images (deduplicated by series) → Series → Studies
/// (deduplicated by study instance) → Patients, then a final keep-first
/// deduplication by study id. Any query failure propagates; the orchestrator
/// treats it as "no rows" for the whole run.
pub async fn read_studies(pool: &SqlitePool) -> Result<Vec<StudyRecord>> {
    let images: Vec<(String, String, Option<String>, Option<String>)> = sqlx::query_as(
        "SELECT SeriesInstanceUID, SOPInstanceUID, Filename, DisplayedFieldsUpdatedTimestamp FROM Images",
    )
    .fetch_all(pool)
    .await?;

    let series: Vec<(String, String, Option<String>)> =
        sqlx::query_as("SELECT SeriesInstanceUID, StudyInstanceUID, Modality FROM Series")
            .fetch_all(pool)
            .await?;

    let studies: Vec<(String, String, i64)> =
        sqlx::query_as("SELECT StudyInstanceUID, StudyID, PatientsUID FROM Studies")
            .fetch_all(pool)
            .await?;

    let patients: Vec<(i64, String, String)> =
        sqlx::query_as("SELECT UID, PatientID, PatientsName FROM Patients")
            .fetch_all(pool)
            .await?;

    let series_by_uid: HashMap<&str, (&str, Option<&str>)> = series
        .iter()
        .map(|(series_uid, study_uid, modality)| {
            (series_uid.as_str(), (study_uid.as_str(), modality.as_deref()))
        })
        .collect();

    // Images deduplicated by series instance (keep first observed), joined
    // onto their series, then reduced to one representative row per study
    // instance. Image order decides which series represents a study.
    let mut seen_series: HashSet<&str> = HashSet::new();
    let mut row_by_study_uid: HashMap<&str, (&str, &str, &str, &str, &str)> = HashMap::new();
    for (series_uid, sop_uid, filename, raw_ts) in &images {
        if !seen_series.insert(series_uid.as_str()) {
            continue;
        }
        let Some((study_uid, modality)) = series_by_uid.get(series_uid.as_str()).copied() else {
            continue;
        };
        let Some(modality) = modality else {
            continue;
        };
        row_by_study_uid.entry(study_uid).or_insert((
            series_uid.as_str(),
            sop_uid.as_str(),
            filename.as_deref().unwrap_or(""),
            raw_ts.as_deref().unwrap_or(""),
            modality,
        ));
    }

    let patient_by_uid: HashMap<i64, (&str, &str)> = patients
        .iter()
        .map(|(uid, id, name)| (*uid, (id.as_str(), name.as_str())))
        .collect();

    // Walk the Studies table, join everything up, deduplicate by study id
    let mut seen_study_ids: HashSet<&str> = HashSet::new();
    let mut records = Vec::new();
    for (study_uid, study_id, patients_uid) in &studies {
        let Some((series_uid, sop_uid, filename, raw_ts, modality)) =
            row_by_study_uid.get(study_uid.as_str()).copied()
        else {
            continue;
        };
        let Some((patient_id, patients_name)) = patient_by_uid.get(patients_uid).copied() else {
            continue;
        };
        if !seen_study_ids.insert(study_id.as_str()) {
            continue;
        }
        if filename.is_empty() {
            warn!(study_id = %study_id, "study has no filename token, skipping");
            continue;
        }
        let Some(updated_at) = parse_timestamp(raw_ts) else {
            warn!(
                study_id = %study_id,
                timestamp = %raw_ts,
                "study has an unparseable update timestamp, skipping"
            );
            continue;
        };

        records.push(StudyRecord {
            patients_uid: *patients_uid,
            patients_name: patients_name.to_string(),
            patient_id: patient_id.to_string(),
            sop_instance_uid: sop_uid.to_string(),
            study_instance_uid: study_uid.clone(),
            series_instance_uid: series_uid.to_string(),
            study_id: study_id.clone(),
            modality: modality.to_string(),
            filename: filename.to_string(),
            updated_at,
        });
    }

    Ok(records)
}

/// The viewer stores timestamps as text, with or without fractional seconds.
fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S"))
        .ok()
}
