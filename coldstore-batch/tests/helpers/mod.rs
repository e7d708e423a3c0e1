//! Shared fixtures for pipeline integration tests

use dicom_core::{DataElement, PrimitiveValue, VR};
use dicom_dictionary_std::tags;
use dicom_object::meta::FileMetaTableBuilder;
use dicom_object::InMemDicomObject;
use sqlx::SqlitePool;
use std::path::Path;

/// Secondary Capture Image Storage; any real SOP class works for fixtures.
const SOP_CLASS_UID: &str = "1.2.840.10008.5.1.4.1.1.7";
const EXPLICIT_VR_LE: &str = "1.2.840.10008.1.2.1";

/// Write a minimal valid DICOM file carrying the two identifying fields the
/// archiver reads.
pub fn write_dicom_file(path: &Path, patient_id: &str, sop_instance_uid: &str) {
    let obj = InMemDicomObject::from_element_iter([
        DataElement::new(
            tags::SOP_CLASS_UID,
            VR::UI,
            PrimitiveValue::from(SOP_CLASS_UID),
        ),
        DataElement::new(
            tags::SOP_INSTANCE_UID,
            VR::UI,
            PrimitiveValue::from(sop_instance_uid),
        ),
        DataElement::new(tags::PATIENT_ID, VR::LO, PrimitiveValue::from(patient_id)),
        DataElement::new(tags::MODALITY, VR::CS, PrimitiveValue::from("CT")),
    ]);

    let file_obj = obj
        .with_meta(
            FileMetaTableBuilder::new()
                .transfer_syntax(EXPLICIT_VR_LE)
                .media_storage_sop_class_uid(SOP_CLASS_UID)
                .media_storage_sop_instance_uid(sop_instance_uid),
        )
        .expect("build file meta");
    file_obj.write_to_file(path).expect("write DICOM fixture");
}

/// Create an empty source store with the four viewer tables.
pub async fn create_source_db(path: &Path) -> SqlitePool {
    let db_url = format!("sqlite://{}?mode=rwc", path.display());
    let pool = SqlitePool::connect(&db_url).await.expect("create source db");

    sqlx::query(
        r#"
        CREATE TABLE Images (
            SeriesInstanceUID TEXT,
            SOPInstanceUID TEXT,
            Filename TEXT,
            DisplayedFieldsUpdatedTimestamp TEXT
        )
        "#,
    )
    .execute(&pool)
    .await
    .unwrap();

    sqlx::query(
        r#"
        CREATE TABLE Series (
            SeriesInstanceUID TEXT,
            StudyInstanceUID TEXT,
            Modality TEXT
        )
        "#,
    )
    .execute(&pool)
    .await
    .unwrap();

    sqlx::query(
        r#"
        CREATE TABLE Studies (
            StudyInstanceUID TEXT,
            StudyID TEXT,
            PatientsUID INTEGER
        )
        "#,
    )
    .execute(&pool)
    .await
    .unwrap();

    sqlx::query(
        r#"
        CREATE TABLE Patients (
            UID INTEGER,
            PatientID TEXT,
            PatientsName TEXT
        )
        "#,
    )
    .execute(&pool)
    .await
    .unwrap();

    pool
}

/// Everything needed to register one study across the four source tables.
pub struct SourceStudy<'a> {
    pub series_instance_uid: &'a str,
    pub sop_instance_uid: &'a str,
    pub filename: &'a str,
    pub updated_at: &'a str,
    pub study_instance_uid: &'a str,
    pub study_id: &'a str,
    pub modality: &'a str,
    pub patients_uid: i64,
    pub patient_id: &'a str,
    pub patients_name: &'a str,
}

pub async fn insert_study(pool: &SqlitePool, study: &SourceStudy<'_>) {
    sqlx::query("INSERT INTO Images VALUES (?, ?, ?, ?)")
        .bind(study.series_instance_uid)
        .bind(study.sop_instance_uid)
        .bind(study.filename)
        .bind(study.updated_at)
        .execute(pool)
        .await
        .unwrap();

    sqlx::query("INSERT INTO Series VALUES (?, ?, ?)")
        .bind(study.series_instance_uid)
        .bind(study.study_instance_uid)
        .bind(study.modality)
        .execute(pool)
        .await
        .unwrap();

    sqlx::query("INSERT INTO Studies VALUES (?, ?, ?)")
        .bind(study.study_instance_uid)
        .bind(study.study_id)
        .bind(study.patients_uid)
        .execute(pool)
        .await
        .unwrap();

    // Patients may already hold this row when two studies share a patient
    let exists: Option<(i64,)> = sqlx::query_as("SELECT UID FROM Patients WHERE UID = ?")
        .bind(study.patients_uid)
        .fetch_optional(pool)
        .await
        .unwrap();
    if exists.is_none() {
        sqlx::query("INSERT INTO Patients VALUES (?, ?, ?)")
            .bind(study.patients_uid)
            .bind(study.patient_id)
            .bind(study.patients_name)
            .execute(pool)
            .await
            .unwrap();
    }
}
