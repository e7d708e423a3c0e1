//! Study archiving: staging copy, ZIP compression, staging cleanup
//!
//! Walks a study's source folder, copies every readable DICOM file into a
//! per-patient, per-date staging directory under a name prefixed with the
//! file's own SOP instance UID (original filenames may collide across
//! subfolders), compresses the staging directory into the destination ZIP,
//! and removes the staging tree.
//!
//! Identifying fields are read from each file's header rather than trusted
//! from the metadata join; the join may be stale relative to file contents.

use chrono::NaiveDate;
use dicom_core::Tag;
use dicom_dictionary_std::tags;
use dicom_object::{DefaultDicomObject, OpenFileOptions};
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Archiver errors
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// Source folder missing or not a directory
    #[error("Source folder not found: {0}")]
    SourceNotFound(PathBuf),

    /// Walk finished without staging a single file
    #[error("No readable DICOM files under {0}")]
    NothingStaged(PathBuf),

    /// ZIP write error
    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// General I/O error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Identifying fields and locations for one study's archive run.
#[derive(Debug, Clone)]
pub struct ArchiveRequest<'a> {
    /// Study source folder (absolute)
    pub source_dir: &'a Path,
    /// Destination root the date-named subfolder goes under
    pub output_dir: &'a Path,
    pub patient_id: &'a str,
    pub patient_name: &'a str,
    pub modality: &'a str,
    pub study_id: &'a str,
    /// Date used for the staging directory and the destination subfolder
    pub date: NaiveDate,
}

/// Result of a successful archive run.
#[derive(Debug, Clone)]
pub struct ArchiveOutcome {
    /// Final ZIP location
    pub zip_path: PathBuf,
    /// Files copied into staging and compressed
    pub files_copied: usize,
    /// Files skipped because their header could not be read
    pub files_skipped: usize,
}

/// Copy, compress, and clean up one study.
///
/// Per-file read failures are logged and skipped; everything else is a row
/// failure for the caller to handle. Once the staging tree is deleted there
/// is no rollback.
pub fn archive_study(request: &ArchiveRequest<'_>) -> Result<ArchiveOutcome, ArchiveError> {
    if !request.source_dir.is_dir() {
        return Err(ArchiveError::SourceNotFound(request.source_dir.to_path_buf()));
    }

    let formatted_date = request.date.format("%d_%m_%Y").to_string();
    let patient_root = request.source_dir.join(request.patient_name);
    let staging_dir = patient_root.join(&formatted_date);

    let mut files_copied = 0usize;
    let mut files_skipped = 0usize;

    // The staging tree lives inside the source folder; exclude it from the
    // walk so staged copies are not copied again.
    let walker = WalkDir::new(request.source_dir)
        .min_depth(1)
        .into_iter()
        .filter_entry(|e| e.path() != patient_root);

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Error accessing entry: {}", e);
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        match read_dicom_identity(entry.path()) {
            Ok((file_patient_id, sop_instance_uid)) => {
                fs::create_dir_all(&staging_dir)?;
                let file_name = entry.file_name().to_string_lossy();
                let staged = staging_dir.join(format!("{}_{}", sop_instance_uid, file_name));
                fs::copy(entry.path(), &staged)?;
                debug!(
                    file = %entry.path().display(),
                    patient_id = %file_patient_id,
                    "staged file"
                );
                files_copied += 1;
            }
            Err(reason) => {
                warn!(
                    file = %entry.path().display(),
                    reason = %reason,
                    "skipping unreadable file"
                );
                files_skipped += 1;
            }
        }
    }

    if !staging_dir.is_dir() {
        return Err(ArchiveError::NothingStaged(request.source_dir.to_path_buf()));
    }

    let day_dir = request.output_dir.join(&formatted_date);
    fs::create_dir_all(&day_dir)?;
    let zip_name = format!(
        "{} {} {} {}.zip",
        request.patient_id.replace('/', "_"),
        request.patient_name,
        request.modality,
        request.study_id
    );
    let zip_path = day_dir.join(zip_name);
    zip_directory(&staging_dir, &zip_path)?;

    // All dates for this patient under the source folder go away together
    fs::remove_dir_all(&patient_root)?;

    Ok(ArchiveOutcome {
        zip_path,
        files_copied,
        files_skipped,
    })
}

/// Read the two identifying header fields, stopping before pixel data.
fn read_dicom_identity(path: &Path) -> Result<(String, String), String> {
    let obj = OpenFileOptions::new()
        .read_until(tags::PIXEL_DATA)
        .open_file(path)
        .map_err(|e| format!("failed to open: {}", e))?;

    let patient_id = text_element(&obj, tags::PATIENT_ID)?;
    let sop_instance_uid = text_element(&obj, tags::SOP_INSTANCE_UID)?;
    Ok((patient_id, sop_instance_uid))
}

/// DICOM text values carry trailing padding (space or NUL); strip it.
fn text_element(obj: &DefaultDicomObject, tag: Tag) -> Result<String, String> {
    let element = obj
        .element(tag)
        .map_err(|e| format!("missing element {}: {}", tag, e))?;
    let value = element
        .to_str()
        .map_err(|e| format!("unreadable element {}: {}", tag, e))?;
    Ok(value.trim_end_matches([' ', '\0']).to_string())
}

/// Compress the staging directory tree into `zip_path` (deflate).
fn zip_directory(staging_dir: &Path, zip_path: &Path) -> Result<(), ArchiveError> {
    let file = File::create(zip_path)?;
    let mut writer = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for entry in WalkDir::new(staging_dir).min_depth(1) {
        let entry = entry.map_err(io::Error::from)?;
        let Ok(relative) = entry.path().strip_prefix(staging_dir) else {
            continue;
        };
        let name = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        if entry.file_type().is_dir() {
            writer.add_directory(name, options)?;
        } else if entry.file_type().is_file() {
            writer.start_file(name, options)?;
            let mut source = File::open(entry.path())?;
            io::copy(&mut source, &mut writer)?;
        }
    }

    writer.finish()?;
    Ok(())
}
