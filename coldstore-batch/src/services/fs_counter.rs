//! Recursive folder/file counting
//!
//! Produces the audit counts recorded alongside each archive entry. Counts
//! cover every nesting level, not just the immediate children.

use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

/// Filesystem counter errors
#[derive(Debug, Error)]
pub enum CountError {
    /// Specified path does not exist
    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    /// Path exists but is not a directory
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),
}

/// Count subdirectories and files under `directory`, recursively.
///
/// Returns `(total_subdirectories, total_files)`. The root itself is not
/// counted. Unreadable entries are logged and skipped rather than aborting
/// the count.
pub fn count_folders_and_files(directory: &Path) -> Result<(u64, u64), CountError> {
    if !directory.exists() {
        return Err(CountError::PathNotFound(directory.to_path_buf()));
    }
    if !directory.is_dir() {
        return Err(CountError::NotADirectory(directory.to_path_buf()));
    }

    let mut total_folders = 0u64;
    let mut total_files = 0u64;

    for entry in WalkDir::new(directory).min_depth(1) {
        match entry {
            Ok(entry) => {
                if entry.file_type().is_dir() {
                    total_folders += 1;
                } else if entry.file_type().is_file() {
                    total_files += 1;
                }
            }
            Err(e) => {
                tracing::warn!("Error accessing entry: {}", e);
            }
        }
    }

    Ok((total_folders, total_files))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn counts_nested_folders_and_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("a/b")).unwrap();
        fs::create_dir_all(dir.path().join("c")).unwrap();
        fs::write(dir.path().join("top.txt"), b"x").unwrap();
        fs::write(dir.path().join("a/mid.txt"), b"x").unwrap();
        fs::write(dir.path().join("a/b/deep.txt"), b"x").unwrap();

        let (folders, files) = count_folders_and_files(dir.path()).unwrap();
        assert_eq!(folders, 3);
        assert_eq!(files, 3);
    }

    #[test]
    fn empty_directory_counts_zero() {
        let dir = tempfile::tempdir().unwrap();
        let (folders, files) = count_folders_and_files(dir.path()).unwrap();
        assert_eq!((folders, files), (0, 0));
    }

    #[test]
    fn missing_path_is_an_error() {
        let result = count_folders_and_files(Path::new("/nonexistent/coldstore-count"));
        match result {
            Err(CountError::PathNotFound(_)) => {}
            other => panic!("Expected PathNotFound, got {:?}", other),
        }
    }

    #[test]
    fn file_path_is_not_a_directory() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("plain.txt");
        fs::write(&file, b"x").unwrap();

        let result = count_folders_and_files(&file);
        match result {
            Err(CountError::NotADirectory(_)) => {}
            other => panic!("Expected NotADirectory, got {:?}", other),
        }
    }
}
