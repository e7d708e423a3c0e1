//! Source folder resolution
//!
//! The viewer's `Filename` column holds paths relative to the hot-area root.
//! Only the first two segments identify a study's source folder; the rest is
//! per-file structure the walker discovers on its own.

/// Extract the first two slash-delimited segments of `filename`, with the
/// internal separator doubled (`a/b/c` → `a//b`).
///
/// Returns `None` when the input has fewer than two segments; callers must
/// not use a missing result as a filesystem path.
pub fn resolve_source_prefix(filename: &str) -> Option<String> {
    let mut parts = filename.splitn(3, '/');
    let first = parts.next().filter(|s| !s.is_empty())?;
    let second = parts.next().filter(|s| !s.is_empty())?;
    Some(format!("{}//{}", first, second))
}
