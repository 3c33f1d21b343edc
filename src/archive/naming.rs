//! Destination and name resolution
//!
//! Turns the loose hints a user gives (an output path, a source path, a
//! remote object key) into concrete file names and destination paths.

use std::env;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

use crate::error::{ParachuteError, ParachuteResult};

/// Suffix that marks an encrypted artifact, locally and remotely
pub const ENCRYPTED_SUFFIX: &str = ".enc";

/// Extension of packed artifacts
pub const ARCHIVE_EXTENSION: &str = ".zip";

/// Name used when no better name can be derived
pub const FALLBACK_NAME: &str = "archive";

/// Sortable, second precision timestamp format
const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// Resolve where an artifact should be written
///
/// - an empty `destination` means `<cwd>/<fallback_file_name>`
/// - an existing directory means `<destination>/<fallback_file_name>`
/// - a target that does not exist yet is returned as is
/// - an existing target is an error, unless `allow_increment` is set, in which
///   case the current timestamp is appended to the path
///
/// The timestamp has second precision, so two calls within the same second
/// can yield the same path.
pub fn resolve_destination(
    destination: &Path,
    fallback_file_name: &str,
    allow_increment: bool,
) -> ParachuteResult<PathBuf> {
    let mut target = if destination.as_os_str().is_empty() {
        env::current_dir()?.join(fallback_file_name)
    } else {
        destination.to_path_buf()
    };

    if !target.exists() {
        return Ok(target);
    }

    if target.is_dir() {
        target = target.join(fallback_file_name);
    }

    if !target.exists() {
        return Ok(target);
    }

    if !allow_increment {
        return Err(ParachuteError::DestinationExists { path: target });
    }

    let mut incremented = target.into_os_string();
    incremented.push(timestamp(&Local::now()));
    Ok(PathBuf::from(incremented))
}

/// Derive a base name from a path or object key
///
/// Returns `fallback` for an empty hint, otherwise the last path segment with
/// `suffix` cut from its end. No further sanitization is applied.
pub fn derive_base_name(hint: &str, fallback: &str, suffix: &str) -> String {
    if hint.is_empty() {
        return fallback.to_string();
    }

    let base = match Path::new(hint).file_name() {
        Some(name) => name.to_string_lossy().into_owned(),
        None => return fallback.to_string(),
    };

    if let Some(stripped) = base.strip_suffix(suffix) {
        return stripped.to_string();
    }

    base
}

/// Whether a file name or object key follows the encrypted naming convention
pub fn is_encrypted_name(name: &str) -> bool {
    name.ends_with(ENCRYPTED_SUFFIX)
}

/// Prefix a file name with a sortable timestamp
pub fn timed_file_name(name: &str, now: &DateTime<Local>) -> String {
    format!("{}-{}", timestamp(now), name)
}

fn timestamp(now: &DateTime<Local>) -> String {
    now.format(TIMESTAMP_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_derive_base_name_empty_hint() {
        assert_eq!(derive_base_name("", "archive", ".enc"), "archive");
    }

    #[test]
    fn test_derive_base_name_strips_suffix() {
        assert_eq!(
            derive_base_name("/a/b/report.zip.enc", "archive", ".enc"),
            "report.zip"
        );
        assert_eq!(
            derive_base_name("backups/2024/report.zip", "archive", ".zip"),
            "report"
        );
    }

    #[test]
    fn test_derive_base_name_keeps_unmatched_name() {
        assert_eq!(derive_base_name("notes.txt", "archive", ".enc"), "notes.txt");
        assert_eq!(derive_base_name("dir/", "archive", ".enc"), "dir");
    }

    #[test]
    fn test_derive_base_name_strips_once() {
        assert_eq!(derive_base_name("x.enc.enc", "archive", ".enc"), "x.enc");
    }

    #[test]
    fn test_derive_base_name_without_segment() {
        assert_eq!(derive_base_name("/", "archive", ".enc"), "archive");
    }

    #[test]
    fn test_is_encrypted_name() {
        assert!(is_encrypted_name("s3://bucket/backup.zip.enc"));
        assert!(!is_encrypted_name("s3://bucket/backup.zip"));
        assert!(!is_encrypted_name("backup.encrypted"));
    }

    #[test]
    fn test_timed_file_name() {
        let now = Local.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();
        assert_eq!(
            timed_file_name("archive.zip", &now),
            "20240309070501-archive.zip"
        );
    }

    #[test]
    fn test_resolve_missing_target_unchanged() {
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("out.zip");

        let resolved = resolve_destination(&target, "archive.zip", false).unwrap();
        assert_eq!(resolved, target);
    }

    #[test]
    fn test_resolve_existing_directory_joins_fallback() {
        let temp_dir = TempDir::new().unwrap();

        let resolved = resolve_destination(temp_dir.path(), "archive.zip", false).unwrap();
        assert_eq!(resolved, temp_dir.path().join("archive.zip"));
    }

    #[test]
    fn test_resolve_existing_file_without_increment_fails() {
        let temp_dir = TempDir::new().unwrap();
        let existing = temp_dir.path().join("archive.zip");
        fs::write(&existing, b"old").unwrap();

        let err = resolve_destination(&existing, "archive.zip", false).unwrap_err();
        assert!(matches!(err, ParachuteError::DestinationExists { .. }));
        assert!(err.to_string().contains("does already exist"));
    }

    #[test]
    fn test_resolve_existing_file_in_directory_fails() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("archive.zip"), b"old").unwrap();

        let result = resolve_destination(temp_dir.path(), "archive.zip", false);
        assert!(matches!(
            result,
            Err(ParachuteError::DestinationExists { .. })
        ));
    }

    #[test]
    fn test_resolve_existing_file_with_increment() {
        let temp_dir = TempDir::new().unwrap();
        let existing = temp_dir.path().join("archive.zip");
        fs::write(&existing, b"old").unwrap();

        let resolved = resolve_destination(&existing, "archive.zip", true).unwrap();
        assert_ne!(resolved, existing);

        let name = resolved.file_name().unwrap().to_string_lossy().into_owned();
        let suffix = name.strip_prefix("archive.zip").unwrap();
        assert_eq!(suffix.len(), 14);
        assert!(suffix.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_increment_is_not_unique_within_a_second() {
        // Known boundary: the suffix has second precision. Two resolutions in
        // quick succession usually collide; this only documents the format.
        let temp_dir = TempDir::new().unwrap();
        let existing = temp_dir.path().join("archive.zip");
        fs::write(&existing, b"old").unwrap();

        let first = resolve_destination(&existing, "archive.zip", true).unwrap();
        let second = resolve_destination(&existing, "archive.zip", true).unwrap();
        assert_eq!(first.parent(), second.parent());
        assert_eq!(
            first.as_os_str().len(),
            second.as_os_str().len()
        );
    }
}
