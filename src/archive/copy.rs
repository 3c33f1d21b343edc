//! File and directory copying used when placing final output

use std::fs;
use std::io;
use std::path::Path;

use walkdir::WalkDir;

use crate::error::{ParachuteError, ParachuteResult};

/// Copy a file, or a directory recursively, to `destination`
///
/// Directories are merged into an existing destination directory; files that
/// already exist there are overwritten.
pub fn copy(source: &Path, destination: &Path) -> ParachuteResult<()> {
    let metadata = fs::metadata(source)
        .map_err(|e| ParachuteError::Io(format!("Failed to stat {}: {}", source.display(), e)))?;

    if !metadata.is_dir() {
        if let Some(parent) = destination.parent() {
            create_dir_all(parent)?;
        }
        return copy_file(source, destination);
    }

    for entry in WalkDir::new(source).follow_links(true) {
        let entry = entry?;
        let relative = entry
            .path()
            .strip_prefix(source)
            .map_err(|_| ParachuteError::Io(format!("{} escaped the copy root", entry.path().display())))?;
        let target = destination.join(relative);

        if entry.file_type().is_dir() {
            create_dir_all(&target)?;
        } else {
            copy_file(entry.path(), &target)?;
        }
    }

    Ok(())
}

/// Move `source` to `destination`
///
/// Renames when the destination is free, otherwise (existing directory to
/// merge into, or a rename across file systems) copies and removes the
/// source afterwards.
pub fn relocate(source: &Path, destination: &Path) -> ParachuteResult<()> {
    if !destination.exists() {
        if let Some(parent) = destination.parent() {
            create_dir_all(parent)?;
        }
        if fs::rename(source, destination).is_ok() {
            return Ok(());
        }
    }

    copy(source, destination)?;
    remove_path(source)
}

/// Remove a file or directory tree; a missing path is not an error
pub fn remove_path(path: &Path) -> ParachuteResult<()> {
    let result = match fs::symlink_metadata(path) {
        Ok(metadata) if metadata.is_dir() => fs::remove_dir_all(path),
        Ok(_) => fs::remove_file(path),
        Err(e) => Err(e),
    };

    match result {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(ParachuteError::Io(format!(
            "Failed to remove {}: {}",
            path.display(),
            e
        ))),
    }
}

fn copy_file(source: &Path, destination: &Path) -> ParachuteResult<()> {
    fs::copy(source, destination).map(|_| ()).map_err(|e| {
        ParachuteError::Io(format!(
            "Failed to copy {} to {}: {}",
            source.display(),
            destination.display(),
            e
        ))
    })
}

fn create_dir_all(path: &Path) -> ParachuteResult<()> {
    fs::create_dir_all(path)
        .map_err(|e| ParachuteError::Io(format!("Failed to create {}: {}", path.display(), e)))
}
