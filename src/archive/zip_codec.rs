//! Zip packing and unpacking
//!
//! Packing keeps every source as a top level entry of the container: names
//! are relative to the parent of each source root, so a directory `photos`
//! becomes `photos/`, `photos/a.jpg`, and so on.
//!
//! Unpacking validates every entry name before anything is written. An entry
//! that would land outside the target directory aborts the whole extraction.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter};
use std::path::{Component, Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::error::{ParachuteError, ParachuteResult};

/// Signature of a zip local file header
pub const LOCAL_HEADER_SIGNATURE: &[u8; 4] = b"PK\x03\x04";

/// Signature of an end of central directory record (empty archive)
pub const EMPTY_ARCHIVE_SIGNATURE: &[u8; 4] = b"PK\x05\x06";

/// Name of the "current directory" entry some tools emit
const CURRENT_DIR_ENTRY: &str = "./";

const DEFAULT_DIR_MODE: u32 = 0o755;
const DEFAULT_FILE_MODE: u32 = 0o644;

/// Pack `sources` into a new zip file at `target`
///
/// Each source is walked depth first, root included. Any failure aborts the
/// operation and may leave an incomplete file at `target`.
pub fn pack<P: AsRef<Path>>(sources: &[P], target: &Path) -> ParachuteResult<()> {
    let file = File::create(target).map_err(|e| {
        ParachuteError::Io(format!("Failed to create {}: {}", target.display(), e))
    })?;
    let mut writer = ZipWriter::new(BufWriter::new(file));

    for source in sources {
        let root = resolve_source(source.as_ref())?;
        let base = root.parent().unwrap_or(&root).to_path_buf();

        for entry in WalkDir::new(&root).follow_links(true).sort_by_file_name() {
            let entry = entry?;
            add_entry(&mut writer, &base, entry.path())?;
        }
    }

    writer.finish()?;
    Ok(())
}

/// Absolute path of `source` that keeps the name it was given
///
/// Only the parent directory is canonicalized, so a symlinked source is
/// archived under the link's name rather than its target's.
pub fn resolve_source(source: &Path) -> ParachuteResult<PathBuf> {
    let resolve_error = |e: io::Error| {
        ParachuteError::Io(format!("Failed to resolve source {}: {}", source.display(), e))
    };

    fs::metadata(source).map_err(resolve_error)?;

    match (source.parent(), source.file_name()) {
        (Some(parent), Some(name)) => {
            let parent = if parent.as_os_str().is_empty() {
                Path::new(".")
            } else {
                parent
            };
            Ok(fs::canonicalize(parent).map_err(resolve_error)?.join(name))
        }
        // `.`, `..` and `/` have no name of their own
        _ => fs::canonicalize(source).map_err(resolve_error),
    }
}

fn add_entry<W: io::Write + io::Seek>(
    writer: &mut ZipWriter<W>,
    base: &Path,
    path: &Path,
) -> ParachuteResult<()> {
    let metadata = fs::metadata(path)
        .map_err(|e| ParachuteError::Io(format!("Failed to stat {}: {}", path.display(), e)))?;

    let relative = path.strip_prefix(base).map_err(|_| {
        ParachuteError::Archive(format!(
            "{} is not below {}",
            path.display(),
            base.display()
        ))
    })?;
    let name = entry_name(relative);
    if name.is_empty() {
        return Ok(());
    }

    if metadata.is_dir() {
        let options = FileOptions::<()>::default()
            .compression_method(CompressionMethod::Stored)
            .unix_permissions(permissions_of(&metadata, DEFAULT_DIR_MODE));
        writer.add_directory(format!("{}/", name), options)?;
        return Ok(());
    }

    let options = FileOptions::<()>::default()
        .compression_method(CompressionMethod::Deflated)
        .unix_permissions(permissions_of(&metadata, DEFAULT_FILE_MODE))
        .large_file(metadata.len() >= u32::MAX as u64);
    writer.start_file(name.as_str(), options)?;

    let mut input = File::open(path)
        .map_err(|e| ParachuteError::Io(format!("Failed to open {}: {}", path.display(), e)))?;
    io::copy(&mut input, writer).map_err(|e| {
        ParachuteError::Io(format!("Failed to add {} to archive: {}", path.display(), e))
    })?;

    Ok(())
}

/// Zip entry names always use `/`, whatever the platform separator is
fn entry_name(relative: &Path) -> String {
    relative
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(unix)]
fn permissions_of(metadata: &fs::Metadata, _default: u32) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o7777
}

#[cfg(not(unix))]
fn permissions_of(_metadata: &fs::Metadata, default: u32) -> u32 {
    default
}

/// Unpack the zip file at `source` into `target_dir`
///
/// `target_dir` is removed and recreated first, so nothing is merged with
/// earlier content. Files partially extracted before an I/O failure stay on
/// disk.
pub fn unpack(source: &Path, target_dir: &Path) -> ParachuteResult<()> {
    let file = File::open(source)
        .map_err(|e| ParachuteError::Io(format!("Failed to open {}: {}", source.display(), e)))?;
    let mut archive = ZipArchive::new(file)
        .map_err(|e| ParachuteError::Archive(format!("Failed to read {}: {}", source.display(), e)))?;

    // Every name is checked before the first write.
    let mut plan = Vec::with_capacity(archive.len());
    for index in 0..archive.len() {
        let entry = archive.by_index_raw(index)?;
        let name = entry.name().to_string();
        if name == CURRENT_DIR_ENTRY {
            debug!(entry = %name, "skipping current directory entry");
            continue;
        }
        let relative = safe_relative_path(&name)?;
        plan.push((index, relative));
    }

    match fs::remove_dir_all(target_dir) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => {
            return Err(ParachuteError::Io(format!(
                "Failed to clear {}: {}",
                target_dir.display(),
                e
            )))
        }
    }
    create_dir(target_dir, DEFAULT_DIR_MODE)?;

    for (index, relative) in plan {
        let mut entry = archive.by_index(index)?;
        let output_path = target_dir.join(&relative);

        if entry.is_dir() {
            create_dir(&output_path, entry.unix_mode().unwrap_or(DEFAULT_DIR_MODE))?;
            continue;
        }

        if let Some(parent) = output_path.parent() {
            create_dir(parent, DEFAULT_DIR_MODE)?;
        }

        let mut output = open_truncated(&output_path, entry.unix_mode().unwrap_or(DEFAULT_FILE_MODE))?;
        io::copy(&mut entry, &mut output).map_err(|e| {
            ParachuteError::Io(format!("Failed to extract {}: {}", output_path.display(), e))
        })?;
    }

    Ok(())
}

/// Resolve an entry name to a path strictly below the extraction root
///
/// Rejects absolute names, drive prefixes, `..` climbing above the root and
/// names that resolve to the root itself.
fn safe_relative_path(name: &str) -> ParachuteResult<PathBuf> {
    let unsafe_entry = || ParachuteError::UnsafeEntry {
        entry: name.to_string(),
    };

    let mut resolved = PathBuf::new();
    for component in Path::new(name).components() {
        match component {
            Component::Normal(part) => resolved.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                if !resolved.pop() {
                    return Err(unsafe_entry());
                }
            }
            Component::RootDir | Component::Prefix(_) => return Err(unsafe_entry()),
        }
    }

    if resolved.as_os_str().is_empty() {
        return Err(unsafe_entry());
    }

    Ok(resolved)
}

#[cfg(unix)]
fn create_dir(path: &Path, mode: u32) -> ParachuteResult<()> {
    use std::os::unix::fs::DirBuilderExt;
    fs::DirBuilder::new()
        .recursive(true)
        .mode(mode & 0o7777)
        .create(path)
        .map_err(|e| ParachuteError::Io(format!("Failed to create {}: {}", path.display(), e)))
}

#[cfg(not(unix))]
fn create_dir(path: &Path, _mode: u32) -> ParachuteResult<()> {
    fs::create_dir_all(path)
        .map_err(|e| ParachuteError::Io(format!("Failed to create {}: {}", path.display(), e)))
}

#[cfg(unix)]
fn open_truncated(path: &Path, mode: u32) -> ParachuteResult<File> {
    use std::os::unix::fs::OpenOptionsExt;
    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(mode & 0o7777)
        .open(path)
        .map_err(|e| ParachuteError::Io(format!("Failed to create {}: {}", path.display(), e)))
}

#[cfg(not(unix))]
fn open_truncated(path: &Path, _mode: u32) -> ParachuteResult<File> {
    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
        .map_err(|e| ParachuteError::Io(format!("Failed to create {}: {}", path.display(), e)))
}

/// Whether the bytes start like a zip container
pub fn has_zip_signature(bytes: &[u8]) -> bool {
    bytes.starts_with(LOCAL_HEADER_SIGNATURE) || bytes.starts_with(EMPTY_ARCHIVE_SIGNATURE)
}
