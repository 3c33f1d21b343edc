//! Archive lifecycle
//!
//! An [`Archive`] owns the temporary state of one pipeline run: a private
//! working directory below the system temp root and the logical name every
//! intermediate artifact is derived from.
//!
//! Outbound (pack, backup):
//! `Created -> Packed -> [Encrypted] -> Transferred | Placed -> CleanedUp`
//!
//! Inbound (unpack, restore):
//! `Created -> Transferred -> [Decrypted] -> Unpacked -> Placed -> CleanedUp`
//!
//! Every step checks the stage it runs in. The working directory is removed
//! by [`Archive::cleanup`], or when the value is dropped if cleanup never ran.

use std::fmt;
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};

use chrono::Local;
use tempfile::TempDir;
use tracing::{debug, warn};

use super::copy::{relocate, remove_path};
use super::naming::{
    derive_base_name, is_encrypted_name, resolve_destination, timed_file_name,
    ARCHIVE_EXTENSION, ENCRYPTED_SUFFIX, FALLBACK_NAME,
};
use super::zip_codec::{self, has_zip_signature, resolve_source};
use crate::crypto::{decrypt_file, encrypt_file};
use crate::error::{ParachuteError, ParachuteResult};

/// Prefix of every working directory
const WORKSPACE_PREFIX: &str = "parachute-";

/// Directory inside the workspace that receives unpacked content
const EXTRACT_DIR: &str = "extracted";

/// Lifecycle stage of an archive
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Created,
    Packed,
    Encrypted,
    Transferred,
    Decrypted,
    Unpacked,
    Placed,
    CleanedUp,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Created => "created",
            Stage::Packed => "packed",
            Stage::Encrypted => "encrypted",
            Stage::Transferred => "transferred",
            Stage::Decrypted => "decrypted",
            Stage::Unpacked => "unpacked",
            Stage::Placed => "placed",
            Stage::CleanedUp => "cleaned up",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    /// Local sources become a transferable artifact
    Outbound,
    /// A transferred artifact becomes local content
    Inbound,
}

/// One pipeline run's temporary state
#[derive(Debug)]
pub struct Archive {
    workspace: Option<TempDir>,
    root: PathBuf,
    name: String,
    encrypted: bool,
    direction: Direction,
    stage: Stage,
}

impl Archive {
    /// Pack local sources, and encrypt them when requested
    ///
    /// A single source names the archive after itself, several sources fall
    /// back to `archive`. On success the artifact waits at
    /// [`transfer_path`](Self::transfer_path).
    pub fn from_sources<P: AsRef<Path>>(
        sources: &[P],
        encryption_requested: bool,
        passphrase: &str,
    ) -> ParachuteResult<Self> {
        let name = match sources {
            [] => {
                return Err(ParachuteError::validation(
                    "source file or directory must be provided",
                ))
            }
            [single] => {
                let source = single.as_ref();
                let hint = resolve_source(source).unwrap_or_else(|_| source.to_path_buf());
                derive_base_name(&hint.to_string_lossy(), FALLBACK_NAME, "")
            }
            _ => FALLBACK_NAME.to_string(),
        };

        let mut archive = Self::allocate(name, encryption_requested, Direction::Outbound)?;
        archive.pack(sources)?;

        if encryption_requested {
            if passphrase.is_empty() {
                warn!("encrypting archive with an empty passphrase");
            }
            archive.encrypt(passphrase)?;
        }

        Ok(archive)
    }

    /// Prepare to receive a transferred artifact
    ///
    /// The logical name is the key's last segment without `.enc` and `.zip`.
    /// A key ending in `.enc` marks the artifact as encrypted.
    pub fn from_remote_name(remote_key: &str) -> ParachuteResult<Self> {
        let encrypted = is_encrypted_name(remote_key);
        let without_enc = derive_base_name(remote_key, FALLBACK_NAME, ENCRYPTED_SUFFIX);
        let name = derive_base_name(&without_enc, FALLBACK_NAME, ARCHIVE_EXTENSION);

        Self::allocate(name, encrypted, Direction::Inbound)
    }

    fn allocate(name: String, encrypted: bool, direction: Direction) -> ParachuteResult<Self> {
        let unusable = name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']);
        let name = if unusable {
            FALLBACK_NAME.to_string()
        } else {
            name
        };

        let workspace = tempfile::Builder::new()
            .prefix(WORKSPACE_PREFIX)
            .tempdir()
            .map_err(|e| {
                ParachuteError::Io(format!("Failed to create working directory: {}", e))
            })?;
        let root = workspace.path().to_path_buf();

        debug!(
            working_directory = %root.display(),
            name = %name,
            encrypted,
            "allocated archive workspace"
        );

        Ok(Self {
            workspace: Some(workspace),
            root,
            name,
            encrypted,
            direction,
            stage: Stage::Created,
        })
    }

    fn pack<P: AsRef<Path>>(&mut self, sources: &[P]) -> ParachuteResult<()> {
        self.expect_stage("pack", &[Stage::Created])?;

        let packed = self.packed_path();
        zip_codec::pack(sources, &packed)?;
        self.stage = Stage::Packed;

        debug!(archive = %packed.display(), "created temporary archive");
        Ok(())
    }

    fn encrypt(&mut self, passphrase: &str) -> ParachuteResult<()> {
        self.expect_stage("encrypt", &[Stage::Packed])?;

        let packed = self.packed_path();
        let encrypted = self.encrypted_path();
        encrypt_file(&packed, &encrypted, passphrase)?;
        remove_path(&packed)?;
        self.stage = Stage::Encrypted;

        debug!(archive = %encrypted.display(), "encrypted temporary archive");
        Ok(())
    }

    /// Record that the artifact at [`transfer_path`](Self::transfer_path) was
    /// uploaded (outbound) or downloaded (inbound)
    pub fn mark_transferred(&mut self) -> ParachuteResult<()> {
        match self.direction {
            Direction::Outbound => {
                self.expect_stage("transfer", &[Stage::Packed, Stage::Encrypted])?;
            }
            Direction::Inbound => {
                self.expect_stage("transfer", &[Stage::Created])?;
                let artifact = self.transfer_path();
                if !artifact.is_file() {
                    return Err(ParachuteError::Io(format!(
                        "transferred artifact {} is missing",
                        artifact.display()
                    )));
                }
            }
        }

        self.stage = Stage::Transferred;
        Ok(())
    }

    /// Copy a local archive file in place of a download
    pub fn import(&mut self, local_file: &Path) -> ParachuteResult<()> {
        if self.direction != Direction::Inbound {
            return Err(self.stage_error("import"));
        }
        self.expect_stage("import", &[Stage::Created])?;

        let artifact = self.transfer_path();
        fs::copy(local_file, &artifact).map_err(|e| {
            ParachuteError::Io(format!("Failed to read {}: {}", local_file.display(), e))
        })?;

        debug!(source = %local_file.display(), archive = %artifact.display(), "imported archive");
        self.mark_transferred()
    }

    /// Decrypt the transferred artifact into the packed artifact
    ///
    /// Fails for archives that are not encrypted. A result that is not a zip
    /// container is treated as a wrong passphrase and discarded.
    pub fn decrypt(&mut self, passphrase: &str) -> ParachuteResult<()> {
        if !self.encrypted {
            return Err(ParachuteError::Decryption(format!(
                "archive '{}' is not encrypted",
                self.name
            )));
        }
        self.expect_stage("decrypt", &[Stage::Transferred])?;
        if self.direction != Direction::Inbound {
            return Err(self.stage_error("decrypt"));
        }

        if passphrase.is_empty() {
            warn!("decrypting archive with an empty passphrase");
        }

        let packed = self.packed_path();
        decrypt_file(&self.encrypted_path(), &packed, passphrase)?;

        if !starts_with_zip_signature(&packed)? {
            remove_path(&packed)?;
            return Err(ParachuteError::Decryption(
                "decrypted data is not a zip archive: wrong passphrase or corrupted data"
                    .to_string(),
            ));
        }

        self.stage = Stage::Decrypted;
        debug!(archive = %packed.display(), "decrypted temporary archive");
        Ok(())
    }

    /// Unpack the plain artifact inside the working directory
    pub fn unpack(&mut self) -> ParachuteResult<()> {
        let ready = match (self.direction, self.stage, self.encrypted) {
            (Direction::Inbound, Stage::Transferred, false) => true,
            (Direction::Inbound, Stage::Decrypted, true) => true,
            _ => false,
        };
        if !ready {
            return Err(self.stage_error("unpack"));
        }

        let target = self.extract_root();
        zip_codec::unpack(&self.packed_path(), &target)?;
        self.stage = Stage::Unpacked;

        debug!(directory = %target.display(), "unpacked temporary archive");
        Ok(())
    }

    /// Move the result into `destination_dir` and return the final path
    ///
    /// Outbound archives place their artifact file as
    /// `<destination_dir>/[<timestamp>-]<name>.zip[.enc]`. Inbound archives
    /// place a single unpacked file next to the same rule, and merge an
    /// unpacked directory into `destination_dir` (or into a new timestamped
    /// folder when `timed_name` is set). Existing files are never replaced by
    /// a single-file placement.
    ///
    /// The unpacked layout depends on the logical name. When the archive's
    /// only top level entry carries that name (a directory `photos` backed up
    /// as `photos.zip.enc`), its contents land directly in `destination_dir`,
    /// giving `<destination_dir>/a.txt`. Otherwise every top level entry is
    /// kept, so the same folder stored as `daily.zip.enc` restores to
    /// `<destination_dir>/photos/a.txt`.
    pub fn place_into(&mut self, destination_dir: &Path, timed_name: bool) -> ParachuteResult<PathBuf> {
        match self.direction {
            Direction::Outbound => self.expect_stage(
                "place",
                &[Stage::Packed, Stage::Encrypted, Stage::Transferred],
            )?,
            Direction::Inbound => self.expect_stage("place", &[Stage::Unpacked])?,
        }

        let destination_dir = prepare_destination_dir(destination_dir)?;
        let source = match self.direction {
            Direction::Outbound => self.transfer_path(),
            Direction::Inbound => self.unpacked_path(),
        };

        let final_path = if source.is_dir() && self.direction == Direction::Inbound && !timed_name {
            relocate(&source, &destination_dir)?;
            destination_dir
        } else {
            let file_name = match source.file_name() {
                Some(name) if source != self.extract_root() => name.to_string_lossy().into_owned(),
                _ => self.name.clone(),
            };
            let file_name = if timed_name {
                timed_file_name(&file_name, &Local::now())
            } else {
                file_name
            };

            let target = resolve_destination(&destination_dir, &file_name, false)?;
            relocate(&source, &target)?;
            target
        };

        self.stage = Stage::Placed;
        debug!(destination = %final_path.display(), "placed archive content");
        Ok(final_path)
    }

    /// Remove every artifact and the working directory
    ///
    /// Each removal is attempted even if an earlier one failed; the first
    /// failure is returned. Paths that are already gone are fine, so this can
    /// run after a failure at any stage, and more than once.
    pub fn cleanup(&mut self) -> ParachuteResult<()> {
        if self.stage == Stage::CleanedUp {
            return Ok(());
        }

        let mut targets = Vec::with_capacity(4);
        if self.encrypted {
            targets.push(self.encrypted_path());
        }
        targets.push(self.packed_path());
        targets.push(self.extract_root());
        targets.push(self.root.clone());

        let mut first_error = None;
        for target in targets {
            if let Err(e) = remove_path(&target) {
                warn!(path = %target.display(), error = %e, "cleanup failed");
                first_error.get_or_insert(e);
            }
        }

        if let Some(err) = first_error {
            return Err(err);
        }

        self.workspace = None;
        self.stage = Stage::CleanedUp;
        debug!(working_directory = %self.root.display(), "cleaned up archive workspace");
        Ok(())
    }

    /// The artifact to upload, or the file to download into
    pub fn transfer_path(&self) -> PathBuf {
        if self.encrypted {
            self.encrypted_path()
        } else {
            self.packed_path()
        }
    }

    /// `<working dir>/<name>.zip`
    pub fn packed_path(&self) -> PathBuf {
        self.root.join(format!("{}{}", self.name, ARCHIVE_EXTENSION))
    }

    /// `<working dir>/<name>.zip.enc`
    pub fn encrypted_path(&self) -> PathBuf {
        self.root
            .join(format!("{}{}{}", self.name, ARCHIVE_EXTENSION, ENCRYPTED_SUFFIX))
    }

    /// Where unpacked content lives before placement
    ///
    /// Archives made from one source hold a single top level entry named like
    /// the archive; that entry is the content. Otherwise the whole extraction
    /// directory is.
    pub fn unpacked_path(&self) -> PathBuf {
        let root = self.extract_root();
        let named = root.join(&self.name);

        let single_entry = fs::read_dir(&root)
            .map(|entries| entries.count() == 1)
            .unwrap_or(false);

        if single_entry && named.exists() {
            named
        } else {
            root
        }
    }

    fn extract_root(&self) -> PathBuf {
        self.root.join(EXTRACT_DIR)
    }

    /// The working directory owned by this archive
    pub fn working_directory(&self) -> &Path {
        &self.root
    }

    /// Separator free name all artifact names derive from
    pub fn logical_name(&self) -> &str {
        &self.name
    }

    /// Whether the transfer artifact is encrypted
    pub fn is_encrypted(&self) -> bool {
        self.encrypted
    }

    /// Current lifecycle stage
    pub fn stage(&self) -> Stage {
        self.stage
    }

    fn expect_stage(&self, operation: &'static str, allowed: &[Stage]) -> ParachuteResult<()> {
        if allowed.contains(&self.stage) {
            Ok(())
        } else {
            Err(self.stage_error(operation))
        }
    }

    fn stage_error(&self, operation: &'static str) -> ParachuteError {
        ParachuteError::StageOrder {
            operation,
            stage: self.stage,
        }
    }
}

fn prepare_destination_dir(destination: &Path) -> ParachuteResult<PathBuf> {
    let destination = if destination.as_os_str().is_empty() {
        std::env::current_dir()?
    } else {
        destination.to_path_buf()
    };

    if destination.exists() && !destination.is_dir() {
        return Err(ParachuteError::DestinationExists { path: destination });
    }

    fs::create_dir_all(&destination).map_err(|e| {
        ParachuteError::Io(format!("Failed to create {}: {}", destination.display(), e))
    })?;

    Ok(destination)
}

fn starts_with_zip_signature(path: &Path) -> ParachuteResult<bool> {
    let mut head = Vec::with_capacity(4);
    File::open(path)
        .and_then(|file| file.take(4).read_to_end(&mut head))
        .map_err(|e| ParachuteError::Io(format!("Failed to read {}: {}", path.display(), e)))?;

    Ok(has_zip_signature(&head))
}
