//! `parachute unpack`
//!
//! Extracts an (encrypted) archive file into a directory.

use std::path::{Path, PathBuf};

use clap::Args;
use tracing::info;

use super::with_cleanup;
use crate::archive::naming::is_encrypted_name;
use crate::archive::Archive;
use crate::config::Settings;
use crate::error::{ParachuteError, ParachuteResult};

#[derive(Args, Debug, Clone, Default)]
pub struct UnpackArgs {
    /// Archive file (`.zip` or `.zip.enc`)
    #[arg(value_name = "SOURCE")]
    pub source: Option<PathBuf>,

    /// Output directory (default: current directory)
    #[arg(short, long, env = "PARACHUTE_OUTPUT")]
    pub output: Option<PathBuf>,

    /// Place a directory archive into a new timestamped folder
    #[arg(long)]
    pub timed_name: bool,
}

/// Handle the unpack command
pub fn handle_unpack_command(settings: &Settings, args: UnpackArgs) -> ParachuteResult<()> {
    let source = validate_unpack_input(settings, &args)?;
    info!(source = %source.display(), "started unpacking");

    let destination = settings.output.clone().unwrap_or_default();
    let placed = unpack(settings, &source, &destination, args.timed_name)?;

    info!(destination = %placed.display(), "finished unpacking");
    println!("Unpacked data to {}", placed.display());
    Ok(())
}

/// Unpack the archive file `source` into `destination`
///
/// An archive whose name ends in `.enc` is decrypted first.
pub fn unpack(
    settings: &Settings,
    source: &Path,
    destination: &Path,
    timed_name: bool,
) -> ParachuteResult<PathBuf> {
    let mut archive = Archive::from_remote_name(&source.to_string_lossy())?;
    let result = extract(&mut archive, settings, source, destination, timed_name);
    with_cleanup(&mut archive, result)
}

fn extract(
    archive: &mut Archive,
    settings: &Settings,
    source: &Path,
    destination: &Path,
    timed_name: bool,
) -> ParachuteResult<PathBuf> {
    archive.import(source)?;
    if archive.is_encrypted() {
        archive.decrypt(&settings.passphrase)?;
    }
    archive.unpack()?;
    archive.place_into(destination, timed_name)
}

fn validate_unpack_input(settings: &Settings, args: &UnpackArgs) -> ParachuteResult<PathBuf> {
    let source = args
        .source
        .clone()
        .filter(|source| !source.as_os_str().is_empty())
        .ok_or_else(|| ParachuteError::validation("source archive must be provided"))?;

    if is_encrypted_name(&source.to_string_lossy()) && settings.passphrase.is_empty() {
        return Err(ParachuteError::validation("provided passphrase is empty"));
    }

    Ok(source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::pack::pack;
    use crate::crypto::SecureString;
    use std::fs;
    use tempfile::TempDir;

    fn settings_with(passphrase: &str) -> Settings {
        Settings {
            passphrase: SecureString::from(passphrase),
            ..Settings::default()
        }
    }

    #[test]
    fn test_validate_requires_source() {
        let err = validate_unpack_input(&settings_with("x"), &UnpackArgs::default()).unwrap_err();
        assert_eq!(err.to_string(), "source archive must be provided");
    }

    #[test]
    fn test_validate_encrypted_source_needs_passphrase() {
        let args = UnpackArgs {
            source: Some(PathBuf::from("backup.zip.enc")),
            ..UnpackArgs::default()
        };
        let err = validate_unpack_input(&settings_with(""), &args).unwrap_err();
        assert_eq!(err.to_string(), "provided passphrase is empty");

        let plain = UnpackArgs {
            source: Some(PathBuf::from("backup.zip")),
            ..UnpackArgs::default()
        };
        assert!(validate_unpack_input(&settings_with(""), &plain).is_ok());
    }

    #[test]
    fn test_pack_then_unpack() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("archive");
        fs::create_dir_all(&source).unwrap();
        fs::write(source.join("a.txt"), b"hello").unwrap();
        let settings = settings_with("secret");

        let packed_dir = temp_dir.path().join("D");
        let packed = pack(&settings, &[source], &packed_dir, false).unwrap();
        assert_eq!(packed, packed_dir.join("archive.zip.enc"));

        let restored = temp_dir.path().join("D2");
        unpack(&settings, &packed, &restored, false).unwrap();

        assert_eq!(fs::read(restored.join("a.txt")).unwrap(), b"hello");
    }

    #[test]
    fn test_unpack_with_wrong_passphrase() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("docs");
        fs::create_dir_all(&source).unwrap();
        fs::write(source.join("a.txt"), b"hello").unwrap();

        let packed = pack(&settings_with("secret"), &[source], temp_dir.path(), false).unwrap();

        let restored = temp_dir.path().join("restored");
        let err = unpack(&settings_with("guess"), &packed, &restored, false).unwrap_err();

        assert!(err.is_decryption());
        assert!(!restored.join("a.txt").exists());
    }

    #[test]
    fn test_unpack_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let result = unpack(
            &settings_with("secret"),
            &temp_dir.path().join("missing.zip.enc"),
            temp_dir.path(),
            false,
        );

        assert!(matches!(result, Err(ParachuteError::Io(_))));
    }
}
