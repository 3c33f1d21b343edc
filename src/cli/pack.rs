//! `parachute pack`
//!
//! Packs local files and directories into an (encrypted) archive file.

use std::path::{Path, PathBuf};

use clap::Args;
use tracing::info;

use super::{require_passphrase, with_cleanup};
use crate::archive::Archive;
use crate::config::Settings;
use crate::error::{ParachuteError, ParachuteResult};

#[derive(Args, Debug, Clone, Default)]
pub struct PackArgs {
    /// Files or directories to pack
    #[arg(value_name = "SOURCE")]
    pub sources: Vec<PathBuf>,

    /// Output directory (default: current directory)
    #[arg(short, long, env = "PARACHUTE_OUTPUT")]
    pub output: Option<PathBuf>,

    /// Prefix the archive name with a timestamp
    #[arg(long)]
    pub timed_name: bool,
}

/// Handle the pack command
pub fn handle_pack_command(settings: &Settings, args: PackArgs) -> ParachuteResult<()> {
    info!(sources = ?args.sources, "started packing");

    validate_pack_input(settings, &args)?;

    let destination = settings.output.clone().unwrap_or_default();
    let archive_path = pack(settings, &args.sources, &destination, args.timed_name)?;

    info!(destination = %archive_path.display(), "finished packing");
    println!("Packed data to {}", archive_path.display());
    Ok(())
}

/// Pack `sources` and place the archive file into `destination`
///
/// Returns the path of the placed archive.
pub fn pack(
    settings: &Settings,
    sources: &[PathBuf],
    destination: &Path,
    timed_name: bool,
) -> ParachuteResult<PathBuf> {
    let mut archive =
        Archive::from_sources(sources, settings.encryption_enabled(), &settings.passphrase)?;

    let result = archive.place_into(destination, timed_name);
    with_cleanup(&mut archive, result)
}

fn validate_pack_input(settings: &Settings, args: &PackArgs) -> ParachuteResult<()> {
    if args.sources.is_empty() {
        return Err(ParachuteError::validation(
            "source file or directory must be provided",
        ));
    }

    require_passphrase(settings)
}
