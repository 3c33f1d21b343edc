//! `parachute restore`
//!
//! Downloads an archive from an S3 remote, decrypts it when the object key
//! says so and unpacks it into a local directory.

use std::path::{Path, PathBuf};

use clap::Args;
use tracing::{info, warn};

use super::{require_passphrase, transfer_runtime, with_cleanup, RemoteArgs};
use crate::archive::naming::ENCRYPTED_SUFFIX;
use crate::archive::Archive;
use crate::config::Settings;
use crate::error::{ParachuteError, ParachuteResult};
use crate::transfer::{run_cancellable, RemoteLocation, S3Gateway, TransferGateway};

#[derive(Args, Debug, Clone, Default)]
pub struct RestoreArgs {
    /// Directory to restore into
    #[arg(value_name = "LOCAL")]
    pub destination: Option<PathBuf>,

    #[command(flatten)]
    pub remote: RemoteArgs,
}

/// Handle the restore command
pub fn handle_restore_command(settings: &Settings, args: RestoreArgs) -> ParachuteResult<()> {
    info!(destination = ?args.destination, "started restoring");

    let (destination, location) = validate_restore_input(settings, &args)?;
    settings.validate_s3()?;

    let runtime = transfer_runtime()?;
    let placed = runtime.block_on(async {
        let gateway = S3Gateway::new(&settings.s3_options());
        restore(&gateway, settings, &location, &destination).await
    })?;

    info!(destination = %placed.display(), "finished restore to destination");
    println!("Restored {} to {}", location, placed.display());
    Ok(())
}

/// Download `location` and unpack it into `destination`
pub async fn restore<G: TransferGateway>(
    gateway: &G,
    settings: &Settings,
    location: &RemoteLocation,
    destination: &Path,
) -> ParachuteResult<PathBuf> {
    let mut archive = Archive::from_remote_name(location.key())?;
    let result = download_and_place(gateway, &mut archive, settings, location, destination).await;
    with_cleanup(&mut archive, result)
}

async fn download_and_place<G: TransferGateway>(
    gateway: &G,
    archive: &mut Archive,
    settings: &Settings,
    location: &RemoteLocation,
    destination: &Path,
) -> ParachuteResult<PathBuf> {
    let artifact = archive.transfer_path();

    run_cancellable(
        gateway.download(location, &artifact),
        settings.transfer_timeout(),
    )
    .await?;
    archive.mark_transferred()?;

    if archive.is_encrypted() {
        archive.decrypt(&settings.passphrase)?;
    }

    archive.unpack()?;
    archive.place_into(destination, false)
}

fn validate_restore_input(
    settings: &Settings,
    args: &RestoreArgs,
) -> ParachuteResult<(PathBuf, RemoteLocation)> {
    let destination = args
        .destination
        .clone()
        .filter(|destination| !destination.as_os_str().is_empty())
        .ok_or_else(|| ParachuteError::validation("archive destination must be provided"))?;

    require_passphrase(settings)?;

    if !settings.encryption_enabled() {
        warn!("no encryption requested");
    }

    let remote = settings
        .remote
        .as_deref()
        .filter(|remote| !remote.is_empty())
        .ok_or_else(|| ParachuteError::validation("remote source must be provided"))?;

    let location = RemoteLocation::parse(remote)?;

    if location.is_encrypted() {
        if settings.passphrase.is_empty() {
            return Err(ParachuteError::validation(format!(
                "remote object contains encryption hint ({}) but passphrase is empty",
                ENCRYPTED_SUFFIX
            )));
        }
        if !settings.encryption_enabled() {
            warn!(
                remote,
                "remote object contains encryption hint ({}) but configured to 'not encrypt'",
                ENCRYPTED_SUFFIX
            );
        }
    }

    Ok((destination, location))
}
