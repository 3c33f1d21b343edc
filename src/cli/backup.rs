//! `parachute backup`
//!
//! Packs local sources, encrypts them unless disabled and uploads the result
//! to an S3 remote.

use std::path::PathBuf;

use clap::Args;
use tracing::{info, warn};

use super::{require_passphrase, transfer_runtime, with_cleanup, RemoteArgs};
use crate::archive::naming::ENCRYPTED_SUFFIX;
use crate::archive::Archive;
use crate::config::Settings;
use crate::error::{ParachuteError, ParachuteResult};
use crate::transfer::{
    run_cancellable, RemoteLocation, S3Gateway, TransferGateway, UploadInfo, OCTET_STREAM,
};

#[derive(Args, Debug, Clone, Default)]
pub struct BackupArgs {
    /// Files or directories to back up
    #[arg(value_name = "LOCAL")]
    pub sources: Vec<PathBuf>,

    #[command(flatten)]
    pub remote: RemoteArgs,
}

/// Handle the backup command
pub fn handle_backup_command(settings: &Settings, args: BackupArgs) -> ParachuteResult<()> {
    info!(sources = ?args.sources, "started backup creation");

    let location = validate_backup_input(settings, &args.sources)?;
    settings.validate_s3()?;

    let runtime = transfer_runtime()?;
    let uploaded = runtime.block_on(async {
        let gateway = S3Gateway::new(&settings.s3_options());
        backup(&gateway, settings, &args.sources, &location).await
    })?;

    info!(destination = %location, size = uploaded.size, "finished backup to destination");
    println!("Backed up {} bytes to {}", uploaded.size, location);
    Ok(())
}

/// Pack `sources` and upload the artifact to `location`
pub async fn backup<G: TransferGateway>(
    gateway: &G,
    settings: &Settings,
    sources: &[PathBuf],
    location: &RemoteLocation,
) -> ParachuteResult<UploadInfo> {
    let mut archive =
        Archive::from_sources(sources, settings.encryption_enabled(), &settings.passphrase)?;

    let result = upload(gateway, &mut archive, settings, location).await;
    with_cleanup(&mut archive, result)
}

async fn upload<G: TransferGateway>(
    gateway: &G,
    archive: &mut Archive,
    settings: &Settings,
    location: &RemoteLocation,
) -> ParachuteResult<UploadInfo> {
    let artifact = archive.transfer_path();

    let uploaded = run_cancellable(
        gateway.upload(location, &artifact, OCTET_STREAM),
        settings.transfer_timeout(),
    )
    .await?;

    archive.mark_transferred()?;
    Ok(uploaded)
}

fn validate_backup_input(
    settings: &Settings,
    sources: &[PathBuf],
) -> ParachuteResult<RemoteLocation> {
    if sources.is_empty() {
        return Err(ParachuteError::validation("source archive must be provided"));
    }

    require_passphrase(settings)?;

    if !settings.encryption_enabled() {
        warn!("no encryption requested");
    }

    let remote = settings
        .remote
        .as_deref()
        .filter(|remote| !remote.is_empty())
        .ok_or_else(|| ParachuteError::validation("remote destination must be provided"))?;

    let location = RemoteLocation::parse(remote)?;

    if let Some(mismatch) = encryption_hint_mismatch(settings.encryption_enabled(), &location) {
        warn!(remote, "{}", mismatch);
    }

    Ok(location)
}

/// Describe how restore will misread the object when its key disagrees with
/// the encryption setting
fn encryption_hint_mismatch(encrypting: bool, location: &RemoteLocation) -> Option<String> {
    match (encrypting, location.is_encrypted()) {
        (true, false) => Some(format!(
            "remote object lacks the encryption hint ({}), restore will treat it as unencrypted",
            ENCRYPTED_SUFFIX
        )),
        (false, true) => Some(format!(
            "remote object carries the encryption hint ({}) but encryption is disabled, restore will try to decrypt it",
            ENCRYPTED_SUFFIX
        )),
        _ => None,
    }
}
