//! CLI command handlers
//!
//! This module contains the implementation of CLI commands,
//! bridging the clap argument parsing with the archive pipeline.

pub mod backup;
pub mod pack;
pub mod restore;
pub mod unpack;
pub mod version;

pub use backup::{handle_backup_command, BackupArgs};
pub use pack::{handle_pack_command, PackArgs};
pub use restore::{handle_restore_command, RestoreArgs};
pub use unpack::{handle_unpack_command, UnpackArgs};
pub use version::handle_version_command;

use clap::Args;
use tokio::runtime::{Builder, Runtime};
use tracing::warn;

use crate::archive::Archive;
use crate::config::Overrides;
use crate::config::Settings;
use crate::error::{ParachuteError, ParachuteResult};

/// S3 connection flags shared by backup and restore
#[derive(Args, Debug, Clone, Default)]
pub struct RemoteArgs {
    /// Remote address (s3://bucket/some-path)
    #[arg(short, long, env = "PARACHUTE_REMOTE")]
    pub remote: Option<String>,

    /// S3 endpoint
    #[arg(long, env = "PARACHUTE_ENDPOINT")]
    pub endpoint: Option<String>,

    /// S3 access key
    #[arg(long, env = "PARACHUTE_ACCESS_KEY")]
    pub access_key: Option<String>,

    /// S3 secret key
    #[arg(long, env = "PARACHUTE_SECRET_KEY", hide_env_values = true)]
    pub secret_key: Option<String>,

    /// S3 region
    #[arg(long, env = "PARACHUTE_REGION")]
    pub region: Option<String>,

    /// Abort a transfer after this many seconds
    #[arg(long, env = "PARACHUTE_TRANSFER_TIMEOUT", value_name = "SECONDS")]
    pub transfer_timeout: Option<u64>,
}

impl RemoteArgs {
    /// Copy the given flags into `overrides`
    pub fn apply_to(&self, overrides: &mut Overrides) {
        overrides.remote = self.remote.clone().or(overrides.remote.take());
        overrides.endpoint = self.endpoint.clone().or(overrides.endpoint.take());
        overrides.access_key = self.access_key.clone().or(overrides.access_key.take());
        overrides.secret_key = self.secret_key.clone().or(overrides.secret_key.take());
        overrides.region = self.region.clone().or(overrides.region.take());
        overrides.transfer_timeout = self.transfer_timeout.or(overrides.transfer_timeout);
    }
}

/// Passphrase check shared by every command that may encrypt
pub(crate) fn require_passphrase(settings: &Settings) -> ParachuteResult<()> {
    if settings.encryption_enabled() && settings.passphrase.is_empty() {
        return Err(ParachuteError::validation("provided passphrase is empty"));
    }
    Ok(())
}

/// Clean up `archive` and combine the outcome with the pipeline result
///
/// A pipeline error wins over a cleanup error; the latter is only logged then.
pub(crate) fn with_cleanup<T>(archive: &mut Archive, result: ParachuteResult<T>) -> ParachuteResult<T> {
    let cleaned = archive.cleanup();

    match (result, cleaned) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(cleanup_err)) => Err(cleanup_err),
        (Err(err), Ok(())) => Err(err),
        (Err(err), Err(cleanup_err)) => {
            warn!(error = %cleanup_err, "cleanup after failure did not complete");
            Err(err)
        }
    }
}

/// Runtime for network transfers
pub(crate) fn transfer_runtime() -> ParachuteResult<Runtime> {
    Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| ParachuteError::Io(format!("Failed to start transfer runtime: {}", e)))
}
