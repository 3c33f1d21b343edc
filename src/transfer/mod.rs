//! Remote object transfer
//!
//! [`TransferGateway`] is the seam between the archive pipeline and object
//! storage. [`S3Gateway`] talks to any S3 compatible service; tests plug in
//! their own implementations.

pub mod address;
pub mod s3;

use std::future::Future;
use std::path::Path;
use std::time::Duration;

use thiserror::Error;
use tracing::warn;

pub use address::RemoteLocation;
pub use s3::{S3Gateway, S3Options};

/// Content type of every uploaded artifact
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Errors raised while moving bytes to or from a remote
#[derive(Error, Debug)]
pub enum TransferError {
    /// The remote rejected the request or could not be reached
    #[error("request failed: {0}")]
    Request(String),

    /// Interrupted by the user
    #[error("transfer cancelled")]
    Cancelled,

    /// The configured deadline passed
    #[error("transfer timed out after {}s", .0.as_secs())]
    TimedOut(Duration),

    /// Reading or writing the local file failed
    #[error("local file error: {0}")]
    Io(String),
}

impl From<std::io::Error> for TransferError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

/// What the remote reported after an upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadInfo {
    pub bucket: String,
    pub key: String,
    pub size: u64,
    pub etag: Option<String>,
}

/// Upload and download whole files by bucket and object key
pub trait TransferGateway {
    /// Store `local_file` at `location`
    fn upload(
        &self,
        location: &RemoteLocation,
        local_file: &Path,
        content_type: &str,
    ) -> impl Future<Output = Result<UploadInfo, TransferError>> + Send;

    /// Fetch `location` into `local_file`, creating or truncating it
    fn download(
        &self,
        location: &RemoteLocation,
        local_file: &Path,
    ) -> impl Future<Output = Result<(), TransferError>> + Send;
}

/// Run a transfer until it finishes, Ctrl-C is pressed or `timeout` passes
///
/// A single attempt is made; nothing is retried.
pub async fn run_cancellable<F, T>(operation: F, timeout: Option<Duration>) -> Result<T, TransferError>
where
    F: Future<Output = Result<T, TransferError>>,
{
    let deadline = async {
        match timeout {
            Some(limit) => tokio::time::sleep(limit).await,
            None => std::future::pending::<()>().await,
        }
    };

    tokio::select! {
        result = operation => result,
        _ = interrupted() => Err(TransferError::Cancelled),
        _ = deadline => Err(TransferError::TimedOut(timeout.unwrap_or_default())),
    }
}

async fn interrupted() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "unable to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}
