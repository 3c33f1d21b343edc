//! S3 transfer gateway

use std::future::Future;
use std::path::Path;

use aws_sdk_s3::config::{BehaviorVersion, Builder, Credentials, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use super::{RemoteLocation, TransferError, TransferGateway, UploadInfo};
use crate::crypto::SecureString;

/// Region used when none is configured
pub const DEFAULT_REGION: &str = "us-east-1";

const CREDENTIALS_PROVIDER: &str = "parachute";

/// Connection settings for an S3 compatible service
#[derive(Debug, Clone)]
pub struct S3Options {
    pub endpoint: String,
    pub access_key: String,
    pub secret_key: SecureString,
    pub region: Option<String>,
}

/// [`TransferGateway`] backed by the AWS SDK
///
/// Uses static credentials and path style addressing so that self hosted
/// services (MinIO, Garage, Ceph) work without DNS tricks.
#[derive(Debug, Clone)]
pub struct S3Gateway {
    client: Client,
}

impl S3Gateway {
    pub fn new(options: &S3Options) -> Self {
        let credentials = Credentials::new(
            options.access_key.clone(),
            options.secret_key.as_str().to_string(),
            None,
            None,
            CREDENTIALS_PROVIDER,
        );

        let region = options
            .region
            .clone()
            .filter(|region| !region.is_empty())
            .unwrap_or_else(|| DEFAULT_REGION.to_string());

        let config = Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .endpoint_url(endpoint_url(&options.endpoint))
            .region(Region::new(region))
            .credentials_provider(credentials)
            .force_path_style(true)
            .build();

        Self {
            client: Client::from_conf(config),
        }
    }
}

impl TransferGateway for S3Gateway {
    fn upload(
        &self,
        location: &RemoteLocation,
        local_file: &Path,
        content_type: &str,
    ) -> impl Future<Output = Result<UploadInfo, TransferError>> + Send {
        async move {
            let size = tokio::fs::metadata(local_file).await?.len();
            let body = ByteStream::from_path(local_file)
                .await
                .map_err(|e| TransferError::Io(format!("{}: {}", local_file.display(), e)))?;

            debug!(bucket = location.bucket(), object = location.key(), size, "started uploading");

            let output = self
                .client
                .put_object()
                .bucket(location.bucket())
                .key(location.key())
                .content_type(content_type)
                .content_length(size as i64)
                .body(body)
                .send()
                .await
                .map_err(|e| TransferError::Request(DisplayErrorContext(&e).to_string()))?;

            debug!(bucket = location.bucket(), object = location.key(), "finished uploading");

            Ok(UploadInfo {
                bucket: location.bucket().to_string(),
                key: location.key().to_string(),
                size,
                etag: output.e_tag().map(str::to_string),
            })
        }
    }

    fn download(
        &self,
        location: &RemoteLocation,
        local_file: &Path,
    ) -> impl Future<Output = Result<(), TransferError>> + Send {
        async move {
            debug!(bucket = location.bucket(), object = location.key(), "started downloading");

            let output = self
                .client
                .get_object()
                .bucket(location.bucket())
                .key(location.key())
                .send()
                .await
                .map_err(|e| TransferError::Request(DisplayErrorContext(&e).to_string()))?;

            let mut body = output.body.into_async_read();
            let mut file = tokio::fs::File::create(local_file).await?;
            let written = tokio::io::copy(&mut body, &mut file).await?;
            file.flush().await?;

            debug!(
                bucket = location.bucket(),
                object = location.key(),
                bytes = written,
                "finished downloading"
            );
            Ok(())
        }
    }
}

/// Endpoints without a scheme are reached over TLS
fn endpoint_url(endpoint: &str) -> String {
    if endpoint.contains("://") {
        endpoint.to_string()
    } else {
        format!("https://{}", endpoint)
    }
}
