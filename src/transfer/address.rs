//! Remote object addresses (`s3://bucket/key`)

use std::fmt;
use std::str::FromStr;

use crate::archive::naming::is_encrypted_name;
use crate::error::{ParachuteError, ParachuteResult};

/// URL scheme of S3 remotes
pub const S3_SCHEME: &str = "s3://";

/// Message for a remote that is not an `s3://` address
pub const REMOTE_FORMAT_MESSAGE: &str = "remote must be declared in \"s3://bucket/some-path\" format";

/// A bucket and object key pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteLocation {
    bucket: String,
    key: String,
}

impl RemoteLocation {
    /// Parse `s3://<bucket>/<key>`
    ///
    /// The address is split at the first `/` after the scheme and both parts
    /// are trimmed of surrounding slashes. Neither part may end up empty.
    pub fn parse(remote: &str) -> ParachuteResult<Self> {
        let rest = remote
            .strip_prefix(S3_SCHEME)
            .ok_or_else(|| ParachuteError::validation(REMOTE_FORMAT_MESSAGE))?;

        let (bucket, key) = rest.split_once('/').unwrap_or((rest, ""));
        let bucket = bucket.trim_matches('/');
        let key = key.trim_matches('/');

        if bucket.is_empty() {
            return Err(ParachuteError::validation(format!(
                "remote '{}' does not name a bucket",
                remote
            )));
        }
        if key.is_empty() {
            return Err(ParachuteError::validation(format!(
                "remote '{}' does not name an object",
                remote
            )));
        }

        Ok(Self {
            bucket: bucket.to_string(),
            key: key.to_string(),
        })
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Whether the object key carries the encryption suffix
    pub fn is_encrypted(&self) -> bool {
        is_encrypted_name(&self.key)
    }
}

impl FromStr for RemoteLocation {
    type Err = ParachuteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for RemoteLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}/{}", S3_SCHEME, self.bucket, self.key)
    }
}
