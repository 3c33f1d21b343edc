//! Gateways and fixtures shared by the pipeline tests

#![allow(dead_code)]

use std::fs;
use std::future::Future;
use std::path::{Path, PathBuf};

use parachute::config::Settings;
use parachute::crypto::SecureString;
use parachute::transfer::{RemoteLocation, TransferError, TransferGateway, UploadInfo};

/// Stores objects as files below `root/<bucket>/<key>`
pub struct DirectoryGateway {
    pub root: PathBuf,
}

impl DirectoryGateway {
    pub fn object_path(&self, location: &RemoteLocation) -> PathBuf {
        self.root.join(location.bucket()).join(location.key())
    }
}

impl TransferGateway for DirectoryGateway {
    fn upload(
        &self,
        location: &RemoteLocation,
        local_file: &Path,
        _content_type: &str,
    ) -> impl Future<Output = Result<UploadInfo, TransferError>> + Send {
        let object = self.object_path(location);
        let local_file = local_file.to_path_buf();
        let location = location.clone();

        async move {
            if let Some(parent) = object.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            let size = tokio::fs::copy(&local_file, &object).await?;

            Ok(UploadInfo {
                bucket: location.bucket().to_string(),
                key: location.key().to_string(),
                size,
                etag: None,
            })
        }
    }

    fn download(
        &self,
        location: &RemoteLocation,
        local_file: &Path,
    ) -> impl Future<Output = Result<(), TransferError>> + Send {
        let object = self.object_path(location);
        let local_file = local_file.to_path_buf();

        async move {
            if !object.is_file() {
                return Err(TransferError::Request("NoSuchKey".to_string()));
            }
            tokio::fs::copy(&object, &local_file).await?;
            Ok(())
        }
    }
}

/// Never finishes a transfer
pub struct StalledGateway;

impl TransferGateway for StalledGateway {
    fn upload(
        &self,
        _location: &RemoteLocation,
        _local_file: &Path,
        _content_type: &str,
    ) -> impl Future<Output = Result<UploadInfo, TransferError>> + Send {
        std::future::pending()
    }

    fn download(
        &self,
        _location: &RemoteLocation,
        _local_file: &Path,
    ) -> impl Future<Output = Result<(), TransferError>> + Send {
        std::future::pending()
    }
}

/// Writes part of the object, then fails the transfer
pub struct BrokenGateway;

impl TransferGateway for BrokenGateway {
    fn upload(
        &self,
        _location: &RemoteLocation,
        _local_file: &Path,
        _content_type: &str,
    ) -> impl Future<Output = Result<UploadInfo, TransferError>> + Send {
        async { Err(TransferError::Request("connection reset".to_string())) }
    }

    fn download(
        &self,
        _location: &RemoteLocation,
        local_file: &Path,
    ) -> impl Future<Output = Result<(), TransferError>> + Send {
        let local_file = local_file.to_path_buf();

        async move {
            tokio::fs::write(&local_file, b"Salted__partial").await?;
            Err(TransferError::Request("connection reset".to_string()))
        }
    }
}

pub fn settings(passphrase: &str) -> Settings {
    Settings {
        passphrase: SecureString::from(passphrase),
        no_encryption: passphrase.is_empty(),
        ..Settings::default()
    }
}

pub fn source_tree(parent: &Path) -> PathBuf {
    let source = parent.join("home");
    fs::create_dir_all(source.join("docs")).unwrap();
    fs::write(source.join("notes.txt"), b"remember the milk").unwrap();
    fs::write(source.join("docs/report.txt"), b"quarterly").unwrap();
    source
}
