//! Custom error types for parachute
//!
//! This module defines the error hierarchy for the application using thiserror
//! for ergonomic error definitions.

use std::path::PathBuf;

use thiserror::Error;

use crate::archive::Stage;
use crate::transfer::TransferError;

/// The main error type for parachute operations
#[derive(Error, Debug)]
pub enum ParachuteError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid command input, detected before any I/O happens
    #[error("{0}")]
    Validation(String),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// Zip container errors
    #[error("Archive error: {0}")]
    Archive(String),

    /// An archive entry would be written outside of the extraction directory
    #[error("illegal file path in archive: {entry}")]
    UnsafeEntry { entry: String },

    /// Encryption errors
    #[error("Encryption error: {0}")]
    Encryption(String),

    /// Decryption errors (wrong passphrase, corrupted or foreign input)
    #[error("Decryption error: {0}")]
    Decryption(String),

    /// Destination path collision
    #[error("destination '{}' does already exist", path.display())]
    DestinationExists { path: PathBuf },

    /// Upload/download errors
    #[error("Transfer error: {0}")]
    Transfer(#[from] TransferError),

    /// An archive operation was invoked in the wrong lifecycle stage
    #[error("cannot {operation} an archive in stage '{stage}'")]
    StageOrder {
        operation: &'static str,
        stage: Stage,
    },
}

impl ParachuteError {
    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Check if this is a validation error
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Check if this error reports a zip-slip attempt
    pub fn is_unsafe_entry(&self) -> bool {
        matches!(self, Self::UnsafeEntry { .. })
    }

    /// Check if this is a decryption error
    pub fn is_decryption(&self) -> bool {
        matches!(self, Self::Decryption(_))
    }
}

// Implement From traits for common error types

impl From<std::io::Error> for ParachuteError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<walkdir::Error> for ParachuteError {
    fn from(err: walkdir::Error) -> Self {
        match err.path() {
            Some(path) => Self::Io(format!("{}: {}", path.display(), err)),
            None => Self::Io(err.to_string()),
        }
    }
}

impl From<zip::result::ZipError> for ParachuteError {
    fn from(err: zip::result::ZipError) -> Self {
        Self::Archive(err.to_string())
    }
}

/// Result type alias for parachute operations
pub type ParachuteResult<T> = Result<T, ParachuteError>;
