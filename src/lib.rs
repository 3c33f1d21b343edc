//! parachute - backup utility for S3 compatible storages
//!
//! Packs files and directories into zip archives, encrypts them in the
//! OpenSSL `enc` format and moves them to or from object storage.
//!
//! # Architecture
//!
//! The crate is organized into the following modules:
//!
//! - `archive`: archive lifecycle, zip codec and path resolution
//! - `crypto`: passphrase based encryption of archive files
//! - `transfer`: remote addresses and the S3 gateway
//! - `config`: configuration discovery and settings
//! - `logging`: diagnostic output
//! - `cli`: command handlers
//! - `error`: custom error types
//!
//! # Example
//!
//! ```rust,ignore
//! use parachute::archive::Archive;
//!
//! let mut archive = Archive::from_sources(&["photos"], true, "secret")?;
//! let placed = archive.place_into(Path::new("/backups"), false)?;
//! archive.cleanup()?;
//! ```

pub mod archive;
pub mod cli;
pub mod config;
pub mod crypto;
pub mod error;
pub mod logging;
pub mod transfer;

pub use error::{ParachuteError, ParachuteResult};
