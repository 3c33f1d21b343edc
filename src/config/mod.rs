//! Configuration module for parachute
//!
//! This module provides configuration management including:
//! - configuration file discovery
//! - TOML settings with environment and flag overrides

pub mod paths;
pub mod settings;

pub use paths::ConfigPaths;
pub use settings::{Overrides, Settings};
