//! Diagnostic output
//!
//! Everything is written to stderr so stdout stays reserved for command
//! output. The subscriber is installed once, from `main`.

use std::io;

use serde::Deserialize;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

use crate::error::{ParachuteError, ParachuteResult};

/// Output format of log lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Plain, uncolored lines
    #[default]
    #[serde(alias = "")]
    Console,
    /// One JSON object per line
    Json,
}

/// Parse a level name
///
/// `fatal` and `panic` are accepted as aliases of `error`; an empty name means
/// the default level, `error`.
pub fn parse_level(level: &str) -> ParachuteResult<LevelFilter> {
    match level.trim().to_ascii_lowercase().as_str() {
        "trace" => Ok(LevelFilter::TRACE),
        "debug" => Ok(LevelFilter::DEBUG),
        "info" => Ok(LevelFilter::INFO),
        "warn" | "warning" => Ok(LevelFilter::WARN),
        "error" | "fatal" | "panic" | "" => Ok(LevelFilter::ERROR),
        "off" | "disabled" => Ok(LevelFilter::OFF),
        other => Err(ParachuteError::Config(format!(
            "unknown log level '{}' (expected trace, debug, info, warn or error)",
            other
        ))),
    }
}

/// Install the global subscriber
///
/// Calling this again after a subscriber is installed has no effect.
pub fn init(level: &str, format: LogFormat) -> ParachuteResult<()> {
    let filter = parse_level(level)?;
    let registry = tracing_subscriber::registry().with(filter);

    let installed = match format {
        LogFormat::Console => registry
            .with(
                fmt::layer()
                    .with_writer(io::stderr)
                    .with_ansi(false)
                    .with_target(false),
            )
            .try_init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(io::stderr))
            .try_init(),
    };

    if installed.is_err() {
        tracing::debug!("log subscriber already installed");
    }

    Ok(())
}
