//! Runtime settings for parachute
//!
//! Settings are built once per invocation from defaults, an optional
//! `parachute.toml` and finally environment variables and command line flags
//! (see [`Overrides`]). The resulting value is passed to command handlers by
//! reference.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use super::paths::ConfigPaths;
use crate::crypto::SecureString;
use crate::error::{ParachuteError, ParachuteResult};
use crate::logging::LogFormat;
use crate::transfer::S3Options;

/// Runtime settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// S3 endpoint, `https://` is assumed without a scheme
    pub endpoint: String,

    /// S3 access key
    pub access_key: String,

    /// S3 secret key
    pub secret_key: SecureString,

    /// S3 region, `us-east-1` when unset
    pub region: Option<String>,

    /// Encryption passphrase
    pub passphrase: SecureString,

    /// Skip encryption on pack/backup and decryption on restore
    pub no_encryption: bool,

    /// Default output directory for pack and unpack
    pub output: Option<PathBuf>,

    /// Default remote address for backup and restore
    pub remote: Option<String>,

    /// trace, debug, info, warn or error
    pub log_level: String,

    pub log_format: LogFormat,

    /// Transfer deadline in seconds, 0 disables it
    pub transfer_timeout: u64,
}

fn default_log_level() -> String {
    "error".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            access_key: String::new(),
            secret_key: SecureString::default(),
            region: None,
            passphrase: SecureString::default(),
            no_encryption: false,
            output: None,
            remote: None,
            log_level: default_log_level(),
            log_format: LogFormat::default(),
            transfer_timeout: 0,
        }
    }
}

/// Values that take precedence over the configuration file
///
/// `None` (or `false` for flags) leaves the file value in place.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub endpoint: Option<String>,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    pub region: Option<String>,
    pub passphrase: Option<String>,
    pub no_encryption: bool,
    pub output: Option<PathBuf>,
    pub remote: Option<String>,
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
    pub transfer_timeout: Option<u64>,
}

impl Settings {
    /// Load the first configuration file found, or defaults
    pub fn load(paths: &ConfigPaths) -> ParachuteResult<Self> {
        match paths.resolve()? {
            Some(file) => Self::from_file(&file),
            None => {
                debug!("no configuration file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Parse a TOML configuration file
    pub fn from_file(path: &Path) -> ParachuteResult<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            ParachuteError::Io(format!("Failed to read config file {}: {}", path.display(), e))
        })?;

        let settings: Settings = toml::from_str(&contents).map_err(|e| {
            ParachuteError::Config(format!(
                "fatal configuration error in {}: {}",
                path.display(),
                e
            ))
        })?;

        debug!(file = %path.display(), "loaded configuration");
        Ok(settings)
    }

    /// Layer environment and command line values on top
    pub fn apply(&mut self, overrides: Overrides) {
        if let Some(endpoint) = overrides.endpoint {
            self.endpoint = endpoint;
        }
        if let Some(access_key) = overrides.access_key {
            self.access_key = access_key;
        }
        if let Some(secret_key) = overrides.secret_key {
            self.secret_key = SecureString::from(secret_key);
        }
        if let Some(region) = overrides.region {
            self.region = Some(region);
        }
        if let Some(passphrase) = overrides.passphrase {
            self.passphrase = SecureString::from(passphrase);
        }
        if overrides.no_encryption {
            self.no_encryption = true;
        }
        if let Some(output) = overrides.output {
            self.output = Some(output);
        }
        if let Some(remote) = overrides.remote {
            self.remote = Some(remote);
        }
        if let Some(log_level) = overrides.log_level {
            self.log_level = log_level;
        }
        if let Some(log_format) = overrides.log_format {
            self.log_format = log_format;
        }
        if let Some(timeout) = overrides.transfer_timeout {
            self.transfer_timeout = timeout;
        }
    }

    /// Whether pack and backup should encrypt
    pub fn encryption_enabled(&self) -> bool {
        !self.no_encryption
    }

    /// Deadline for a single upload or download
    pub fn transfer_timeout(&self) -> Option<Duration> {
        (self.transfer_timeout > 0).then(|| Duration::from_secs(self.transfer_timeout))
    }

    /// Check that an S3 connection can be configured
    pub fn validate_s3(&self) -> ParachuteResult<()> {
        if self.endpoint.is_empty() {
            return Err(ParachuteError::validation("endpoint must be provided"));
        }
        if self.access_key.is_empty() {
            return Err(ParachuteError::validation("access key must be provided"));
        }
        if self.secret_key.is_empty() {
            return Err(ParachuteError::validation("secret key must be provided"));
        }
        Ok(())
    }

    pub fn s3_options(&self) -> S3Options {
        S3Options {
            endpoint: self.endpoint.clone(),
            access_key: self.access_key.clone(),
            secret_key: self.secret_key.clone(),
            region: self.region.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::paths::CONFIG_FILE_NAME;
    use tempfile::TempDir;

    const SAMPLE: &str = r#"
endpoint = "s3.example.com"
access_key = "AKIA"
secret_key = "top-secret"
passphrase = "from-file"
log_level = "debug"
log_format = "json"
transfer_timeout = 90
"#;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.log_level, "error");
        assert_eq!(settings.log_format, LogFormat::Console);
        assert!(settings.encryption_enabled());
        assert!(settings.passphrase.is_empty());
        assert_eq!(settings.transfer_timeout(), None);
    }

    #[test]
    fn test_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join(CONFIG_FILE_NAME);
        fs::write(&file, SAMPLE).unwrap();

        let settings = Settings::from_file(&file).unwrap();
        assert_eq!(settings.endpoint, "s3.example.com");
        assert_eq!(settings.access_key, "AKIA");
        assert_eq!(settings.secret_key.as_str(), "top-secret");
        assert_eq!(settings.passphrase.as_str(), "from-file");
        assert_eq!(settings.log_level, "debug");
        assert_eq!(settings.log_format, LogFormat::Json);
        assert_eq!(settings.transfer_timeout(), Some(Duration::from_secs(90)));
        assert!(settings.validate_s3().is_ok());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join(CONFIG_FILE_NAME);
        fs::write(&file, "no_encryption = true\n").unwrap();

        let settings = Settings::from_file(&file).unwrap();
        assert!(!settings.encryption_enabled());
        assert_eq!(settings.log_level, "error");
    }

    #[test]
    fn test_malformed_file_is_a_config_error() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join(CONFIG_FILE_NAME);
        fs::write(&file, "endpoint = [unterminated").unwrap();

        let err = Settings::from_file(&file).unwrap_err();
        assert!(matches!(err, ParachuteError::Config(_)));
    }

    #[test]
    fn test_load_without_file_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let paths = ConfigPaths::with_search_dirs(vec![temp_dir.path().to_path_buf()]);

        let settings = Settings::load(&paths).unwrap();
        assert!(settings.endpoint.is_empty());
    }

    #[test]
    fn test_overrides_take_precedence() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join(CONFIG_FILE_NAME), SAMPLE).unwrap();
        let paths = ConfigPaths::with_search_dirs(vec![temp_dir.path().to_path_buf()]);

        let mut settings = Settings::load(&paths).unwrap();
        settings.apply(Overrides {
            endpoint: Some("http://127.0.0.1:9000".into()),
            passphrase: Some("from-flag".into()),
            no_encryption: true,
            ..Overrides::default()
        });

        assert_eq!(settings.endpoint, "http://127.0.0.1:9000");
        assert_eq!(settings.passphrase.as_str(), "from-flag");
        assert!(!settings.encryption_enabled());
        // untouched values stay as loaded
        assert_eq!(settings.access_key, "AKIA");
        assert_eq!(settings.log_level, "debug");
    }

    #[test]
    fn test_validate_s3_messages() {
        let mut settings = Settings::default();
        assert_eq!(
            settings.validate_s3().unwrap_err().to_string(),
            "endpoint must be provided"
        );

        settings.endpoint = "s3.example.com".into();
        assert_eq!(
            settings.validate_s3().unwrap_err().to_string(),
            "access key must be provided"
        );

        settings.access_key = "AKIA".into();
        assert_eq!(
            settings.validate_s3().unwrap_err().to_string(),
            "secret key must be provided"
        );

        settings.secret_key = SecureString::from("secret");
        assert!(settings.validate_s3().is_ok());
    }

    #[test]
    fn test_debug_output_redacts_secrets() {
        let mut settings = Settings::default();
        settings.secret_key = SecureString::from("top-secret");
        settings.passphrase = SecureString::from("hunter2");

        let debug = format!("{:?}", settings);
        assert!(!debug.contains("top-secret"));
        assert!(!debug.contains("hunter2"));
    }
}
