//! Configuration file discovery
//!
//! ## Search Order
//!
//! Without an explicit `--config`, the first existing `parachute.toml` wins:
//!
//! 1. `/etc/parachute/`
//! 2. the user configuration directory (`~/.config/parachute/` on Linux)
//! 3. the current working directory
//!
//! An explicit path is used exclusively. It may name the file itself or a
//! directory containing `parachute.toml`.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;

use crate::error::{ParachuteError, ParachuteResult};

/// File name looked up in every search directory
pub const CONFIG_FILE_NAME: &str = "parachute.toml";

/// System wide configuration directory
#[cfg(unix)]
const SYSTEM_CONFIG_DIR: &str = "/etc/parachute";

/// Where configuration may come from
#[derive(Debug, Clone)]
pub struct ConfigPaths {
    search_dirs: Vec<PathBuf>,
    explicit: Option<PathBuf>,
}

impl ConfigPaths {
    /// Default search directories, or only `explicit` when given
    pub fn new(explicit: Option<&Path>) -> Self {
        let mut search_dirs = Vec::new();

        #[cfg(unix)]
        search_dirs.push(PathBuf::from(SYSTEM_CONFIG_DIR));

        if let Some(dirs) = ProjectDirs::from("", "", "parachute") {
            search_dirs.push(dirs.config_dir().to_path_buf());
        }

        search_dirs.push(PathBuf::from("."));

        Self {
            search_dirs,
            explicit: explicit.map(Path::to_path_buf),
        }
    }

    /// Search only the given directories (useful for testing)
    pub fn with_search_dirs(search_dirs: Vec<PathBuf>) -> Self {
        Self {
            search_dirs,
            explicit: None,
        }
    }

    /// Every file that would be considered, in order
    pub fn candidates(&self) -> Vec<PathBuf> {
        match self.explicit_file() {
            Some(file) => vec![file],
            None => self
                .search_dirs
                .iter()
                .map(|dir| dir.join(CONFIG_FILE_NAME))
                .collect(),
        }
    }

    /// The explicit configuration file, if one was given
    pub fn explicit_file(&self) -> Option<PathBuf> {
        self.explicit.as_ref().map(|path| {
            if path.is_dir() {
                path.join(CONFIG_FILE_NAME)
            } else {
                path.clone()
            }
        })
    }

    /// Find the configuration file to load
    ///
    /// Returns `None` when nothing was found and no file was requested. A
    /// requested file that does not exist is an error.
    pub fn resolve(&self) -> ParachuteResult<Option<PathBuf>> {
        if let Some(file) = self.explicit_file() {
            if !file.is_file() {
                return Err(ParachuteError::Config(format!(
                    "provided config file '{}' not found",
                    file.display()
                )));
            }
            return Ok(Some(file));
        }

        Ok(self.candidates().into_iter().find(|file| file.is_file()))
    }
}
