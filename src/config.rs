use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Config file looked up in the working directory when none is given.
pub const DEFAULT_CONFIG_PATH: &str = "btmeta.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub output_directory: PathBuf,
    pub max_torrent_size: u64, // bytes
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_directory: PathBuf::from("."),
            max_torrent_size: 10 * 1024 * 1024,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Loads the config at `path`, falling back to defaults when the file does not exist.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Relative outputs land under `output_directory`; absolute ones are kept.
    pub fn resolve_output<P: AsRef<Path>>(&self, output: P) -> PathBuf {
        self.output_directory.join(output)
    }
}
