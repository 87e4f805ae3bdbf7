//! Configuration types for userinfo
//!
//! A store is configured once at startup with its file location and the
//! buckets to seed. The same structure can be loaded from a TOML file.

use crate::error::{Error, Result};
use crate::types::DEFAULT_BUCKETS;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Root configuration for a userinfo store
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Path of the store file (created if missing)
    pub location: PathBuf,
    /// Buckets created on open
    pub buckets: Vec<String>,
    /// Payload file configuration
    pub blob: BlobConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            location: PathBuf::from("userinfo.db"),
            buckets: DEFAULT_BUCKETS.iter().map(ToString::to_string).collect(),
            blob: BlobConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl StoreConfig {
    /// Default configuration with the store file at `location`
    pub fn with_location(location: impl Into<PathBuf>) -> Self {
        Self {
            location: location.into(),
            ..Self::default()
        }
    }

    /// Parse a TOML document
    pub fn from_toml_str(input: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(input).map_err(|e| Error::configuration(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file, falling back to defaults when it does not exist
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let input = std::fs::read_to_string(path)?;
        Self::from_toml_str(&input)
    }

    /// Check that the configuration can open a store
    pub fn validate(&self) -> Result<()> {
        if self.location.as_os_str().is_empty() {
            return Err(Error::configuration("store location is empty"));
        }
        if self.buckets.iter().any(String::is_empty) {
            return Err(Error::configuration("bucket names must not be empty"));
        }
        Ok(())
    }
}

/// Payload file configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlobConfig {
    /// Directory payload files are resolved against
    pub payload_dir: PathBuf,
    /// Handling of payloads that are not valid base64
    pub decode_policy: DecodePolicy,
}

impl Default for BlobConfig {
    fn default() -> Self {
        Self {
            payload_dir: PathBuf::from("."),
            decode_policy: DecodePolicy::default(),
        }
    }
}

/// Handling of payloads that are not valid base64
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecodePolicy {
    /// Reject the payload and return nothing
    #[default]
    Strict,
    /// Return whatever decoded cleanly before the first invalid quantum
    Lenient,
}

/// Logging configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}
