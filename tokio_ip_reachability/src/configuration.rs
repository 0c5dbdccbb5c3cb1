use crate::check::session::{DEFAULT_PAYLOAD, DEFAULT_SEQUENCE_MAX, DEFAULT_TIMEOUT};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Settings shared by the ICMP and TCP checkers, loadable from JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckConfiguration {
    /// Number of echo requests sent per ICMP check.
    pub sequence_max: u16,
    /// Delay between an echo request and the next one when no reply arrives.
    pub timeout: Duration,
    pub payload: String,
    pub connect_timeout: Duration,
}

impl Default for CheckConfiguration {
    fn default() -> Self {
        Self {
            sequence_max: DEFAULT_SEQUENCE_MAX,
            timeout: DEFAULT_TIMEOUT,
            payload: String::from_utf8_lossy(DEFAULT_PAYLOAD).into_owned(),
            connect_timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl CheckConfiguration {
    pub fn load(path: &Path) -> Result<Self, ConfigurationError> {
        let data = std::fs::read_to_string(path).map_err(|source| ConfigurationError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let conf = Self::from_json(&data)?;
        log::debug!("loaded configuration from {}: {:?}", path.display(), conf);
        Ok(conf)
    }

    pub fn from_json(data: &str) -> Result<Self, ConfigurationError> {
        let conf: Self = serde_json::from_str(data)?;
        conf.validate()?;
        Ok(conf)
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.sequence_max == 0 {
            return Err(ConfigurationError::Invalid(
                "sequence_max must be at least 1".to_string(),
            ));
        }
        if self.timeout.is_zero() {
            return Err(ConfigurationError::Invalid(
                "timeout must be positive".to_string(),
            ));
        }
        if self.connect_timeout.is_zero() {
            return Err(ConfigurationError::Invalid(
                "connect_timeout must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
