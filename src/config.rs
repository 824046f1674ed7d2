use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::payload::PayloadKind;
use crate::{endpoint, Result, TransferError, DEFAULT_HOST, DEFAULT_PORT, READ_CHUNK_SIZE};

/// Settings shared by the sender and receiver binaries.
///
/// Every field has a default, so a config file only needs the keys it changes.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct TransferConfig {
    pub host: String,
    pub port: u16,
    /// Which fixed payload the sender transmits
    pub payload: PayloadKind,
    /// Receiver read size in bytes
    pub chunk_size: usize,
    /// Sender pause before connecting, in milliseconds
    pub delay_ms: u64,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            payload: PayloadKind::default(),
            chunk_size: READ_CHUNK_SIZE,
            delay_ms: 1000,
        }
    }
}

impl TransferConfig {
    pub fn endpoint(&self) -> String {
        endpoint(&self.host, self.port)
    }

    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(TransferError::Config("host must not be empty".to_string()));
        }
        if self.chunk_size == 0 {
            return Err(TransferError::Config("chunk_size must be at least 1".to_string()));
        }
        Ok(())
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| TransferError::Config(e.to_string()))
    }
}

/// Read a YAML config file; missing keys keep their defaults.
pub fn load_config(path: impl AsRef<Path>) -> Result<TransferConfig> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)?;
    let config: TransferConfig = serde_yaml::from_str(&content)
        .map_err(|e| TransferError::Config(format!("{}: {e}", path.display())))?;
    config.validate()?;
    Ok(config)
}
