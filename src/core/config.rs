// Persisted defaults and per-session state pass-through
//
// The core does not interpret these values; it round-trips them verbatim
// between the host and disk.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::error::ConfigError;

/// Durable defaults shared by both ingestion surfaces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeDefaults {
    pub address: String,
    pub port: u16,
    /// Last-selected topic names.
    pub topics: Vec<String>,
    /// Last CSV delimiter choice.
    pub csv_delimiter: char,
    /// Last-selected time axis (column or virtual combined name).
    pub time_axis: String,
    pub custom_time_format: String,
}

impl Default for BridgeDefaults {
    fn default() -> Self {
        Self {
            address: "127.0.0.1".to_owned(),
            port: 8080,
            topics: Vec::new(),
            csv_delimiter: ',',
            time_axis: String::new(),
            custom_time_format: String::new(),
        }
    }
}

impl BridgeDefaults {
    /// Load from a JSON file; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let data = serde_json::to_string_pretty(self)?;
        fs::write(path, data)?;
        Ok(())
    }
}

/// Opaque project-scoped state. Stored and returned verbatim.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionState(pub serde_json::Value);

impl SessionState {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = fs::read_to_string(path)?;
        Ok(Self(serde_json::from_str(&data)?))
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let data = serde_json::to_string_pretty(&self.0)?;
        fs::write(path, data)?;
        Ok(())
    }
}
