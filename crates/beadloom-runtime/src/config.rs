#![forbid(unsafe_code)]

//! Store configuration as data.
//!
//! ```toml
//! # beadloom.toml
//! history_depth = 20
//! batch_idle_ms = 600
//! backup_retention = 5
//! storage_key = "bead-design-app-state"
//! ```
//!
//! Every field has a default, so an empty file yields
//! [`StoreConfig::default()`].

#[cfg(feature = "policy-config")]
use std::path::Path;
use std::time::Duration;

use beadloom_core::{
    DEFAULT_CELL_COUNT, DEFAULT_DIAMETER_MM, DEFAULT_LENGTH_CM, DEFAULT_STOCK, StrandTemplate,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::history::{DEFAULT_BATCH_IDLE, DEFAULT_HISTORY_DEPTH, HistoryConfig};

pub const DEFAULT_STORAGE_KEY: &str = "bead-design-app-state";
pub const DEFAULT_BACKUP_RETENTION: usize = 5;
pub const DEFAULT_EMERGENCY_INTERVAL_MS: u64 = 60_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Undo steps retained.
    pub history_depth: usize,
    /// Idle window that closes a history batch.
    pub batch_idle_ms: u64,
    /// Timestamped backups kept beside the latest backup.
    pub backup_retention: usize,
    /// Period of the session emergency snapshot.
    pub emergency_interval_ms: u64,
    /// Stock given to beads that arrive without an inventory record.
    pub default_stock: u32,
    pub default_cell_count: usize,
    pub default_length_cm: f64,
    pub default_diameter_mm: f64,
    /// Base key for every storage slot.
    pub storage_key: String,
    /// Seed for RANDOM fills. Unseeded fills draw from OS entropy.
    pub pattern_seed: Option<u64>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            history_depth: DEFAULT_HISTORY_DEPTH,
            batch_idle_ms: u64::try_from(DEFAULT_BATCH_IDLE.as_millis()).unwrap_or(600),
            backup_retention: DEFAULT_BACKUP_RETENTION,
            emergency_interval_ms: DEFAULT_EMERGENCY_INTERVAL_MS,
            default_stock: DEFAULT_STOCK,
            default_cell_count: DEFAULT_CELL_COUNT,
            default_length_cm: DEFAULT_LENGTH_CM,
            default_diameter_mm: DEFAULT_DIAMETER_MM,
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            pattern_seed: None,
        }
    }
}

impl StoreConfig {
    /// Load from a TOML string.
    #[cfg(feature = "policy-config")]
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(ConfigError::Toml)
    }

    /// Load from a TOML file on disk.
    #[cfg(feature = "policy-config")]
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ConfigError::Io)?;
        Self::from_toml_str(&content)
    }

    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(s).map_err(ConfigError::Json)
    }

    /// Validate ranges. An empty list means the config is usable.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.history_depth == 0 {
            errors.push("history_depth must be > 0".into());
        }
        if self.batch_idle_ms == 0 {
            errors.push("batch_idle_ms must be > 0".into());
        }
        if self.emergency_interval_ms == 0 {
            errors.push("emergency_interval_ms must be > 0".into());
        }
        if self.default_cell_count == 0 {
            errors.push("default_cell_count must be > 0".into());
        }
        if !(self.default_length_cm > 0.0) {
            errors.push(format!(
                "default_length_cm must be > 0, got {}",
                self.default_length_cm
            ));
        }
        if !(self.default_diameter_mm > 0.0) {
            errors.push(format!(
                "default_diameter_mm must be > 0, got {}",
                self.default_diameter_mm
            ));
        }
        if self.storage_key.trim().is_empty() {
            errors.push("storage_key must not be empty".into());
        }
        errors
    }

    /// [`validate`](Self::validate) as a `Result`.
    pub fn validated(self) -> Result<Self, ConfigError> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(self)
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    #[must_use]
    pub fn strand_template(&self) -> StrandTemplate {
        StrandTemplate {
            cell_count: self.default_cell_count,
            length_cm: self.default_length_cm,
            diameter_mm: self.default_diameter_mm,
        }
    }

    #[must_use]
    pub fn history(&self) -> HistoryConfig {
        HistoryConfig {
            max_depth: self.history_depth,
            batch_idle: Duration::from_millis(self.batch_idle_ms),
        }
    }

    #[must_use]
    pub fn emergency_interval(&self) -> Duration {
        Duration::from_millis(self.emergency_interval_ms)
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[source] std::io::Error),
    #[cfg(feature = "policy-config")]
    #[error("TOML parse error: {0}")]
    Toml(#[source] toml::de::Error),
    #[error("JSON parse error: {0}")]
    Json(#[source] serde_json::Error),
    #[error("validation errors: {}", .0.join("; "))]
    Validation(Vec<String>),
}
