//! Tracker configuration loaded from TOML.
//!
//! Every field has a default, so an empty file (or no file) is a valid config.
//!
//! ```toml
//! data_dir = ".tracklist"
//! snapshot_retention = 5
//! chunk_size = 50
//!
//! [retry]
//! max_attempts = 3
//! base_delay_ms = 500
//!
//! [entity.github-repository]
//! staleness_hours = 12
//! snapshot_retention = 10
//! ```

#![allow(clippy::result_large_err)]

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::errors::{ExError, ExErrorKind, Result};
use crate::model::EntityType;

/// Environment variable naming a config file
pub const CONFIG_ENV_VAR: &str = "TRACKLIST_CONFIG";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Root directory for snapshots, change logs and the list database
    pub data_dir: PathBuf,
    /// Revisions retained per identifier unless overridden per entity type
    pub snapshot_retention: usize,
    /// Entities per progress chunk in batch runs
    pub chunk_size: usize,
    pub retry: RetryConfig,
    /// Per-entity-type overrides keyed by entity type name
    pub entity: BTreeMap<String, EntityOverride>,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".tracklist"),
            snapshot_retention: 5,
            chunk_size: 50,
            retry: RetryConfig::default(),
            entity: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 500,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntityOverride {
    pub staleness_hours: Option<i64>,
    pub snapshot_retention: Option<usize>,
}

impl TrackerConfig {
    /// Parse a config from TOML text
    ///
    /// # Errors
    ///
    /// - `InvalidConfig` — the text is not valid TOML for this schema, names an
    ///   unknown entity type, or sets a zero retention/chunk size
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: TrackerConfig = toml::from_str(text).map_err(|e| {
            ExError::new(ExErrorKind::InvalidConfig)
                .with_op("load_config")
                .with_message(e.to_string())
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config file
    ///
    /// # Errors
    ///
    /// - `Io` — the file cannot be read
    /// - `InvalidConfig` — see [`TrackerConfig::from_toml_str`]
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            ExError::new(ExErrorKind::Io)
                .with_op("load_config")
                .with_entity_id(path.display().to_string())
                .with_message(e.to_string())
        })?;
        Self::from_toml_str(&text)
    }

    /// Load from an explicit path, else `TRACKLIST_CONFIG`, else defaults
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        match std::env::var_os(CONFIG_ENV_VAR) {
            Some(path) => Self::load(Path::new(&path)),
            None => Ok(Self::default()),
        }
    }

    fn validate(&self) -> Result<()> {
        let invalid = |message: String| {
            ExError::new(ExErrorKind::InvalidConfig)
                .with_op("validate_config")
                .with_message(message)
        };

        if self.snapshot_retention == 0 {
            return Err(invalid("snapshot_retention must be at least 1".to_string()));
        }
        if self.chunk_size == 0 {
            return Err(invalid("chunk_size must be at least 1".to_string()));
        }
        if self.retry.max_attempts == 0 {
            return Err(invalid("retry.max_attempts must be at least 1".to_string()));
        }
        for (name, overrides) in &self.entity {
            name.parse::<EntityType>().map_err(ExError::from)?;
            if overrides.snapshot_retention == Some(0) {
                return Err(invalid(format!(
                    "entity.{}.snapshot_retention must be at least 1",
                    name
                )));
            }
            if matches!(overrides.staleness_hours, Some(h) if h < 0) {
                return Err(invalid(format!(
                    "entity.{}.staleness_hours must not be negative",
                    name
                )));
            }
        }
        Ok(())
    }

    /// Overrides for one entity type, if configured
    pub fn overrides_for(&self, entity_type: EntityType) -> Option<&EntityOverride> {
        self.entity.get(entity_type.as_str())
    }

    pub fn snapshot_dir(&self) -> PathBuf {
        self.data_dir.join("snapshots")
    }

    pub fn change_log_dir(&self) -> PathBuf {
        self.data_dir.join("changes")
    }

    pub fn list_db_path(&self) -> PathBuf {
        self.data_dir.join("lists.db")
    }
}
