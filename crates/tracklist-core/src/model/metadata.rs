//! List item metadata as a closed tagged union.
//!
//! The `type` tag selects the expected shape on read; a payload that does not
//! parse as one of these variants is rejected at the persistence boundary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::entity_type::SourceType;
use super::list::ListItem;
use crate::errors::TrackerError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ListItemMetadata {
    GithubRepository(GithubRepositoryMetadata),
    ObsidianPlugin(ObsidianPluginMetadata),
    ObsidianTheme(ObsidianThemeMetadata),
    Archived(ArchivedMetadata),
}

impl ListItemMetadata {
    /// Source type this metadata belongs to
    pub fn source_type(&self) -> SourceType {
        match self {
            ListItemMetadata::GithubRepository(_) => SourceType::GithubRepository,
            ListItemMetadata::ObsidianPlugin(_) => SourceType::ObsidianPlugin,
            ListItemMetadata::ObsidianTheme(_) => SourceType::ObsidianTheme,
            ListItemMetadata::Archived(_) => SourceType::Archived,
        }
    }

    /// Reject metadata whose tag does not match the target list
    pub fn validate_for(&self, list_source_type: SourceType) -> Result<(), TrackerError> {
        let actual = self.source_type();
        if actual != list_source_type {
            return Err(TrackerError::MetadataMismatch {
                expected: list_source_type.to_string(),
                actual: actual.to_string(),
            });
        }
        Ok(())
    }

    /// Encode to a JSON value (tag included)
    pub fn to_value(&self) -> Result<serde_json::Value, TrackerError> {
        Ok(serde_json::to_value(self)?)
    }

    /// Decode from a JSON value, validating the tag and shape
    pub fn from_value(value: serde_json::Value) -> Result<Self, TrackerError> {
        Ok(serde_json::from_value(value)?)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepositoryStats {
    pub stars: u64,
    pub forks: u64,
    pub open_issues: u64,
    pub watchers: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GithubRepositoryMetadata {
    pub full_name: String,
    pub name: String,
    pub owner: String,
    pub description: Option<String>,
    pub homepage: Option<String>,
    pub url: String,
    pub topics: Vec<String>,
    pub language: Option<String>,
    pub license: Option<String>,
    pub archived: bool,
    pub fork: bool,
    pub stats: RepositoryStats,
    pub pushed_at: Option<String>,
    pub synced_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObsidianPluginMetadata {
    pub plugin_id: String,
    pub name: String,
    pub author: String,
    pub description: String,
    pub repo: String,
    pub downloads: Option<u64>,
    pub latest_version: Option<String>,
    /// Per-version download counts from the run's stats context
    pub stats: BTreeMap<String, u64>,
    pub synced_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObsidianThemeMetadata {
    pub name: String,
    pub author: String,
    pub repo: String,
    pub modes: Vec<String>,
    pub screenshot: Option<String>,
    pub synced_at: DateTime<Utc>,
}

/// Record left in the shared archived list when an entity disappears upstream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchivedMetadata {
    pub full_name: String,
    pub reason: String,
    pub removed_at: DateTime<Utc>,
    pub source_type: SourceType,
    pub list_id: String,
    pub original_item: Box<ListItem>,
}
