use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::TrackerError;

/// Kind of externally-sourced entity tracked by the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EntityType {
    GithubRepository,
    ObsidianPlugin,
    ObsidianTheme,
}

impl EntityType {
    pub const ALL: [EntityType; 3] = [
        EntityType::GithubRepository,
        EntityType::ObsidianPlugin,
        EntityType::ObsidianTheme,
    ];

    /// Stable name used in storage paths, list names and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::GithubRepository => "github-repository",
            EntityType::ObsidianPlugin => "obsidian-plugin",
            EntityType::ObsidianTheme => "obsidian-theme",
        }
    }

    /// Source type of the list this entity type reconciles into
    pub fn source_type(&self) -> SourceType {
        match self {
            EntityType::GithubRepository => SourceType::GithubRepository,
            EntityType::ObsidianPlugin => SourceType::ObsidianPlugin,
            EntityType::ObsidianTheme => SourceType::ObsidianTheme,
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityType {
    type Err = TrackerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EntityType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| TrackerError::UnknownEntityType {
                entity_type: s.to_string(),
            })
    }
}

/// Discriminator of a list: one list per entity type, plus the shared archive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceType {
    GithubRepository,
    ObsidianPlugin,
    ObsidianTheme,
    Archived,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::GithubRepository => "github-repository",
            SourceType::ObsidianPlugin => "obsidian-plugin",
            SourceType::ObsidianTheme => "obsidian-theme",
            SourceType::Archived => "archived",
        }
    }

    /// Default display name for the list backing this source type
    pub fn list_name(&self) -> &'static str {
        match self {
            SourceType::GithubRepository => "GitHub Repositories",
            SourceType::ObsidianPlugin => "Obsidian Plugins",
            SourceType::ObsidianTheme => "Obsidian Themes",
            SourceType::Archived => "Archived",
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceType {
    type Err = TrackerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "github-repository" => Ok(SourceType::GithubRepository),
            "obsidian-plugin" => Ok(SourceType::ObsidianPlugin),
            "obsidian-theme" => Ok(SourceType::ObsidianTheme),
            "archived" => Ok(SourceType::Archived),
            other => Err(TrackerError::UnknownEntityType {
                entity_type: other.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_type_names_parse_back() {
        for t in EntityType::ALL {
            assert_eq!(t.as_str().parse::<EntityType>().unwrap(), t);
            assert_eq!(t.source_type().as_str(), t.as_str());
        }
    }

    #[test]
    fn test_unknown_entity_type_rejected() {
        let err = "npm-package".parse::<EntityType>().unwrap_err();
        assert!(matches!(err, TrackerError::UnknownEntityType { .. }));
    }

    #[test]
    fn test_serde_uses_kebab_case() {
        let json = serde_json::to_string(&SourceType::Archived).unwrap();
        assert_eq!(json, "\"archived\"");
        let json = serde_json::to_string(&EntityType::ObsidianPlugin).unwrap();
        assert_eq!(json, "\"obsidian-plugin\"");
    }
}
