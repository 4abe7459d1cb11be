//! Explicit entity-type registry.
//!
//! Maps each entity type to its field classification, staleness threshold
//! and snapshot retention. Passed explicitly to the history service and
//! batch driver.

#![allow(clippy::result_large_err)]

use chrono::Duration;
use std::collections::BTreeMap;

use crate::config::TrackerConfig;
use crate::detector::ChangeDetectorConfig;
use crate::errors::{Result, TrackerError};
use crate::model::{EntityType, SourceType};

#[derive(Debug, Clone, PartialEq)]
pub struct EntityTypeSpec {
    pub entity_type: EntityType,
    pub detector: ChangeDetectorConfig,
    pub snapshot_retention: usize,
}

impl EntityTypeSpec {
    /// Source type of the list items produced for this entity type
    pub fn source_type(&self) -> SourceType {
        self.entity_type.source_type()
    }
}

#[derive(Debug, Clone)]
pub struct EntityRegistry {
    entries: BTreeMap<EntityType, EntityTypeSpec>,
}

const DEFAULT_RETENTION: usize = 5;

impl EntityRegistry {
    /// Registry with the built-in field classification for every entity type
    pub fn builtin() -> Self {
        let mut entries = BTreeMap::new();

        entries.insert(
            EntityType::GithubRepository,
            EntityTypeSpec {
                entity_type: EntityType::GithubRepository,
                detector: ChangeDetectorConfig::new(EntityType::GithubRepository.as_str())
                    .structural([
                        "full_name",
                        "name",
                        "owner.login",
                        "description",
                        "homepage",
                        "topics",
                        "language",
                        "license.spdx_id",
                        "archived",
                        "fork",
                        "default_branch",
                    ])
                    .volatile([
                        "stargazers_count",
                        "forks_count",
                        "open_issues_count",
                        "watchers_count",
                        "pushed_at",
                    ]),
                snapshot_retention: DEFAULT_RETENTION,
            },
        );

        entries.insert(
            EntityType::ObsidianPlugin,
            EntityTypeSpec {
                entity_type: EntityType::ObsidianPlugin,
                detector: ChangeDetectorConfig::new(EntityType::ObsidianPlugin.as_str())
                    .structural(["id", "name", "author", "description", "repo"])
                    .volatile(["stats"]),
                snapshot_retention: DEFAULT_RETENTION,
            },
        );

        entries.insert(
            EntityType::ObsidianTheme,
            EntityTypeSpec {
                entity_type: EntityType::ObsidianTheme,
                detector: ChangeDetectorConfig::new(EntityType::ObsidianTheme.as_str())
                    .structural(["name", "author", "repo", "modes"])
                    .volatile(["screenshot"]),
                snapshot_retention: DEFAULT_RETENTION,
            },
        );

        Self { entries }
    }

    /// Built-in registry with retention and staleness overrides applied
    pub fn from_config(config: &TrackerConfig) -> Self {
        let mut registry = Self::builtin();
        for spec in registry.entries.values_mut() {
            spec.snapshot_retention = config.snapshot_retention;
            if let Some(overrides) = config.overrides_for(spec.entity_type) {
                if let Some(hours) = overrides.staleness_hours {
                    spec.detector.staleness_threshold = Duration::hours(hours);
                }
                if let Some(retention) = overrides.snapshot_retention {
                    spec.snapshot_retention = retention;
                }
            }
        }
        registry
    }

    /// Replace or add an entry
    pub fn register(&mut self, spec: EntityTypeSpec) -> Result<()> {
        spec.detector.validate()?;
        self.entries.insert(spec.entity_type, spec);
        Ok(())
    }

    /// Look up an entity type
    ///
    /// # Errors
    ///
    /// - `UnknownEntityType` — not registered
    pub fn get(&self, entity_type: EntityType) -> Result<&EntityTypeSpec> {
        self.entries.get(&entity_type).ok_or_else(|| {
            TrackerError::UnknownEntityType {
                entity_type: entity_type.to_string(),
            }
            .into()
        })
    }

    pub fn entity_types(&self) -> impl Iterator<Item = EntityType> + '_ {
        self.entries.keys().copied()
    }
}

impl Default for EntityRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EntityOverride;

    #[test]
    fn test_builtin_specs_are_valid() {
        let registry = EntityRegistry::builtin();
        for t in EntityType::ALL {
            let spec = registry.get(t).unwrap();
            assert!(spec.detector.validate().is_ok(), "{} invalid", t);
            assert_eq!(spec.detector.staleness_threshold, Duration::hours(24));
        }
    }

    #[test]
    fn test_plugin_stats_are_volatile() {
        let registry = EntityRegistry::builtin();
        let plugin = registry.get(EntityType::ObsidianPlugin).unwrap();
        assert_eq!(plugin.detector.volatile_fields, vec!["stats".to_string()]);
    }

    #[test]
    fn test_config_overrides_applied() {
        let mut config = TrackerConfig {
            snapshot_retention: 7,
            ..TrackerConfig::default()
        };
        config.entity.insert(
            "obsidian-theme".to_string(),
            EntityOverride {
                staleness_hours: Some(6),
                snapshot_retention: Some(2),
            },
        );

        let registry = EntityRegistry::from_config(&config);
        let theme = registry.get(EntityType::ObsidianTheme).unwrap();
        assert_eq!(theme.detector.staleness_threshold, Duration::hours(6));
        assert_eq!(theme.snapshot_retention, 2);

        let repo = registry.get(EntityType::GithubRepository).unwrap();
        assert_eq!(repo.snapshot_retention, 7);
    }

    #[test]
    fn test_register_rejects_invalid_detector() {
        let mut registry = EntityRegistry::builtin();
        let err = registry
            .register(EntityTypeSpec {
                entity_type: EntityType::ObsidianPlugin,
                detector: ChangeDetectorConfig::new("obsidian-plugin"),
                snapshot_retention: 1,
            })
            .unwrap_err();
        assert_eq!(err.kind(), crate::errors::ExErrorKind::InvalidConfig);
    }
}
