//! Per-entity-type metadata builders.

#![allow(clippy::result_large_err)]

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracklist_core::auxiliary::AuxiliaryContext;
use tracklist_core::errors::Result;
use tracklist_core::model::{
    CanonicalEntity, Change, EntityType, GithubRepository, GithubRepositoryMetadata,
    ListItemMetadata, ObsidianPlugin, ObsidianPluginMetadata, ObsidianTheme,
    ObsidianThemeMetadata, PluginStats, RepositoryStats,
};

/// Turns a change into list item metadata for one entity type
pub trait MetadataBuilder: Send + Sync {
    fn entity_type(&self) -> EntityType;

    /// Fresh metadata from the change data, merged with run context
    fn create_metadata(
        &self,
        change: &Change<Value>,
        entity: Option<&CanonicalEntity>,
        context: &AuxiliaryContext,
        now: DateTime<Utc>,
    ) -> Result<ListItemMetadata>;

    /// Top-level metadata keys a soft change may overwrite in place
    fn volatile_keys(&self) -> &'static [&'static str];

    /// Join run context into freshly fetched data before it is tracked, so
    /// context-only values take part in change detection
    fn enrich(
        &self,
        data: Value,
        _previous: Option<&Value>,
        _context: &AuxiliaryContext,
    ) -> Result<Value> {
        Ok(data)
    }
}

/// Builder for the given entity type
pub fn builder_for(entity_type: EntityType) -> Box<dyn MetadataBuilder> {
    match entity_type {
        EntityType::GithubRepository => Box::new(GithubRepositoryBuilder),
        EntityType::ObsidianPlugin => Box::new(ObsidianPluginBuilder),
        EntityType::ObsidianTheme => Box::new(ObsidianThemeBuilder),
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct GithubRepositoryBuilder;

impl MetadataBuilder for GithubRepositoryBuilder {
    fn entity_type(&self) -> EntityType {
        EntityType::GithubRepository
    }

    fn create_metadata(
        &self,
        change: &Change<Value>,
        _entity: Option<&CanonicalEntity>,
        _context: &AuxiliaryContext,
        now: DateTime<Utc>,
    ) -> Result<ListItemMetadata> {
        let repo = change.decode::<GithubRepository>()?.data;
        Ok(ListItemMetadata::GithubRepository(GithubRepositoryMetadata {
            full_name: repo.full_name,
            name: repo.name,
            owner: repo.owner.login,
            description: repo.description,
            homepage: repo.homepage,
            url: repo.html_url,
            topics: repo.topics,
            language: repo.language,
            license: repo.license.map(|l| l.spdx_id.unwrap_or(l.name)),
            archived: repo.archived,
            fork: repo.fork,
            stats: RepositoryStats {
                stars: repo.stargazers_count,
                forks: repo.forks_count,
                open_issues: repo.open_issues_count,
                watchers: repo.watchers_count,
            },
            pushed_at: repo.pushed_at,
            synced_at: now,
        }))
    }

    fn volatile_keys(&self) -> &'static [&'static str] {
        &["stats", "pushed_at", "synced_at"]
    }
}

/// Plugin metadata also folds in download stats from the run context,
/// keyed by plugin id
#[derive(Debug, Clone, Copy, Default)]
pub struct ObsidianPluginBuilder;

impl MetadataBuilder for ObsidianPluginBuilder {
    fn entity_type(&self) -> EntityType {
        EntityType::ObsidianPlugin
    }

    fn create_metadata(
        &self,
        change: &Change<Value>,
        _entity: Option<&CanonicalEntity>,
        context: &AuxiliaryContext,
        now: DateTime<Utc>,
    ) -> Result<ListItemMetadata> {
        let plugin = change.decode::<ObsidianPlugin>()?.data;
        let stats = match plugin.stats {
            Some(stats) => Some(stats),
            None => context.get::<PluginStats>(&plugin.id)?,
        };

        let (downloads, latest_version, versions) = match stats {
            Some(stats) => (
                Some(stats.downloads),
                stats.latest_version().map(str::to_string),
                stats.versions,
            ),
            None => (None, None, Default::default()),
        };

        Ok(ListItemMetadata::ObsidianPlugin(ObsidianPluginMetadata {
            plugin_id: plugin.id,
            name: plugin.name,
            author: plugin.author,
            description: plugin.description,
            repo: plugin.repo,
            downloads,
            latest_version,
            stats: versions,
            synced_at: now,
        }))
    }

    fn volatile_keys(&self) -> &'static [&'static str] {
        &["downloads", "latest_version", "stats", "synced_at"]
    }

    /// Sets `stats` from the run context, keeping the last known stats when
    /// the context has none for this plugin
    fn enrich(
        &self,
        mut data: Value,
        previous: Option<&Value>,
        context: &AuxiliaryContext,
    ) -> Result<Value> {
        let Some(id) = data.get("id").and_then(Value::as_str).map(str::to_string) else {
            return Ok(data);
        };
        let stats = match context.get::<Value>(&id)? {
            Some(stats) => Some(stats),
            None => previous.and_then(|p| p.get("stats")).cloned(),
        };
        if let (Some(stats), Some(fields)) = (stats, data.as_object_mut()) {
            fields.insert("stats".to_string(), stats);
        }
        Ok(data)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ObsidianThemeBuilder;

impl MetadataBuilder for ObsidianThemeBuilder {
    fn entity_type(&self) -> EntityType {
        EntityType::ObsidianTheme
    }

    fn create_metadata(
        &self,
        change: &Change<Value>,
        _entity: Option<&CanonicalEntity>,
        _context: &AuxiliaryContext,
        now: DateTime<Utc>,
    ) -> Result<ListItemMetadata> {
        let theme = change.decode::<ObsidianTheme>()?.data;
        Ok(ListItemMetadata::ObsidianTheme(ObsidianThemeMetadata {
            name: theme.name,
            author: theme.author,
            repo: theme.repo,
            modes: theme.modes,
            screenshot: theme.screenshot,
            synced_at: now,
        }))
    }

    fn volatile_keys(&self) -> &'static [&'static str] {
        &["screenshot", "synced_at"]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tracklist_core::model::ChangeType;

    #[test]
    fn test_plugin_metadata_uses_run_stats() {
        let mut context = AuxiliaryContext::new();
        let stats: PluginStats = serde_json::from_value(json!({
            "downloads": 5000,
            "updated": 1700000000,
            "0.9.0": 1000,
            "1.2.0": 4000
        }))
        .unwrap();
        context.insert("dataview", &stats).unwrap();

        let change = Change::new(
            "dataview",
            ChangeType::Add,
            json!({
                "id": "dataview",
                "name": "Dataview",
                "author": "blacksmithgu",
                "description": "Query your vault",
                "repo": "blacksmithgu/obsidian-dataview"
            }),
            None,
            Utc::now(),
        );

        let metadata = ObsidianPluginBuilder
            .create_metadata(&change, None, &context, Utc::now())
            .unwrap();
        match metadata {
            ListItemMetadata::ObsidianPlugin(m) => {
                assert_eq!(m.downloads, Some(5000));
                assert_eq!(m.latest_version.as_deref(), Some("1.2.0"));
                assert_eq!(m.stats.len(), 2);
            }
            other => panic!("unexpected metadata {:?}", other),
        }
    }

    #[test]
    fn test_plugin_enrich_joins_stats_or_keeps_previous() {
        let mut context = AuxiliaryContext::new();
        context
            .insert("dataview", &json!({"downloads": 900, "1.0.0": 900}))
            .unwrap();
        let entry = json!({"id": "dataview", "name": "Dataview"});

        let enriched = ObsidianPluginBuilder
            .enrich(entry.clone(), None, &context)
            .unwrap();
        assert_eq!(enriched["stats"]["downloads"], 900);

        let previous = json!({"id": "calendar", "stats": {"downloads": 12}});
        let kept = ObsidianPluginBuilder
            .enrich(
                json!({"id": "calendar", "name": "Calendar"}),
                Some(&previous),
                &context,
            )
            .unwrap();
        assert_eq!(kept["stats"]["downloads"], 12);

        let repo = GithubRepositoryBuilder
            .enrich(entry.clone(), None, &context)
            .unwrap();
        assert_eq!(repo, entry);
    }

    #[test]
    fn test_repository_license_prefers_spdx() {
        let change = Change::new(
            "acme/widget",
            ChangeType::Add,
            json!({
                "full_name": "acme/widget",
                "name": "widget",
                "owner": {"login": "acme"},
                "html_url": "https://github.com/acme/widget",
                "license": {"spdx_id": "MIT", "name": "MIT License"},
                "stargazers_count": 10
            }),
            None,
            Utc::now(),
        );
        let metadata = GithubRepositoryBuilder
            .create_metadata(&change, None, &AuxiliaryContext::new(), Utc::now())
            .unwrap();
        match metadata {
            ListItemMetadata::GithubRepository(m) => {
                assert_eq!(m.license.as_deref(), Some("MIT"));
                assert_eq!(m.stats.stars, 10);
                assert_eq!(m.owner, "acme");
            }
            other => panic!("unexpected metadata {:?}", other),
        }
    }

    #[test]
    fn test_undecodable_change_is_serialization_error() {
        let change = Change::new("x", ChangeType::Add, json!({"id": 1}), None, Utc::now());
        let err = ObsidianThemeBuilder
            .create_metadata(&change, None, &AuxiliaryContext::new(), Utc::now())
            .unwrap_err();
        assert_eq!(err.kind(), tracklist_core::errors::ExErrorKind::Serialization);
    }
}
