#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

use tracklist_core::clock::ManualClock;
use tracklist_core::model::{EntityType, GithubRepository, ObsidianPlugin};
use tracklist_core::ports::{FetchError, Fetcher};
use tracklist_core::registry::EntityRegistry;
use tracklist_engine::HistoryService;
use tracklist_store::{FsSnapshotStore, SqliteChangeLog};

pub fn repo(full_name: &str, stars: u64, description: &str) -> GithubRepository {
    let (owner, name) = full_name.split_once('/').unwrap_or(("acme", full_name));
    serde_json::from_value(json!({
        "full_name": full_name,
        "name": name,
        "owner": { "login": owner },
        "description": description,
        "html_url": format!("https://github.com/{}", full_name),
        "topics": ["cli"],
        "stargazers_count": stars
    }))
    .unwrap()
}

pub fn plugin(id: &str, description: &str) -> ObsidianPlugin {
    serde_json::from_value(json!({
        "id": id,
        "name": id,
        "author": "someone",
        "description": description,
        "repo": format!("someone/obsidian-{}", id)
    }))
    .unwrap()
}

pub fn manual_clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap(),
    ))
}

pub fn repo_history(dir: &TempDir, clock: Arc<ManualClock>) -> HistoryService<GithubRepository> {
    history(dir, clock, EntityType::GithubRepository)
}

pub fn history<T>(
    dir: &TempDir,
    clock: Arc<ManualClock>,
    entity_type: EntityType,
) -> HistoryService<T>
where
    T: Serialize + DeserializeOwned + Clone,
{
    let registry = EntityRegistry::builtin();
    let spec = registry.get(entity_type).unwrap();
    let store = FsSnapshotStore::new(
        dir.path().join("snapshots"),
        entity_type,
        spec.snapshot_retention,
    )
    .with_clock(clock);
    let change_log = SqliteChangeLog::open(dir.path().join("changes"), entity_type).unwrap();
    HistoryService::new(store, change_log, spec.detector.clone()).unwrap()
}

/// Fetcher answering from a scripted table and counting calls
pub struct ScriptedFetcher<T = GithubRepository> {
    responses: Mutex<HashMap<String, Result<T, FetchError>>>,
    calls: AtomicUsize,
}

impl<T> Default for ScriptedFetcher<T> {
    fn default() -> Self {
        Self {
            responses: Mutex::new(HashMap::new()),
            calls: AtomicUsize::new(0),
        }
    }
}

impl<T> ScriptedFetcher<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, identifier: &str, response: Result<T, FetchError>) {
        self.responses
            .lock()
            .unwrap()
            .insert(identifier.to_string(), response);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<T> Fetcher<T> for ScriptedFetcher<T>
where
    T: Clone + Send + Sync + 'static,
{
    async fn fetch(&self, identifier: &str) -> Result<T, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.responses
            .lock()
            .unwrap()
            .get(identifier)
            .cloned()
            .unwrap_or_else(|| {
                Err(FetchError::NotFound {
                    identifier: identifier.to_string(),
                })
            })
    }
}
