// Integration tests for the filesystem snapshot store

use chrono::{Duration, TimeZone, Utc};
use serde_json::{json, Value};
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;
use tracklist_core::clock::{Clock, ManualClock};
use tracklist_core::model::{EntityType, Snapshot};
use tracklist_store::snapshot::identifier_digest;
use tracklist_store::FsSnapshotStore;

fn setup(retention: usize) -> (FsSnapshotStore, Arc<ManualClock>, TempDir) {
    let dir = TempDir::new().expect("temp dir");
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
    ));
    let store = FsSnapshotStore::new(dir.path(), EntityType::GithubRepository, retention)
        .with_clock(clock.clone());
    (store, clock, dir)
}

#[test]
fn test_retention_keeps_newest_revisions() {
    let (store, clock, _dir) = setup(3);

    for stars in 0..5 {
        store.write("acme/widget", &json!({ "stars": stars })).unwrap();
        clock.advance(Duration::minutes(1));
    }

    let history: Vec<Snapshot<Value>> = store.history("acme/widget").unwrap();
    let stars: Vec<_> = history.iter().map(|s| s.data["stars"].clone()).collect();
    assert_eq!(stars, vec![json!(2), json!(3), json!(4)]);

    let latest: Snapshot<Value> = store.get_latest("acme/widget").unwrap().unwrap();
    assert_eq!(latest.data, json!({ "stars": 4 }));
}

#[test]
fn test_stored_at_comes_from_clock() {
    let (store, clock, _dir) = setup(5);
    let written = store.write("acme/widget", &json!({})).unwrap();
    assert_eq!(written.stored_at, clock.now());

    clock.advance(Duration::hours(2));
    let touched = store.touch("acme/widget", &json!({})).unwrap();
    let latest: Snapshot<Value> = store.get_latest("acme/widget").unwrap().unwrap();
    assert_eq!(latest.stored_at, touched.stored_at);
    assert_eq!(latest.stored_at - written.stored_at, Duration::hours(2));
}

#[test]
fn test_layout_is_sharded_by_digest() {
    let (store, _clock, dir) = setup(5);
    store.write("acme/widget", &json!({})).unwrap();

    let digest = identifier_digest("acme/widget");
    let revision = dir
        .path()
        .join("github-repository")
        .join(&digest[..2])
        .join(&digest)
        .join("0000000001.json");
    assert!(revision.exists(), "missing {}", revision.display());
}

#[test]
fn test_corrupt_latest_reads_as_absent() {
    let (store, _clock, dir) = setup(5);
    store.write("acme/widget", &json!({ "stars": 1 })).unwrap();

    let digest = identifier_digest("acme/widget");
    let revision = dir
        .path()
        .join("github-repository")
        .join(&digest[..2])
        .join(&digest)
        .join("0000000001.json");
    fs::write(&revision, b"{ not json").unwrap();

    let latest: Option<Snapshot<Value>> = store.get_latest("acme/widget").unwrap();
    assert!(latest.is_none());

    // Writing again recovers with a fresh revision
    store.write("acme/widget", &json!({ "stars": 2 })).unwrap();
    let latest: Snapshot<Value> = store.get_latest("acme/widget").unwrap().unwrap();
    assert_eq!(latest.data, json!({ "stars": 2 }));
}

#[test]
fn test_typed_mismatch_reads_as_absent() {
    #[derive(serde::Deserialize)]
    #[allow(dead_code)]
    struct Strict {
        required: String,
    }

    let (store, _clock, _dir) = setup(5);
    store.write("acme/widget", &json!({ "other": 1 })).unwrap();
    let latest: Option<Snapshot<Strict>> = store.get_latest("acme/widget").unwrap();
    assert!(latest.is_none());
}

#[test]
fn test_identifiers_lists_every_tracked_entity() {
    let (store, _clock, _dir) = setup(5);
    store.write("zeta/tool", &json!({})).unwrap();
    store.write("acme/widget", &json!({})).unwrap();
    store.write("acme/widget", &json!({ "v": 2 })).unwrap();

    assert_eq!(
        store.identifiers().unwrap(),
        vec!["acme/widget".to_string(), "zeta/tool".to_string()]
    );
}

#[test]
fn test_entity_types_are_isolated() {
    let dir = TempDir::new().unwrap();
    let repos = FsSnapshotStore::new(dir.path(), EntityType::GithubRepository, 5);
    let themes = FsSnapshotStore::new(dir.path(), EntityType::ObsidianTheme, 5);

    repos.write("acme/widget", &json!({})).unwrap();
    let theme: Option<Snapshot<Value>> = themes.get_latest("acme/widget").unwrap();
    assert!(theme.is_none());
}
