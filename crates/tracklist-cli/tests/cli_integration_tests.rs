//! CLI integration tests
//!
//! Seed a data directory through the library crates, then drive the built
//! binary against it.

use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::sync::Arc;
use tempfile::TempDir;
use tracklist_core::model::{EntityType, GithubRepository};
use tracklist_core::{AuxiliaryContext, EntityRegistry, SystemClock, TrackerConfig};
use tracklist_engine::{builder_for, HistoryService, ReconciliationHandler};
use tracklist_store::SqliteListStore;

fn write_config(dir: &TempDir) -> (PathBuf, TrackerConfig) {
    let data_dir = dir.path().join("data");
    let contents = format!("data_dir = '{}'\n", data_dir.display());
    let path = dir.path().join("tracklist.toml");
    std::fs::write(&path, &contents).unwrap();
    (path, TrackerConfig::from_toml_str(&contents).unwrap())
}

fn repo(stars: u64) -> GithubRepository {
    serde_json::from_value(json!({
        "full_name": "acme/widget",
        "name": "widget",
        "owner": { "login": "acme" },
        "html_url": "https://github.com/acme/widget",
        "stargazers_count": stars
    }))
    .unwrap()
}

/// Two changes for acme/widget (add, then soft) reconciled into the list store
fn seed(config: &TrackerConfig) {
    let registry = EntityRegistry::from_config(config);
    let history: HistoryService<GithubRepository> = HistoryService::open(
        config,
        &registry,
        EntityType::GithubRepository,
        Arc::new(SystemClock),
    )
    .unwrap();

    let store = Arc::new(SqliteListStore::open(config.list_db_path()).unwrap());
    let mut handler = ReconciliationHandler::new(
        builder_for(EntityType::GithubRepository),
        store.clone(),
        store.clone(),
        store,
    );
    handler.set_list().unwrap();
    handler.prepare_run(AuxiliaryContext::new()).unwrap();

    let first = repo(10);
    let add = history.track_changes("acme/widget", &first, None).unwrap().unwrap();
    handler.handle(&add.to_value().unwrap()).unwrap();
    let soft = history
        .track_changes("acme/widget", &repo(12), Some(&first))
        .unwrap()
        .unwrap();
    handler.handle(&soft.to_value().unwrap()).unwrap();
}

fn run(config_path: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_tracklist"))
        .arg("--config")
        .arg(config_path)
        .args(args)
        .env_remove("TRACKLIST_CONFIG")
        .output()
        .expect("Failed to execute CLI")
}

fn assert_success(output: &Output) {
    assert!(
        output.status.success(),
        "CLI command should succeed. Stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
}

#[test]
fn test_history_renders_changes_newest_first() {
    let dir = TempDir::new().unwrap();
    let (config_path, config) = write_config(&dir);
    seed(&config);

    let output = run(&config_path, &["history", "github-repository"]);
    assert_success(&output);

    let changes: Vec<Value> = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(changes.len(), 2);
    assert_eq!(changes[0]["type"], "soft");
    assert_eq!(changes[1]["type"], "add");
    assert_eq!(changes[0]["data"]["stargazers_count"], 12);
    assert_eq!(
        changes[0]["changed_fields"]["volatile"],
        json!(["stargazers_count"])
    );
    assert!(changes[1].get("changed_fields").is_none());
    for change in &changes {
        assert!(change["id"].is_string());
        assert!(change["timestamp"].is_string());
    }
}

#[test]
fn test_history_filters_by_type_and_limit() {
    let dir = TempDir::new().unwrap();
    let (config_path, config) = write_config(&dir);
    seed(&config);

    let output = run(&config_path, &["history", "github-repository", "--type", "add"]);
    assert_success(&output);
    let changes: Vec<Value> = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0]["type"], "add");

    let output = run(&config_path, &["history", "github-repository", "--limit", "1"]);
    assert_success(&output);
    let changes: Vec<Value> = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0]["type"], "soft");
}

#[test]
fn test_history_for_untracked_type_is_empty() {
    let dir = TempDir::new().unwrap();
    let (config_path, _) = write_config(&dir);

    let output = run(&config_path, &["history", "obsidian-theme"]);
    assert_success(&output);
    let changes: Vec<Value> = serde_json::from_slice(&output.stdout).unwrap();
    assert!(changes.is_empty());
}

#[test]
fn test_unknown_entity_type_fails() {
    let dir = TempDir::new().unwrap();
    let (config_path, _) = write_config(&dir);

    let output = run(&config_path, &["history", "gitlab-project"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Error"));
}

#[test]
fn test_snapshot_show_prints_latest() {
    let dir = TempDir::new().unwrap();
    let (config_path, config) = write_config(&dir);
    seed(&config);

    let output = run(
        &config_path,
        &["snapshot", "show", "github-repository", "acme/widget"],
    );
    assert_success(&output);
    let snapshot: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(snapshot["identifier"], "acme/widget");
    assert_eq!(snapshot["data"]["stargazers_count"], 12);

    let output = run(
        &config_path,
        &["snapshot", "show", "github-repository", "acme/widget", "--all"],
    );
    assert_success(&output);
    let revisions: Vec<Value> = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(revisions.len(), 2);
    assert_eq!(revisions[0]["data"]["stargazers_count"], 10);
}

#[test]
fn test_snapshot_ls_lists_identifiers() {
    let dir = TempDir::new().unwrap();
    let (config_path, config) = write_config(&dir);
    seed(&config);

    let output = run(&config_path, &["snapshot", "ls", "github-repository"]);
    assert_success(&output);
    assert!(String::from_utf8_lossy(&output.stdout).contains("acme/widget"));

    // Just written, so nothing is stale
    let output = run(&config_path, &["snapshot", "ls", "github-repository", "--stale"]);
    assert_success(&output);
    assert!(String::from_utf8_lossy(&output.stdout).trim().is_empty());
}

#[test]
fn test_list_items_shows_reconciled_item() {
    let dir = TempDir::new().unwrap();
    let (config_path, config) = write_config(&dir);
    seed(&config);

    let output = run(&config_path, &["list", "ls"]);
    assert_success(&output);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("GitHub Repositories") || stdout.contains("github-repository"));
    assert!(stdout.contains("1 items"));

    let output = run(&config_path, &["list", "items", "github-repository", "--json"]);
    assert_success(&output);
    let items: Vec<Value> = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["full_name"], "acme/widget");
    assert_eq!(items[0]["metadata"]["stats"]["stars"], 12);
}

#[test]
fn test_list_without_store_fails() {
    let dir = TempDir::new().unwrap();
    let (config_path, _) = write_config(&dir);

    let output = run(&config_path, &["list", "ls"]);
    assert!(!output.status.success());
}
