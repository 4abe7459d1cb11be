// Integration tests for the SQLite list store

use chrono::Utc;
use rusqlite::Connection;
use tempfile::TempDir;
use tracklist_core::errors::ExErrorKind;
use tracklist_core::model::{
    EntityType, ListItemMetadata, ListItemUpdate, NewListItem, ObsidianPluginMetadata, SourceType,
};
use tracklist_core::ports::{EntityQueryPort, ListCommandPort, ListQueryPort};
use tracklist_store::SqliteListStore;

fn plugin_metadata(plugin_id: &str, downloads: Option<u64>) -> ListItemMetadata {
    ListItemMetadata::ObsidianPlugin(ObsidianPluginMetadata {
        plugin_id: plugin_id.to_string(),
        name: plugin_id.to_string(),
        author: "someone".to_string(),
        description: "a plugin".to_string(),
        repo: format!("someone/{}", plugin_id),
        downloads,
        latest_version: None,
        stats: Default::default(),
        synced_at: Utc::now(),
    })
}

fn new_item(list_id: &str, name: &str) -> NewListItem {
    NewListItem {
        list_id: list_id.to_string(),
        full_name: name.to_string(),
        entity_id: None,
        metadata: plugin_metadata(name, Some(1)),
    }
}

#[test]
fn test_create_and_find_item() {
    let store = SqliteListStore::open_in_memory().unwrap();
    let list = store
        .create("Obsidian Plugins", SourceType::ObsidianPlugin)
        .unwrap();

    let created = store.create_item(new_item(&list.id, "dataview")).unwrap();
    let found = store.find_item(&list.id, "dataview").unwrap().unwrap();

    assert_eq!(found.id, created.id);
    assert_eq!(found.metadata, created.metadata);
    assert!(store.find_item(&list.id, "calendar").unwrap().is_none());
}

#[test]
fn test_duplicate_item_is_already_exists() {
    let store = SqliteListStore::open_in_memory().unwrap();
    let list = store
        .create("Obsidian Plugins", SourceType::ObsidianPlugin)
        .unwrap();

    store.create_item(new_item(&list.id, "dataview")).unwrap();
    let err = store
        .create_item(new_item(&list.id, "dataview"))
        .unwrap_err();

    assert_eq!(err.kind(), ExErrorKind::AlreadyExists);
    assert_eq!(store.items_in_list(&list.id).unwrap().len(), 1);
}

#[test]
fn test_update_replaces_metadata_and_link() {
    let store = SqliteListStore::open_in_memory().unwrap();
    let list = store
        .create("Obsidian Plugins", SourceType::ObsidianPlugin)
        .unwrap();
    let created = store.create_item(new_item(&list.id, "dataview")).unwrap();

    let updated = store
        .update_item(
            &list.id,
            "dataview",
            ListItemUpdate {
                entity_id: Some("entity-1".to_string()),
                metadata: plugin_metadata("dataview", Some(99)),
            },
        )
        .unwrap();

    assert_eq!(updated.id, created.id);
    assert_eq!(updated.entity_id.as_deref(), Some("entity-1"));
    assert!(updated.updated_at >= created.updated_at);
    match &updated.metadata {
        ListItemMetadata::ObsidianPlugin(m) => assert_eq!(m.downloads, Some(99)),
        other => panic!("unexpected metadata {:?}", other),
    }
}

#[test]
fn test_update_missing_item_is_not_found() {
    let store = SqliteListStore::open_in_memory().unwrap();
    let list = store
        .create("Obsidian Plugins", SourceType::ObsidianPlugin)
        .unwrap();
    let err = store
        .update_item(
            &list.id,
            "ghost",
            ListItemUpdate {
                entity_id: None,
                metadata: plugin_metadata("ghost", None),
            },
        )
        .unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::NotFound);
}

#[test]
fn test_metadata_must_match_list_source_type() {
    let store = SqliteListStore::open_in_memory().unwrap();
    let archive = store.create("Archived", SourceType::Archived).unwrap();

    let err = store
        .create_item(new_item(&archive.id, "dataview"))
        .unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::MetadataMismatch);
}

#[test]
fn test_unknown_list_is_not_found() {
    let store = SqliteListStore::open_in_memory().unwrap();
    let err = store.create_item(new_item("missing", "dataview")).unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::NotFound);
}

#[test]
fn test_remove_item_is_idempotent() {
    let store = SqliteListStore::open_in_memory().unwrap();
    let list = store
        .create("Obsidian Plugins", SourceType::ObsidianPlugin)
        .unwrap();
    store.create_item(new_item(&list.id, "dataview")).unwrap();

    store.remove_item(&list.id, "dataview").unwrap();
    store.remove_item(&list.id, "dataview").unwrap();
    assert!(store.items_in_list(&list.id).unwrap().is_empty());
}

#[test]
fn test_find_by_source_type_returns_first_list() {
    let store = SqliteListStore::open_in_memory().unwrap();
    assert!(store
        .find_by_source_type(SourceType::ObsidianTheme)
        .unwrap()
        .is_none());

    let list = store
        .create("Obsidian Themes", SourceType::ObsidianTheme)
        .unwrap();
    let found = store
        .find_by_source_type(SourceType::ObsidianTheme)
        .unwrap()
        .unwrap();
    assert_eq!(found, list);
}

#[test]
fn test_canonical_entity_lookup_is_normalized() {
    let store = SqliteListStore::open_in_memory().unwrap();
    let first = store
        .insert_entity(EntityType::GithubRepository, "Acme/Widget")
        .unwrap();
    let again = store
        .insert_entity(EntityType::GithubRepository, "acme/widget")
        .unwrap();
    assert_eq!(first.id, again.id);

    let found = store
        .find_by_name(EntityType::GithubRepository, "  ACME/widget/ ")
        .unwrap()
        .unwrap();
    assert_eq!(found.id, first.id);
    assert!(store
        .find_by_name(EntityType::ObsidianPlugin, "acme/widget")
        .unwrap()
        .is_none());
}

#[test]
fn test_undecodable_metadata_row_is_serialization_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("lists.db");
    let list_id = {
        let store = SqliteListStore::open(&path).unwrap();
        let list = store
            .create("Obsidian Plugins", SourceType::ObsidianPlugin)
            .unwrap();
        store.create_item(new_item(&list.id, "dataview")).unwrap();
        list.id
    };

    let conn = Connection::open(&path).unwrap();
    conn.execute(
        "UPDATE list_items SET metadata = '{\"type\":\"npm-package\"}'",
        [],
    )
    .unwrap();
    drop(conn);

    let store = SqliteListStore::open(&path).unwrap();
    let err = store.find_item(&list_id, "dataview").unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::Serialization);
}

#[test]
fn test_items_survive_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("lists.db");

    let list_id = {
        let store = SqliteListStore::open(&path).unwrap();
        let list = store
            .create("Obsidian Plugins", SourceType::ObsidianPlugin)
            .unwrap();
        store.create_item(new_item(&list.id, "dataview")).unwrap();
        store.create_item(new_item(&list.id, "calendar")).unwrap();
        list.id
    };

    let store = SqliteListStore::open(&path).unwrap();
    let names: Vec<_> = store
        .items_in_list(&list_id)
        .unwrap()
        .into_iter()
        .map(|i| i.full_name)
        .collect();
    assert_eq!(names, vec!["calendar".to_string(), "dataview".to_string()]);
}
