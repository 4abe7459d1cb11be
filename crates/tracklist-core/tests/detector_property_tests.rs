#![allow(clippy::unwrap_used)]

use proptest::prelude::*;
use serde_json::{json, Value};
use tracklist_core::detector::{classify, ChangeDetectorConfig, Classification};
use tracklist_core::registry::EntityRegistry;
use tracklist_core::EntityType;

fn config() -> ChangeDetectorConfig {
    ChangeDetectorConfig::new("test")
        .structural(["name", "topics"])
        .volatile(["stars"])
}

fn entity(name: &str, topics: &[String], stars: u64, size: u64) -> Value {
    json!({"name": name, "topics": topics, "stars": stars, "size": size})
}

#[test]
fn test_classification_table() {
    let cfg = config();
    let base = entity("widget", &[], 10, 1);

    assert_eq!(
        classify(None, &base, &cfg).unwrap(),
        Classification::Add
    );
    assert_eq!(
        classify(Some(&base), &entity("widget", &[], 11, 1), &cfg).unwrap(),
        Classification::Soft
    );
    assert_eq!(
        classify(Some(&base), &entity("gadget", &[], 10, 1), &cfg).unwrap(),
        Classification::Full
    );
    assert_eq!(
        classify(Some(&base), &entity("widget", &[], 10, 99), &cfg).unwrap(),
        Classification::Unchanged
    );
}

#[test]
fn test_builtin_repository_classification() {
    let registry = EntityRegistry::builtin();
    let cfg = &registry.get(EntityType::GithubRepository).unwrap().detector;
    let before = json!({
        "full_name": "acme/widget",
        "name": "widget",
        "owner": {"login": "acme"},
        "topics": ["cli", "rust"],
        "stargazers_count": 10
    });

    let mut stars = before.clone();
    stars["stargazers_count"] = json!(12);
    assert_eq!(classify(Some(&before), &stars, cfg).unwrap(), Classification::Soft);

    let mut owner = before.clone();
    owner["owner"]["login"] = json!("acme-labs");
    assert_eq!(classify(Some(&before), &owner, cfg).unwrap(), Classification::Full);

    let mut reordered = before.clone();
    reordered["topics"] = json!(["rust", "cli"]);
    assert_eq!(
        classify(Some(&before), &reordered, cfg).unwrap(),
        Classification::Unchanged
    );
}

proptest! {
    #[test]
    fn prop_identical_versions_are_unchanged(
        name in "[a-z]{1,12}",
        topics in prop::collection::vec("[a-z]{1,8}", 0..6),
        stars in any::<u64>(),
        size in any::<u64>(),
    ) {
        let v = entity(&name, &topics, stars, size);
        prop_assert_eq!(classify(Some(&v), &v, &config()).unwrap(), Classification::Unchanged);
    }

    #[test]
    fn prop_topic_order_never_matters(
        topics in prop::collection::vec("[a-z]{1,8}", 0..8),
        stars in any::<u64>(),
    ) {
        let mut reversed = topics.clone();
        reversed.reverse();
        let a = entity("w", &topics, stars, 0);
        let b = entity("w", &reversed, stars, 0);
        prop_assert_eq!(classify(Some(&a), &b, &config()).unwrap(), Classification::Unchanged);
    }

    #[test]
    fn prop_volatile_only_change_is_soft(
        name in "[a-z]{1,12}",
        stars in 0u64..1_000_000,
        delta in 1u64..1000,
    ) {
        let a = entity(&name, &[], stars, 0);
        let b = entity(&name, &[], stars + delta, 0);
        prop_assert_eq!(classify(Some(&a), &b, &config()).unwrap(), Classification::Soft);
    }

    #[test]
    fn prop_structural_change_dominates(
        name in "[a-z]{1,12}",
        stars_a in any::<u64>(),
        stars_b in any::<u64>(),
    ) {
        let a = entity(&name, &[], stars_a, 0);
        let b = entity(&format!("{}-renamed", name), &[], stars_b, 0);
        prop_assert_eq!(classify(Some(&a), &b, &config()).unwrap(), Classification::Full);
    }
}
