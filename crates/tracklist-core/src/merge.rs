//! Soft-change merge policy.
//!
//! A soft change normally shallow-merges volatile keys into the existing
//! metadata. When an object sub-structure changes shape (its key set differs),
//! the merge is abandoned in favour of a full rebuild. Key sets are compared
//! symmetrically, so a map that keeps its size but swaps keys still counts.

use serde_json::{Map, Value};
use std::collections::BTreeSet;

/// Outcome of attempting a soft merge
#[derive(Debug, Clone, PartialEq)]
pub enum SoftMerge {
    /// Volatile keys merged into the existing payload
    Merged(Value),
    /// Shape changed at these top-level keys; rebuild from scratch
    Rebuild { changed_keys: Vec<String> },
}

/// Top-level keys whose object values have different key sets on each side.
///
/// Keys present on only one side are ignored here; they are handled by the
/// merge itself. Non-object values never count as a shape change.
pub fn shape_changes(existing: &Value, fresh: &Value) -> Vec<String> {
    let (Some(existing), Some(fresh)) = (existing.as_object(), fresh.as_object()) else {
        return Vec::new();
    };

    existing
        .iter()
        .filter_map(|(key, old)| {
            let new = fresh.get(key)?;
            match (old.as_object(), new.as_object()) {
                (Some(a), Some(b)) if key_set(a) != key_set(b) => Some(key.clone()),
                _ => None,
            }
        })
        .collect()
}

fn key_set(map: &Map<String, Value>) -> BTreeSet<&str> {
    map.keys().map(|k| k.as_str()).collect()
}

/// Copy `keys` from `fresh` into `existing`; other keys keep their existing values.
pub fn shallow_merge(existing: &Value, fresh: &Value, keys: &[&str]) -> Value {
    let mut merged = existing.clone();
    if let (Some(target), Some(source)) = (merged.as_object_mut(), fresh.as_object()) {
        for key in keys {
            match source.get(*key) {
                Some(value) => {
                    target.insert((*key).to_string(), value.clone());
                }
                None => {
                    target.remove(*key);
                }
            }
        }
    }
    merged
}

/// Apply the soft-change policy: rebuild on shape change, otherwise merge `keys`.
pub fn merge_soft(existing: &Value, fresh: &Value, keys: &[&str]) -> SoftMerge {
    let changed_keys = shape_changes(existing, fresh);
    if !changed_keys.is_empty() {
        return SoftMerge::Rebuild { changed_keys };
    }
    SoftMerge::Merged(shallow_merge(existing, fresh, keys))
}
