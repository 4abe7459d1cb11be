//! Change classification engine.
//!
//! The core entry point is [`classify`], which compares two JSON versions of
//! an entity field-by-field according to a [`ChangeDetectorConfig`].

#![allow(clippy::result_large_err)]

use serde::Serialize;
use serde_json::Value;

use crate::detector::config::ChangeDetectorConfig;
use crate::detector::model::{Classification, FieldDiff};
use crate::errors::{serialization_error, ExError};

/// Resolve a dot-separated path into a JSON value.
///
/// Missing keys and paths through non-objects resolve to `Null`, so a field
/// that is absent on both sides compares equal.
pub fn field_at<'a>(value: &'a Value, path: &str) -> &'a Value {
    path.split('.')
        .try_fold(value, |current, segment| current.get(segment))
        .unwrap_or(&Value::Null)
}

/// Canonical form used for deep comparison.
///
/// Arrays are sorted by the serialized form of their canonicalized elements so
/// ordering never counts as a difference; objects are already key-ordered.
pub fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Array(items) => {
            let mut canonical: Vec<(String, Value)> = items
                .iter()
                .map(|item| {
                    let c = canonicalize(item);
                    (c.to_string(), c)
                })
                .collect();
            canonical.sort_by(|a, b| a.0.cmp(&b.0));
            Value::Array(canonical.into_iter().map(|(_, v)| v).collect())
        }
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), canonicalize(v)))
                .collect(),
        ),
        other => other.clone(),
    }
}

fn differs(previous: &Value, next: &Value, path: &str) -> bool {
    canonicalize(field_at(previous, path)) != canonicalize(field_at(next, path))
}

/// Report which configured fields differ between two versions.
///
/// # Errors
///
/// - `InvalidConfig` — the config fails [`ChangeDetectorConfig::validate`]
pub fn diff_fields(
    previous: &Value,
    next: &Value,
    config: &ChangeDetectorConfig,
) -> Result<FieldDiff, ExError> {
    config.validate().map_err(ExError::from)?;

    let collect = |fields: &[String]| -> Vec<String> {
        fields
            .iter()
            .filter(|f| differs(previous, next, f))
            .cloned()
            .collect()
    };

    Ok(FieldDiff {
        structural: collect(&config.structural_fields),
        volatile: collect(&config.volatile_fields),
    })
}

/// Classify the transition from `previous` to `next`.
///
/// - `None` previous ⇒ [`Classification::Add`]
/// - any structural field differs ⇒ [`Classification::Full`]
/// - else any volatile field differs ⇒ [`Classification::Soft`]
/// - else [`Classification::Unchanged`]
///
/// Fields not named in the config are ignored.
///
/// # Errors
///
/// - `InvalidConfig` — the config has no structural fields or is otherwise invalid;
///   checked even for `Add` so a broken config never goes unnoticed
pub fn classify(
    previous: Option<&Value>,
    next: &Value,
    config: &ChangeDetectorConfig,
) -> Result<Classification, ExError> {
    config.validate().map_err(ExError::from)?;

    match previous {
        None => Ok(Classification::Add),
        Some(previous) => Ok(diff_fields(previous, next, config)?.classification()),
    }
}

/// Typed convenience wrapper over [`classify`].
///
/// # Errors
///
/// - `Serialization` — either version cannot be encoded as JSON
/// - `InvalidConfig` — see [`classify`]
pub fn classify_typed<T: Serialize>(
    previous: Option<&T>,
    next: &T,
    config: &ChangeDetectorConfig,
) -> Result<Classification, ExError> {
    let next = serde_json::to_value(next).map_err(|e| serialization_error("classify", e))?;
    let previous = previous
        .map(serde_json::to_value)
        .transpose()
        .map_err(|e| serialization_error("classify", e))?;
    classify(previous.as_ref(), &next, config)
}
