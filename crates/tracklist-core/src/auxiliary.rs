//! Run-scoped auxiliary data handed to metadata builders.
//!
//! Populated once before a batch (for example, plugin download statistics
//! fetched in bulk) and read-only while the batch runs.

#![allow(clippy::result_large_err)]

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

use crate::errors::{serialization_error, Result};
use crate::model::list::normalize_full_name;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuxiliaryContext {
    entries: BTreeMap<String, Value>,
}

impl AuxiliaryContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a value under the normalized identifier
    pub fn insert<T: Serialize>(&mut self, identifier: &str, value: &T) -> Result<()> {
        let value =
            serde_json::to_value(value).map_err(|e| serialization_error("aux_insert", e))?;
        self.entries.insert(normalize_full_name(identifier), value);
        Ok(())
    }

    /// Typed lookup; `Ok(None)` when nothing is stored for the identifier
    pub fn get<T: DeserializeOwned>(&self, identifier: &str) -> Result<Option<T>> {
        self.entries
            .get(&normalize_full_name(identifier))
            .map(|v| serde_json::from_value(v.clone()))
            .transpose()
            .map_err(|e| serialization_error("aux_get", e).with_entity_id(identifier))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PluginStats;

    #[test]
    fn test_lookup_is_normalized_and_typed() {
        let mut ctx = AuxiliaryContext::new();
        let stats: PluginStats = serde_json::from_value(serde_json::json!({
            "downloads": 1200,
            "updated": 1700000000,
            "1.0.0": 400,
            "1.1.0": 800
        }))
        .unwrap();
        ctx.insert("Dataview", &stats).unwrap();

        let found: Option<PluginStats> = ctx.get(" dataview ").unwrap();
        assert_eq!(found, Some(stats));
        assert!(ctx.get::<PluginStats>("calendar").unwrap().is_none());
    }
}
