//! In-memory port implementations for tests and dry runs.

use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::Mutex;
use uuid::Uuid;

use super::{EntityQueryPort, ListCommandPort, ListQueryPort};
use crate::errors::{ExError, ExErrorKind, Result, TrackerError};
use crate::model::list::normalize_full_name;
use crate::model::{
    CanonicalEntity, EntityType, List, ListItem, ListItemUpdate, NewListItem, SourceType,
};

#[derive(Default)]
struct ListState {
    lists: Vec<List>,
    // keyed by (list_id, full_name)
    items: BTreeMap<(String, String), ListItem>,
}

/// List store backed by a mutex-guarded map
#[derive(Default)]
pub struct InMemoryListStore {
    state: Mutex<ListState>,
}

fn poisoned(op: &str) -> ExError {
    ExError::new(ExErrorKind::Concurrency)
        .with_op(op)
        .with_message("in-memory store lock poisoned")
}

impl InMemoryListStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lists(&self) -> Result<Vec<List>> {
        let state = self.state.lock().map_err(|_| poisoned("lists"))?;
        Ok(state.lists.clone())
    }

    fn list_source_type(state: &ListState, list_id: &str) -> Result<SourceType> {
        state
            .lists
            .iter()
            .find(|l| l.id == list_id)
            .map(|l| l.source_type)
            .ok_or_else(|| {
                TrackerError::ListNotFound {
                    list_id: list_id.to_string(),
                }
                .into()
            })
    }
}

impl ListQueryPort for InMemoryListStore {
    fn find_by_source_type(&self, source_type: SourceType) -> Result<Option<List>> {
        let state = self
            .state
            .lock()
            .map_err(|_| poisoned("find_by_source_type"))?;
        Ok(state
            .lists
            .iter()
            .find(|l| l.source_type == source_type)
            .cloned())
    }

    fn find_item(&self, list_id: &str, full_name: &str) -> Result<Option<ListItem>> {
        let state = self.state.lock().map_err(|_| poisoned("find_item"))?;
        Ok(state
            .items
            .get(&(list_id.to_string(), full_name.to_string()))
            .cloned())
    }

    fn items_in_list(&self, list_id: &str) -> Result<Vec<ListItem>> {
        let state = self.state.lock().map_err(|_| poisoned("items_in_list"))?;
        Ok(state
            .items
            .values()
            .filter(|i| i.list_id == list_id)
            .cloned()
            .collect())
    }
}

impl ListCommandPort for InMemoryListStore {
    fn create(&self, name: &str, source_type: SourceType) -> Result<List> {
        let mut state = self.state.lock().map_err(|_| poisoned("create_list"))?;
        let list = List {
            id: Uuid::now_v7().to_string(),
            name: name.to_string(),
            source_type,
        };
        state.lists.push(list.clone());
        Ok(list)
    }

    fn create_item(&self, item: NewListItem) -> Result<ListItem> {
        let mut state = self.state.lock().map_err(|_| poisoned("create_item"))?;
        let source_type = Self::list_source_type(&state, &item.list_id)?;
        item.metadata.validate_for(source_type)?;

        let key = (item.list_id.clone(), item.full_name.clone());
        if state.items.contains_key(&key) {
            return Err(TrackerError::ItemAlreadyExists {
                list_id: item.list_id,
                full_name: item.full_name,
            }
            .into());
        }

        let now = Utc::now();
        let stored = ListItem {
            id: Uuid::now_v7().to_string(),
            list_id: item.list_id,
            full_name: item.full_name,
            entity_id: item.entity_id,
            metadata: item.metadata,
            created_at: now,
            updated_at: now,
        };
        state.items.insert(key, stored.clone());
        Ok(stored)
    }

    fn update_item(
        &self,
        list_id: &str,
        full_name: &str,
        update: ListItemUpdate,
    ) -> Result<ListItem> {
        let mut state = self.state.lock().map_err(|_| poisoned("update_item"))?;
        let source_type = Self::list_source_type(&state, list_id)?;
        update.metadata.validate_for(source_type)?;

        let item = state
            .items
            .get_mut(&(list_id.to_string(), full_name.to_string()))
            .ok_or_else(|| TrackerError::ItemNotFound {
                list_id: list_id.to_string(),
                full_name: full_name.to_string(),
            })?;
        item.entity_id = update.entity_id;
        item.metadata = update.metadata;
        item.updated_at = Utc::now();
        Ok(item.clone())
    }

    fn remove_item(&self, list_id: &str, full_name: &str) -> Result<()> {
        let mut state = self.state.lock().map_err(|_| poisoned("remove_item"))?;
        state
            .items
            .remove(&(list_id.to_string(), full_name.to_string()));
        Ok(())
    }
}

/// Canonical entity index keyed by normalized name
#[derive(Default)]
pub struct InMemoryEntityIndex {
    entities: Mutex<BTreeMap<(EntityType, String), CanonicalEntity>>,
}

impl InMemoryEntityIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a canonical entity, returning it
    pub fn insert(&self, entity_type: EntityType, full_name: &str) -> Result<CanonicalEntity> {
        let mut entities = self
            .entities
            .lock()
            .map_err(|_| poisoned("insert_entity"))?;
        let normalized = normalize_full_name(full_name);
        let entity = CanonicalEntity {
            id: Uuid::now_v7().to_string(),
            full_name: normalized.clone(),
            entity_type,
        };
        entities.insert((entity_type, normalized), entity.clone());
        Ok(entity)
    }
}

impl EntityQueryPort for InMemoryEntityIndex {
    fn find_by_name(
        &self,
        entity_type: EntityType,
        full_name: &str,
    ) -> Result<Option<CanonicalEntity>> {
        let entities = self
            .entities
            .lock()
            .map_err(|_| poisoned("find_by_name"))?;
        Ok(entities
            .get(&(entity_type, normalize_full_name(full_name)))
            .cloned())
    }
}
