//! Reconciliation state machine.
//!
//! ## Transitions by change type
//! - add / full: fresh metadata, upsert keyed by `(list_id, full_name)`
//! - soft: merge volatile keys into the existing item; rebuild when an object
//!   sub-structure changed shape or no item exists yet
//! - removal: move the item into the shared archived list
//!
//! The list item's `full_name` is the change identifier. In the archived list
//! it is qualified by source type (see [`archived_full_name`]).

#![allow(clippy::result_large_err)]

use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use tracklist_core::auxiliary::AuxiliaryContext;
use tracklist_core::clock::{Clock, SystemClock};
use tracklist_core::errors::{ExError, Result, TrackerError};
use tracklist_core::merge::{merge_soft, SoftMerge};
use tracklist_core::model::{
    archived_full_name, ArchivedMetadata, Change, ChangeType, ListItem, ListItemMetadata,
    ListItemUpdate, NewListItem, SourceType,
};
use tracklist_core::ports::{EntityQueryPort, ListCommandPort, ListQueryPort};
use tracklist_core::{log_op_end, log_op_error, log_op_start};

use super::builders::MetadataBuilder;

/// Reason recorded when a removal change is reconciled
pub const REMOVED_UPSTREAM: &str = "removed upstream";

/// What a single reconciliation did
#[derive(Debug, Clone, PartialEq)]
pub enum HandleOutcome {
    Created(ListItem),
    Updated(ListItem),
    /// Soft change merged into the existing item
    Merged(ListItem),
    /// Item moved into the archived list
    Archived(ListItem),
    /// Already archived by an earlier, interrupted run
    AlreadyArchived,
    /// Nothing to archive: the identifier was never listed
    NotTracked,
}

#[derive(Debug, Clone)]
struct TargetList {
    list_id: String,
    source_type: SourceType,
}

/// Per-run cache; rebuilt by every `prepare_run`
#[derive(Debug, Default)]
struct RunCache {
    items: HashMap<String, ListItem>,
    aux: AuxiliaryContext,
}

pub struct ReconciliationHandler {
    builder: Box<dyn MetadataBuilder>,
    list_query: Arc<dyn ListQueryPort>,
    list_command: Arc<dyn ListCommandPort>,
    entities: Arc<dyn EntityQueryPort>,
    clock: Arc<dyn Clock>,
    target: Option<TargetList>,
    archive_list_id: Option<String>,
    cache: RunCache,
}

impl ReconciliationHandler {
    pub fn new(
        builder: Box<dyn MetadataBuilder>,
        list_query: Arc<dyn ListQueryPort>,
        list_command: Arc<dyn ListCommandPort>,
        entities: Arc<dyn EntityQueryPort>,
    ) -> Self {
        Self {
            builder,
            list_query,
            list_command,
            entities,
            clock: Arc::new(SystemClock),
            target: None,
            archive_list_id: None,
            cache: RunCache::default(),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Id of the target list, once `set_list` has run
    pub fn list_id(&self) -> Option<&str> {
        self.target.as_ref().map(|t| t.list_id.as_str())
    }

    /// Find or create the target list for the builder's entity type
    ///
    /// Idempotent: a second call reuses the list found by the first.
    pub fn set_list(&mut self) -> Result<&str> {
        let source_type = self.builder.entity_type().source_type();
        let list = match self.list_query.find_by_source_type(source_type)? {
            Some(list) => list,
            None => {
                tracing::info!(
                    source_type = source_type.as_str(),
                    "creating list {}",
                    source_type.list_name()
                );
                self.list_command.create(source_type.list_name(), source_type)?
            }
        };
        let target = self.target.insert(TargetList {
            list_id: list.id,
            source_type,
        });
        Ok(target.list_id.as_str())
    }

    /// Load the per-run cache: current items of the target list and the
    /// run's auxiliary context
    ///
    /// # Errors
    ///
    /// - `ListNotSet` — `set_list` has not been called
    pub fn prepare_run(&mut self, aux: AuxiliaryContext) -> Result<()> {
        let list_id = self.target()?.list_id.clone();
        let items = self.list_query.items_in_list(&list_id)?;
        tracing::debug!(list_id = list_id.as_str(), items = items.len(), "run cache loaded");
        self.cache = RunCache {
            items: items
                .into_iter()
                .map(|item| (item.full_name.clone(), item))
                .collect(),
            aux,
        };
        Ok(())
    }

    /// Identifiers currently listed in the target list (from the run cache)
    pub fn listed_identifiers(&self) -> Vec<String> {
        let mut names: Vec<String> = self.cache.items.keys().cloned().collect();
        names.sort();
        names
    }

    /// Whether the identifier currently has an item in the target list
    pub fn is_listed(&self, identifier: &str) -> bool {
        self.cache.items.contains_key(identifier)
    }

    /// Join this run's auxiliary context into freshly fetched data
    pub fn enrich(&self, data: Value, previous: Option<&Value>) -> Result<Value> {
        self.builder.enrich(data, previous, &self.cache.aux)
    }

    /// Reconcile one change into the target list
    ///
    /// # Errors
    ///
    /// - `ListNotSet` — `set_list` has not been called
    /// - `Serialization` — the change data does not decode for this entity type
    /// - persistence errors from the list ports
    pub fn handle(&mut self, change: &Change<Value>) -> Result<HandleOutcome> {
        let start = Instant::now();
        log_op_start!(
            "handle_change",
            identifier = change.identifier.as_str(),
            change_type = change.change_type.as_str()
        );

        let result = self.handle_inner(change);
        let duration_ms = start.elapsed().as_millis() as u64;
        match &result {
            Ok(outcome) => log_op_end!(
                "handle_change",
                duration_ms = duration_ms,
                identifier = change.identifier.as_str(),
                outcome = outcome_name(outcome)
            ),
            Err(err) => log_op_error!(
                "handle_change",
                err.clone(),
                duration_ms = duration_ms,
                identifier = change.identifier.as_str()
            ),
        }
        result
    }

    fn handle_inner(&mut self, change: &Change<Value>) -> Result<HandleOutcome> {
        self.target()?;
        match change.change_type {
            ChangeType::Add | ChangeType::Full => self.upsert_fresh(change),
            ChangeType::Soft => self.apply_soft(change),
            ChangeType::Removal => self.archive(REMOVED_UPSTREAM, &change.identifier),
        }
    }

    /// Archive an item directly, outside of a change
    pub fn handle_archival(&mut self, reason: &str, identifier: &str) -> Result<HandleOutcome> {
        let start = Instant::now();
        log_op_start!("handle_archival", identifier = identifier, reason = reason);

        let result = self.archive(reason, identifier);
        let duration_ms = start.elapsed().as_millis() as u64;
        match &result {
            Ok(outcome) => log_op_end!(
                "handle_archival",
                duration_ms = duration_ms,
                identifier = identifier,
                outcome = outcome_name(outcome)
            ),
            Err(err) => log_op_error!(
                "handle_archival",
                err.clone(),
                duration_ms = duration_ms,
                identifier = identifier
            ),
        }
        result
    }

    fn target(&self) -> Result<&TargetList> {
        self.target.as_ref().ok_or_else(|| {
            TrackerError::ListNotSet {
                entity_type: self.builder.entity_type().to_string(),
            }
            .into()
        })
    }

    fn resolve_entity_id(&self, identifier: &str) -> Result<Option<String>> {
        Ok(self
            .entities
            .find_by_name(self.builder.entity_type(), identifier)?
            .map(|entity| entity.id))
    }

    fn upsert_fresh(&mut self, change: &Change<Value>) -> Result<HandleOutcome> {
        let list_id = self.target()?.list_id.clone();
        let entity = self
            .entities
            .find_by_name(self.builder.entity_type(), &change.identifier)?;
        let metadata = self.builder.create_metadata(
            change,
            entity.as_ref(),
            &self.cache.aux,
            self.clock.now(),
        )?;
        let entity_id = entity.map(|e| e.id);

        // The port is authoritative; the cache may predate another writer
        let outcome = match self.list_query.find_item(&list_id, &change.identifier)? {
            Some(_) => HandleOutcome::Updated(self.list_command.update_item(
                &list_id,
                &change.identifier,
                ListItemUpdate {
                    entity_id,
                    metadata,
                },
            )?),
            None => HandleOutcome::Created(self.list_command.create_item(NewListItem {
                list_id,
                full_name: change.identifier.clone(),
                entity_id,
                metadata,
            })?),
        };

        if let HandleOutcome::Created(item) | HandleOutcome::Updated(item) = &outcome {
            self.cache.items.insert(item.full_name.clone(), item.clone());
        }
        Ok(outcome)
    }

    fn apply_soft(&mut self, change: &Change<Value>) -> Result<HandleOutcome> {
        let list_id = self.target()?.list_id.clone();
        let existing = match self.cache.items.get(&change.identifier) {
            Some(item) => Some(item.clone()),
            None => self.list_query.find_item(&list_id, &change.identifier)?,
        };

        let Some(existing) = existing else {
            tracing::warn!(
                identifier = change.identifier.as_str(),
                "soft change without an existing item, rebuilding"
            );
            return self.upsert_fresh(change);
        };

        let fresh = self.builder.create_metadata(
            change,
            None,
            &self.cache.aux,
            self.clock.now(),
        )?;
        let existing_value = existing.metadata.to_value().map_err(ExError::from)?;
        let fresh_value = fresh.to_value().map_err(ExError::from)?;

        let keys = self.builder.volatile_keys();
        let metadata = match merge_soft(&existing_value, &fresh_value, keys) {
            SoftMerge::Merged(merged) => {
                ListItemMetadata::from_value(merged).map_err(ExError::from)?
            }
            SoftMerge::Rebuild { changed_keys } => {
                tracing::info!(
                    identifier = change.identifier.as_str(),
                    changed_keys = ?changed_keys,
                    "metadata shape changed, rebuilding"
                );
                return self.upsert_fresh(change);
            }
        };

        let entity_id = match self.resolve_entity_id(&change.identifier)? {
            Some(id) => Some(id),
            None => existing.entity_id.clone(),
        };
        let item = self.list_command.update_item(
            &list_id,
            &change.identifier,
            ListItemUpdate {
                entity_id,
                metadata,
            },
        )?;
        self.cache.items.insert(item.full_name.clone(), item.clone());
        Ok(HandleOutcome::Merged(item))
    }

    fn archive_list_id(&mut self) -> Result<String> {
        if let Some(id) = &self.archive_list_id {
            return Ok(id.clone());
        }
        let list = match self.list_query.find_by_source_type(SourceType::Archived)? {
            Some(list) => list,
            None => self
                .list_command
                .create(SourceType::Archived.list_name(), SourceType::Archived)?,
        };
        Ok(self.archive_list_id.insert(list.id).clone())
    }

    /// Copy into the archived list, then delete from the source list
    ///
    /// Re-running after a crash between the two writes overwrites the
    /// archived copy and completes the delete.
    fn archive(&mut self, reason: &str, identifier: &str) -> Result<HandleOutcome> {
        let target = self.target()?.clone();
        let archive_id = self.archive_list_id()?;
        let archived_name = archived_full_name(target.source_type, identifier);

        let Some(item) = self.list_query.find_item(&target.list_id, identifier)? else {
            self.cache.items.remove(identifier);
            return Ok(match self.list_query.find_item(&archive_id, &archived_name)? {
                Some(_) => HandleOutcome::AlreadyArchived,
                None => HandleOutcome::NotTracked,
            });
        };

        let metadata = ListItemMetadata::Archived(ArchivedMetadata {
            full_name: item.full_name.clone(),
            reason: reason.to_string(),
            removed_at: self.clock.now(),
            source_type: target.source_type,
            list_id: target.list_id.clone(),
            original_item: Box::new(item.clone()),
        });

        let archived = match self.list_query.find_item(&archive_id, &archived_name)? {
            Some(_) => self.list_command.update_item(
                &archive_id,
                &archived_name,
                ListItemUpdate {
                    entity_id: item.entity_id.clone(),
                    metadata,
                },
            )?,
            None => self.list_command.create_item(NewListItem {
                list_id: archive_id,
                full_name: archived_name,
                entity_id: item.entity_id.clone(),
                metadata,
            })?,
        };

        self.list_command.remove_item(&target.list_id, identifier)?;
        self.cache.items.remove(identifier);
        Ok(HandleOutcome::Archived(archived))
    }
}

fn outcome_name(outcome: &HandleOutcome) -> &'static str {
    match outcome {
        HandleOutcome::Created(_) => "created",
        HandleOutcome::Updated(_) => "updated",
        HandleOutcome::Merged(_) => "merged",
        HandleOutcome::Archived(_) => "archived",
        HandleOutcome::AlreadyArchived => "already_archived",
        HandleOutcome::NotTracked => "not_tracked",
    }
}
