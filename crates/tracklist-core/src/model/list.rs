use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::entity_type::{EntityType, SourceType};
use super::metadata::ListItemMetadata;

/// A list grouping items of one source type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct List {
    pub id: String,
    pub name: String,
    pub source_type: SourceType,
}

/// Projection row shared by every downstream entity type
///
/// `(list_id, full_name)` is unique across open items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListItem {
    pub id: String,
    pub list_id: String,
    pub full_name: String,
    /// Link to the canonical backing entity, filled in by a later linking pass when absent
    pub entity_id: Option<String>,
    pub metadata: ListItemMetadata,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insert payload for a list item
#[derive(Debug, Clone, PartialEq)]
pub struct NewListItem {
    pub list_id: String,
    pub full_name: String,
    pub entity_id: Option<String>,
    pub metadata: ListItemMetadata,
}

/// Update payload for a list item
#[derive(Debug, Clone, PartialEq)]
pub struct ListItemUpdate {
    pub entity_id: Option<String>,
    pub metadata: ListItemMetadata,
}

/// Canonical entity a list item may link to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalEntity {
    pub id: String,
    pub full_name: String,
    pub entity_type: EntityType,
}

/// Normalize an identifier for canonical entity lookup
pub fn normalize_full_name(full_name: &str) -> String {
    full_name.trim().trim_matches('/').to_ascii_lowercase()
}

/// Key of an item in the shared archived list
///
/// Qualified by source type: identifiers from different sources may collide.
pub fn archived_full_name(source_type: SourceType, full_name: &str) -> String {
    format!("{}:{}", source_type.as_str(), full_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_full_name() {
        assert_eq!(normalize_full_name("  Acme/Widget "), "acme/widget");
        assert_eq!(normalize_full_name("/acme/widget/"), "acme/widget");
    }

    #[test]
    fn test_archived_full_name_is_source_qualified() {
        assert_eq!(
            archived_full_name(SourceType::ObsidianTheme, "kepano/obsidian-minimal"),
            "obsidian-theme:kepano/obsidian-minimal"
        );
    }
}
