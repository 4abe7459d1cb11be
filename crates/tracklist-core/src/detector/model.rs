//! Detector output types.

use serde::{Deserialize, Serialize};

use crate::model::ChangeType;

/// Outcome of comparing two versions of an entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    /// No previous version
    Add,
    /// At least one structural field differs
    Full,
    /// Only volatile fields differ
    Soft,
    /// Nothing configured differs; no change is emitted
    Unchanged,
}

impl Classification {
    /// The change type to emit, or `None` when nothing changed
    pub fn change_type(&self) -> Option<ChangeType> {
        match self {
            Classification::Add => Some(ChangeType::Add),
            Classification::Full => Some(ChangeType::Full),
            Classification::Soft => Some(ChangeType::Soft),
            Classification::Unchanged => None,
        }
    }
}

/// Which configured fields differ between two versions
///
/// Field lists preserve config order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDiff {
    pub structural: Vec<String>,
    pub volatile: Vec<String>,
}

impl FieldDiff {
    pub fn is_empty(&self) -> bool {
        self.structural.is_empty() && self.volatile.is_empty()
    }

    /// Classification implied by this diff for an existing previous version
    pub fn classification(&self) -> Classification {
        if !self.structural.is_empty() {
            Classification::Full
        } else if !self.volatile.is_empty() {
            Classification::Soft
        } else {
            Classification::Unchanged
        }
    }
}
