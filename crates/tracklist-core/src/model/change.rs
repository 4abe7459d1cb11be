use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::{ExError, ExErrorKind};

/// Classification of a detected transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    /// No prior snapshot existed
    Add,
    /// Structural fields differ
    Full,
    /// Only volatile fields differ
    Soft,
    /// Entity disappeared from the latest full listing
    Removal,
}

impl ChangeType {
    pub const ALL: [ChangeType; 4] = [
        ChangeType::Add,
        ChangeType::Full,
        ChangeType::Soft,
        ChangeType::Removal,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeType::Add => "add",
            ChangeType::Full => "full",
            ChangeType::Soft => "soft",
            ChangeType::Removal => "removal",
        }
    }
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChangeType {
    type Err = ExError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ChangeType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| {
                ExError::new(ExErrorKind::InvalidInput)
                    .with_op("parse_change_type")
                    .with_message(format!(
                        "unknown change type '{}', expected one of add, full, soft, removal",
                        s
                    ))
            })
    }
}

/// Immutable record of one detected transition
///
/// `T` defaults to `serde_json::Value`, which is the shape the change log
/// stores and returns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Change<T = serde_json::Value> {
    /// Unique change identifier (UUIDv7, time-ordered)
    pub id: String,

    /// Tracked identifier the change was detected for
    pub identifier: String,

    /// Classification of the transition
    #[serde(rename = "type")]
    pub change_type: ChangeType,

    /// When the transition was detected
    pub timestamp: DateTime<Utc>,

    /// Entity data after the transition (last known data for removals)
    pub data: T,

    /// Entity data before the transition, absent for `add`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_data: Option<T>,
}

impl<T> Change<T> {
    pub fn new(
        identifier: impl Into<String>,
        change_type: ChangeType,
        data: T,
        previous_data: Option<T>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: uuid::Uuid::now_v7().to_string(),
            identifier: identifier.into(),
            change_type,
            timestamp,
            data,
            previous_data,
        }
    }
}

impl<T: Serialize> Change<T> {
    /// Erase the payload type, as stored by the change log
    pub fn to_value(&self) -> crate::errors::Result<Change<serde_json::Value>> {
        let encode = |v: &T| {
            serde_json::to_value(v)
                .map_err(|e| crate::errors::serialization_error("change_to_value", e))
        };
        Ok(Change {
            id: self.id.clone(),
            identifier: self.identifier.clone(),
            change_type: self.change_type,
            timestamp: self.timestamp,
            data: encode(&self.data)?,
            previous_data: self.previous_data.as_ref().map(encode).transpose()?,
        })
    }
}

impl Change<serde_json::Value> {
    /// Decode the payload into a typed entity
    pub fn decode<T: DeserializeOwned>(&self) -> crate::errors::Result<Change<T>> {
        let decode = |v: &serde_json::Value| {
            serde_json::from_value::<T>(v.clone()).map_err(|e| {
                crate::errors::serialization_error("change_decode", e)
                    .with_entity_id(self.identifier.clone())
            })
        };
        Ok(Change {
            id: self.id.clone(),
            identifier: self.identifier.clone(),
            change_type: self.change_type,
            timestamp: self.timestamp,
            data: decode(&self.data)?,
            previous_data: self.previous_data.as_ref().map(decode).transpose()?,
        })
    }
}
