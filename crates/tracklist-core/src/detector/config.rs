//! Per-entity-type detector configuration.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::errors::TrackerError;

/// Declares which fields of an entity are structural vs volatile, plus the
/// minimum snapshot age before a refetch is attempted.
///
/// Field names are dot-separated paths into the entity's JSON form
/// (`owner.login`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeDetectorConfig {
    pub entity_type: String,
    pub structural_fields: Vec<String>,
    pub volatile_fields: Vec<String>,
    #[serde(with = "duration_seconds")]
    pub staleness_threshold: Duration,
}

impl ChangeDetectorConfig {
    /// Start a config with a 24 hour staleness threshold and no fields
    pub fn new(entity_type: impl Into<String>) -> Self {
        Self {
            entity_type: entity_type.into(),
            structural_fields: Vec::new(),
            volatile_fields: Vec::new(),
            staleness_threshold: Duration::hours(24),
        }
    }

    pub fn structural<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.structural_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn volatile<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.volatile_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn staleness(mut self, threshold: Duration) -> Self {
        self.staleness_threshold = threshold;
        self
    }

    /// Reject configurations that would make classification ambiguous
    ///
    /// # Errors
    ///
    /// `InvalidConfig` when there are no structural fields, a field name is
    /// empty, a field is declared both structural and volatile, or the
    /// staleness threshold is negative.
    pub fn validate(&self) -> Result<(), TrackerError> {
        let invalid = |reason: String| TrackerError::InvalidConfig {
            entity_type: self.entity_type.clone(),
            reason,
        };

        if self.structural_fields.is_empty() {
            return Err(invalid("no structural fields declared".to_string()));
        }

        if let Some(empty) = self
            .structural_fields
            .iter()
            .chain(self.volatile_fields.iter())
            .find(|f| f.trim().is_empty())
        {
            return Err(invalid(format!("empty field name {:?}", empty)));
        }

        let structural: BTreeSet<&str> =
            self.structural_fields.iter().map(|s| s.as_str()).collect();
        if let Some(both) = self
            .volatile_fields
            .iter()
            .find(|f| structural.contains(f.as_str()))
        {
            return Err(invalid(format!(
                "field '{}' declared both structural and volatile",
                both
            )));
        }

        if self.staleness_threshold < Duration::zero() {
            return Err(invalid("negative staleness threshold".to_string()));
        }

        Ok(())
    }
}

mod duration_seconds {
    use chrono::Duration;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_i64(d.num_seconds())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = i64::deserialize(d)?;
        Ok(Duration::seconds(secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let config = ChangeDetectorConfig::new("github-repository")
            .structural(["name"])
            .volatile(["stars"]);
        assert_eq!(config.staleness_threshold, Duration::hours(24));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_structural_fields_rejected() {
        let config = ChangeDetectorConfig::new("github-repository").volatile(["stars"]);
        let err = config.validate().unwrap_err();
        assert!(matches!(err, TrackerError::InvalidConfig { .. }));
    }

    #[test]
    fn test_overlapping_fields_rejected() {
        let config = ChangeDetectorConfig::new("x")
            .structural(["name", "stars"])
            .volatile(["stars"]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_serde_threshold_in_seconds() {
        let config = ChangeDetectorConfig::new("x")
            .structural(["name"])
            .staleness(Duration::hours(2));
        let value = serde_json::to_value(&config).unwrap();
        assert_eq!(value["staleness_threshold"], 7200);
    }
}
