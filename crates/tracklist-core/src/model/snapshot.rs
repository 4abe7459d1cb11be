use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Stored, timestamped copy of one entity's last-known data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot<T> {
    /// Stable identifier of the tracked entity (e.g. `acme/widget`)
    pub identifier: String,

    /// Entity data as fetched
    pub data: T,

    /// When this copy was last written or refreshed
    pub stored_at: DateTime<Utc>,
}

impl<T> Snapshot<T> {
    pub fn new(identifier: impl Into<String>, data: T, stored_at: DateTime<Utc>) -> Self {
        Self {
            identifier: identifier.into(),
            data,
            stored_at,
        }
    }

    /// Age of this snapshot relative to `now` (zero if `stored_at` is in the future)
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        let age = now - self.stored_at;
        if age < Duration::zero() {
            Duration::zero()
        } else {
            age
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_age_never_negative() {
        let now = Utc::now();
        let snap = Snapshot::new("acme/widget", (), now + Duration::hours(1));
        assert_eq!(snap.age(now), Duration::zero());
    }

    #[test]
    fn test_age_measures_elapsed_time() {
        let now = Utc::now();
        let snap = Snapshot::new("acme/widget", (), now - Duration::hours(3));
        assert_eq!(snap.age(now), Duration::hours(3));
    }
}
