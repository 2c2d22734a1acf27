//! Rate cache abstractions.

use crate::core::source::SourceKind;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// One provider's belief about one currency pair's rate at a point in
/// time. At most one row exists per (base, target, source); a refresh
/// overwrites the row in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedRate {
    pub base_currency: String,
    pub target_currency: String,
    pub rate: f64,
    pub source: SourceKind,
    pub fetched_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl CachedRate {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Persistent rate cache keyed by (base, target, source).
///
/// `get` returns the row whether or not it has expired; expiry is
/// logical and the caller checks `is_expired` against its own clock.
/// The store never auto-evicts.
#[async_trait]
pub trait RateCache: Send + Sync {
    async fn get(&self, base: &str, target: &str, source: SourceKind) -> Option<CachedRate>;

    /// Upserts by the uniqueness key with `fetched_at = now` and
    /// `expires_at = now + ttl`. Last writer wins.
    async fn put(
        &self,
        base: &str,
        target: &str,
        source: SourceKind,
        rate: f64,
        ttl: Duration,
    ) -> CachedRate;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_expired() {
        let now = Utc::now();
        let row = CachedRate {
            base_currency: "USD".to_string(),
            target_currency: "EUR".to_string(),
            rate: 0.9,
            source: SourceKind::Api,
            fetched_at: now,
            expires_at: now + Duration::hours(1),
        };

        assert!(!row.is_expired(now));
        assert!(row.is_expired(now + Duration::hours(1)));
        assert!(row.is_expired(now + Duration::hours(2)));
    }
}
