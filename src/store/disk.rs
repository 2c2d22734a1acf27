use crate::core::cache::{CachedRate, RateCache};
use crate::core::error::RateError;
use crate::core::prefs::{PreferenceStore, PreferenceUpdate, UserPreferences, apply_update};
use crate::core::source::SourceKind;
use anyhow::Result;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use fjall::PartitionHandle;
use tracing::debug;

fn rate_key(base: &str, target: &str, source: SourceKind) -> String {
    format!("{base}:{target}:{source}")
}

/// Rate cache persisted in a fjall partition, one JSON row per
/// (base, target, source) key. Inserts overwrite in place, which gives
/// the uniqueness invariant for free; a racing double-write is
/// last-writer-wins and harmless.
pub struct FjallRateCache {
    partition: PartitionHandle,
}

impl FjallRateCache {
    pub fn new(partition: PartitionHandle) -> Self {
        Self { partition }
    }
}

#[async_trait]
impl RateCache for FjallRateCache {
    async fn get(&self, base: &str, target: &str, source: SourceKind) -> Option<CachedRate> {
        let key = rate_key(base, target, source);
        let res: Result<Option<CachedRate>> = (|| {
            match self.partition.get(&key)? {
                Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
                None => Ok(None),
            }
        })();

        match res {
            Ok(Some(row)) => {
                debug!(%key, "Rate cache HIT");
                Some(row)
            }
            Ok(None) => {
                debug!(%key, "Rate cache MISS");
                None
            }
            Err(e) => {
                debug!(%key, "Rate cache read error: {}", e);
                None
            }
        }
    }

    async fn put(
        &self,
        base: &str,
        target: &str,
        source: SourceKind,
        rate: f64,
        ttl: Duration,
    ) -> CachedRate {
        let now = Utc::now();
        let row = CachedRate {
            base_currency: base.to_string(),
            target_currency: target.to_string(),
            rate,
            source,
            fetched_at: now,
            expires_at: now + ttl,
        };

        let key = rate_key(base, target, source);
        let res: Result<()> = (|| {
            self.partition.insert(&key, serde_json::to_vec(&row)?)?;
            debug!(%key, rate, "Rate cache PUT");
            Ok(())
        })();
        if let Err(e) = res {
            debug!(%key, "Rate cache write error: {}", e);
        }
        row
    }
}

/// Preference store persisted in a fjall partition keyed by user id.
pub struct FjallPreferenceStore {
    partition: PartitionHandle,
}

impl FjallPreferenceStore {
    pub fn new(partition: PartitionHandle) -> Self {
        Self { partition }
    }

    fn read(&self, user_id: &str) -> Result<Option<UserPreferences>, RateError> {
        let bytes = self
            .partition
            .get(user_id)
            .map_err(|e| RateError::Store(e.to_string()))?;
        match bytes {
            Some(bytes) => {
                let prefs =
                    serde_json::from_slice(&bytes).map_err(|e| RateError::Store(e.to_string()))?;
                Ok(Some(prefs))
            }
            None => Ok(None),
        }
    }
}

#[async_trait]
impl PreferenceStore for FjallPreferenceStore {
    async fn get(&self, user_id: &str) -> Result<UserPreferences, RateError> {
        Ok(self
            .read(user_id)?
            .unwrap_or_else(|| UserPreferences::default_for(user_id)))
    }

    async fn set(
        &self,
        user_id: &str,
        update: PreferenceUpdate,
    ) -> Result<UserPreferences, RateError> {
        let current = self
            .read(user_id)?
            .unwrap_or_else(|| UserPreferences::default_for(user_id));
        let next = apply_update(&current, update)?;

        let bytes = serde_json::to_vec(&next).map_err(|e| RateError::Store(e.to_string()))?;
        self.partition
            .insert(user_id, bytes)
            .map_err(|e| RateError::Store(e.to_string()))?;
        debug!(user = user_id, "Preferences saved");
        Ok(next)
    }
}
