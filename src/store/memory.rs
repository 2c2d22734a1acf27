use crate::core::cache::{CachedRate, RateCache};
use crate::core::error::RateError;
use crate::core::prefs::{PreferenceStore, PreferenceUpdate, UserPreferences, apply_update};
use crate::core::source::SourceKind;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// In-memory rate cache used when the fjall keyspace is unavailable
/// and as the test double throughout the suite.
#[derive(Default)]
pub struct MemoryRateCache {
    inner: Arc<Mutex<HashMap<(String, String, SourceKind), CachedRate>>>,
}

impl MemoryRateCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RateCache for MemoryRateCache {
    async fn get(&self, base: &str, target: &str, source: SourceKind) -> Option<CachedRate> {
        let rows = self.inner.lock().await;
        let key = (base.to_string(), target.to_string(), source);
        let row = rows.get(&key).cloned();
        if row.is_some() {
            debug!(%base, %target, %source, "Rate cache HIT");
        } else {
            debug!(%base, %target, %source, "Rate cache MISS");
        }
        row
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
        let mut rows = self.inner.lock().await;
        debug!(%base, %target, %source, rate, "Rate cache PUT");
        rows.insert((base.to_string(), target.to_string(), source), row.clone());
        row
    }
}

/// In-memory preference store; records are created lazily on the first
/// successful write.
#[derive(Default)]
pub struct MemoryPreferenceStore {
    inner: Arc<Mutex<HashMap<String, UserPreferences>>>,
}

impl MemoryPreferenceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PreferenceStore for MemoryPreferenceStore {
    async fn get(&self, user_id: &str) -> Result<UserPreferences, RateError> {
        let records = self.inner.lock().await;
        Ok(records
            .get(user_id)
            .cloned()
            .unwrap_or_else(|| UserPreferences::default_for(user_id)))
    }

    async fn set(
        &self,
        user_id: &str,
        update: PreferenceUpdate,
    ) -> Result<UserPreferences, RateError> {
        let mut records = self.inner.lock().await;
        let current = records
            .get(user_id)
            .cloned()
            .unwrap_or_else(|| UserPreferences::default_for(user_id));
        let next = apply_update(&current, update)?;
        records.insert(user_id.to_string(), next.clone());
        Ok(next)
    }
}
