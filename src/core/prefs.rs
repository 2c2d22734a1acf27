//! Per-user resolution preferences.

use crate::core::currency::normalize_code;
use crate::core::error::RateError;
use crate::core::source::SourceKind;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// One record per user: the source fallback order, the set of enabled
/// sources, and optional override rates keyed by target currency (the
/// base is implicitly the user's default currency).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserPreferences {
    pub user_id: String,
    pub fallback_order: Vec<SourceKind>,
    pub enabled_sources: BTreeSet<SourceKind>,
    pub custom_rates: HashMap<String, f64>,
    pub default_currency: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl UserPreferences {
    /// Synthesized default for a user with no stored record.
    pub fn default_for(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            fallback_order: vec![SourceKind::Api, SourceKind::Llm],
            enabled_sources: BTreeSet::from(SourceKind::ALL),
            custom_rates: HashMap::new(),
            default_currency: None,
            updated_at: Utc::now(),
        }
    }

    /// Fallback order restricted to enabled sources. Sources missing
    /// from `enabled_sources` are never consulted.
    pub fn active_order(&self) -> Vec<SourceKind> {
        self.fallback_order
            .iter()
            .copied()
            .filter(|s| self.enabled_sources.contains(s))
            .collect()
    }
}

/// A partial preference update; unset fields leave the stored record
/// unchanged. Custom rates merge: `set_rates` adds or replaces entries,
/// `clear_rates` removes them.
#[derive(Debug, Clone, Default)]
pub struct PreferenceUpdate {
    pub fallback_order: Option<Vec<SourceKind>>,
    pub enabled_sources: Option<BTreeSet<SourceKind>>,
    pub set_rates: Option<HashMap<String, f64>>,
    pub clear_rates: Option<Vec<String>>,
    pub default_currency: Option<String>,
}

impl PreferenceUpdate {
    pub fn is_empty(&self) -> bool {
        self.fallback_order.is_none()
            && self.enabled_sources.is_none()
            && self.set_rates.is_none()
            && self.clear_rates.is_none()
            && self.default_currency.is_none()
    }
}

/// Applies `update` to `current` and validates the result. Invalid
/// updates are rejected whole; nothing is partially applied.
pub fn apply_update(
    current: &UserPreferences,
    update: PreferenceUpdate,
) -> Result<UserPreferences, RateError> {
    // Write-time failures carry a single variant, including malformed
    // currency codes.
    fn normalize_pref_code(code: &str) -> Result<String, RateError> {
        normalize_code(code).map_err(|e| RateError::InvalidPreference(e.to_string()))
    }

    let mut next = current.clone();

    if let Some(order) = update.fallback_order {
        next.fallback_order = order;
    }
    if let Some(enabled) = update.enabled_sources {
        next.enabled_sources = enabled;
    }
    if let Some(rates) = update.set_rates {
        for (code, rate) in rates {
            if !(rate.is_finite() && rate > 0.0) {
                return Err(RateError::InvalidPreference(format!(
                    "custom rate for {code} must be positive, got {rate}"
                )));
            }
            next.custom_rates.insert(normalize_pref_code(&code)?, rate);
        }
    }
    if let Some(codes) = update.clear_rates {
        for code in codes {
            next.custom_rates.remove(&normalize_pref_code(&code)?);
        }
    }
    if let Some(currency) = update.default_currency {
        next.default_currency = Some(normalize_pref_code(&currency)?);
    }

    let mut seen = BTreeSet::new();
    for source in &next.fallback_order {
        if !seen.insert(*source) {
            return Err(RateError::InvalidPreference(format!(
                "duplicate source {source} in fallback order"
            )));
        }
        if !next.enabled_sources.contains(source) {
            return Err(RateError::InvalidPreference(format!(
                "fallback order references disabled source {source}"
            )));
        }
    }

    next.updated_at = Utc::now();
    Ok(next)
}

/// Per-user preference persistence. A missing record reads as
/// [`UserPreferences::default_for`]; records are created lazily on the
/// first successful write.
#[async_trait]
pub trait PreferenceStore: Send + Sync {
    async fn get(&self, user_id: &str) -> Result<UserPreferences, RateError>;

    async fn set(
        &self,
        user_id: &str,
        update: PreferenceUpdate,
    ) -> Result<UserPreferences, RateError>;
}
