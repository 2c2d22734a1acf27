//! Rate resolution: overrides, cache probing, live dispatch, defaults.

use crate::core::cache::RateCache;
use crate::core::currency::normalize_code;
use crate::core::defaults::DefaultRateTable;
use crate::core::error::RateError;
use crate::core::flight::SingleFlight;
use crate::core::prefs::PreferenceStore;
use crate::core::source::{RateProvider, SourceKind};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::fmt::Display;
use std::sync::Arc;
use tracing::{debug, warn};

/// Fixed reference pivot used when the user's default currency is one
/// of the pair being resolved.
const REFERENCE_PIVOT: &str = "USD";

/// How a resolved rate was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provenance {
    Identity,
    Override,
    Cache(SourceKind),
    CacheInverted(SourceKind),
    CacheTriangulated(SourceKind),
    Live(SourceKind),
    Default,
}

impl Provenance {
    /// Default-table rates are approximate and should be rendered with
    /// a staleness warning.
    pub fn is_stale(&self) -> bool {
        matches!(self, Provenance::Default)
    }
}

impl Display for Provenance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Provenance::Identity => write!(f, "identity"),
            Provenance::Override => write!(f, "override"),
            Provenance::Cache(s) => write!(f, "cache:{s}"),
            Provenance::CacheInverted(s) => write!(f, "cache-inverted:{s}"),
            Provenance::CacheTriangulated(s) => write!(f, "cache-triangulated:{s}"),
            Provenance::Live(s) => write!(f, "live:{s}"),
            Provenance::Default => write!(f, "default"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ResolvedRate {
    pub rate: f64,
    pub provenance: Provenance,
}

#[derive(Debug, Clone, Copy)]
pub struct Conversion {
    pub amount: f64,
    pub converted: f64,
    pub rate: f64,
    pub provenance: Provenance,
}

/// Per-source cache lifetimes. Market quotes change slowly and get a
/// long TTL; generative estimates are lower trust and refresh eagerly.
#[derive(Debug, Clone, Copy)]
pub struct TtlPolicy {
    pub api: Duration,
    pub llm: Duration,
}

impl TtlPolicy {
    pub fn for_source(&self, source: SourceKind) -> Duration {
        match source {
            SourceKind::Api => self.api,
            SourceKind::Llm => self.llm,
        }
    }
}

impl Default for TtlPolicy {
    fn default() -> Self {
        Self {
            api: Duration::hours(24),
            llm: Duration::hours(6),
        }
    }
}

/// Orchestrates rate resolution for a user and an ordered currency
/// pair: user override, then cache (direct, inverted, triangulated),
/// then live sources in the user's fallback order behind the
/// single-flight coordinator, then the static default table.
pub struct RateResolver {
    cache: Arc<dyn RateCache>,
    preferences: Arc<dyn PreferenceStore>,
    providers: HashMap<SourceKind, Arc<dyn RateProvider>>,
    defaults: DefaultRateTable,
    flight: SingleFlight,
    ttl: TtlPolicy,
    base_currency: String,
}

impl RateResolver {
    pub fn new(
        cache: Arc<dyn RateCache>,
        preferences: Arc<dyn PreferenceStore>,
        providers: HashMap<SourceKind, Arc<dyn RateProvider>>,
        defaults: DefaultRateTable,
        ttl: TtlPolicy,
        base_currency: &str,
    ) -> Self {
        Self {
            cache,
            preferences,
            providers,
            defaults,
            flight: SingleFlight::new(),
            ttl,
            base_currency: base_currency.to_ascii_uppercase(),
        }
    }

    pub async fn resolve(
        &self,
        user_id: &str,
        base: &str,
        target: &str,
    ) -> Result<ResolvedRate, RateError> {
        let base = normalize_code(base)?;
        let target = normalize_code(target)?;

        if base == target {
            return Ok(ResolvedRate {
                rate: 1.0,
                provenance: Provenance::Identity,
            });
        }

        let prefs = self.preferences.get(user_id).await?;
        let default_currency = prefs
            .default_currency
            .clone()
            .unwrap_or_else(|| self.base_currency.clone());

        // User overrides are keyed by target currency with the user's
        // default currency as the implicit base.
        if base == default_currency {
            if let Some(rate) = prefs.custom_rates.get(&target) {
                debug!(user = user_id, %base, %target, rate, "Using custom override rate");
                return Ok(ResolvedRate {
                    rate: *rate,
                    provenance: Provenance::Override,
                });
            }
        }

        let order = prefs.active_order();
        let now = Utc::now();

        for source in &order {
            if let Some(row) = self.cache.get(&base, &target, *source).await {
                if !row.is_expired(now) {
                    return Ok(ResolvedRate {
                        rate: row.rate,
                        provenance: Provenance::Cache(*source),
                    });
                }
            }
        }

        for source in &order {
            if let Some(row) = self.cache.get(&target, &base, *source).await {
                if !row.is_expired(now) {
                    return Ok(ResolvedRate {
                        rate: 1.0 / row.rate,
                        provenance: Provenance::CacheInverted(*source),
                    });
                }
            }
        }

        let pivot = pivot_for(&default_currency, &base, &target);
        if let Some(pivot) = &pivot {
            for source in &order {
                let first = self.cached_leg(&base, pivot, *source, now).await;
                let second = self.cached_leg(pivot, &target, *source, now).await;
                if let (Some(first), Some(second)) = (first, second) {
                    debug!(%base, %target, %pivot, source = %source, "Triangulated from cache");
                    return Ok(ResolvedRate {
                        rate: first * second,
                        provenance: Provenance::CacheTriangulated(*source),
                    });
                }
            }
        }

        for source in &order {
            let Some(provider) = self.providers.get(source) else {
                debug!(source = %source, "No provider configured, skipping");
                continue;
            };

            match self.fetch_live(provider, &base, &target, *source).await {
                Ok(rate) => {
                    return Ok(ResolvedRate {
                        rate,
                        provenance: Provenance::Live(*source),
                    });
                }
                Err(RateError::SourceUnavailable(kind, reason)) => {
                    warn!(source = %kind, %base, %target, %reason, "Source failed, trying next");
                }
                Err(other) => return Err(other),
            }
        }

        if let Some(rate) = self.defaults.lookup(&base, &target) {
            return Ok(ResolvedRate {
                rate,
                provenance: Provenance::Default,
            });
        }
        if let Some(pivot) = &pivot {
            if let Some(rate) = self.defaults.lookup_via(&base, &target, pivot) {
                return Ok(ResolvedRate {
                    rate,
                    provenance: Provenance::Default,
                });
            }
        }

        Err(RateError::RateUnavailable { base, target })
    }

    /// Composes [`resolve`](Self::resolve) with multiplication. No
    /// rounding happens here; display formatting is the caller's
    /// concern.
    pub async fn convert(
        &self,
        user_id: &str,
        amount: f64,
        base: &str,
        target: &str,
    ) -> Result<Conversion, RateError> {
        let resolved = self.resolve(user_id, base, target).await?;
        Ok(Conversion {
            amount,
            converted: amount * resolved.rate,
            rate: resolved.rate,
            provenance: resolved.provenance,
        })
    }

    /// A cached rate for one triangulation leg, direct or inverted,
    /// from one consistent source.
    async fn cached_leg(
        &self,
        from: &str,
        to: &str,
        source: SourceKind,
        now: DateTime<Utc>,
    ) -> Option<f64> {
        if let Some(row) = self.cache.get(from, to, source).await {
            if !row.is_expired(now) {
                return Some(row.rate);
            }
        }
        if let Some(row) = self.cache.get(to, from, source).await {
            if !row.is_expired(now) {
                return Some(1.0 / row.rate);
            }
        }
        None
    }

    /// Runs one live fetch behind the single-flight coordinator. The
    /// flight winner validates the rate and writes the cache row; every
    /// waiter observes the same outcome.
    async fn fetch_live(
        &self,
        provider: &Arc<dyn RateProvider>,
        base: &str,
        target: &str,
        source: SourceKind,
    ) -> Result<f64, RateError> {
        let provider = Arc::clone(provider);
        let cache = Arc::clone(&self.cache);
        let ttl = self.ttl.for_source(source);
        let base = base.to_string();
        let target = target.to_string();
        let key = (base.clone(), target.clone(), source);

        self.flight
            .fetch(key, async move {
                let rate = provider.fetch_rate(&base, &target).await?;
                anyhow::ensure!(
                    rate.is_finite() && rate > 0.0,
                    "non-positive rate {rate} for {base}/{target}"
                );
                cache.put(&base, &target, source, rate, ttl).await;
                Ok(rate)
            })
            .await
            .map_err(|reason| RateError::SourceUnavailable(source, reason))
    }
}

/// Picks the triangulation pivot: the user's default currency, or the
/// fixed reference when that currency is itself part of the pair. None
/// when no candidate is distinct from both sides.
fn pivot_for(default_currency: &str, base: &str, target: &str) -> Option<String> {
    [default_currency, REFERENCE_PIVOT]
        .into_iter()
        .find(|c| *c != base && *c != target)
        .map(str::to_string)
}
