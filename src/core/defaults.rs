//! Static fallback rate table.

use anyhow::{Result, bail};
use std::collections::HashMap;

/// Process-wide matrix of approximate rates, base -> target -> rate.
/// Loaded once at startup from config (or the built-in seed) and
/// consulted only after every live source has failed; results from it
/// always carry the `default` provenance so callers can warn the user.
#[derive(Debug, Clone)]
pub struct DefaultRateTable {
    rates: HashMap<String, HashMap<String, f64>>,
}

impl DefaultRateTable {
    /// Builds a table from config data, validating every rate for
    /// positivity and uppercasing the codes.
    pub fn from_table(table: HashMap<String, HashMap<String, f64>>) -> Result<Self> {
        let mut rates: HashMap<String, HashMap<String, f64>> = HashMap::new();
        for (base, targets) in table {
            let base = base.to_ascii_uppercase();
            for (target, rate) in targets {
                if !(rate.is_finite() && rate > 0.0) {
                    bail!(
                        "Default rate {}/{} must be positive, got {}",
                        base,
                        target,
                        rate
                    );
                }
                rates
                    .entry(base.clone())
                    .or_default()
                    .insert(target.to_ascii_uppercase(), rate);
            }
        }
        Ok(Self { rates })
    }

    /// Approximate USD-anchored seed used when the config carries no
    /// default table. Not authoritative; purely a last resort.
    pub fn builtin_seed() -> Self {
        let usd = HashMap::from([
            ("EUR".to_string(), 0.92),
            ("GBP".to_string(), 0.79),
            ("JPY".to_string(), 150.0),
            ("CHF".to_string(), 0.88),
            ("CAD".to_string(), 1.36),
            ("AUD".to_string(), 1.52),
            ("INR".to_string(), 83.0),
            ("IDR".to_string(), 16000.0),
            ("SGD".to_string(), 1.34),
            ("CNY".to_string(), 7.2),
        ]);
        Self {
            rates: HashMap::from([("USD".to_string(), usd)]),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }

    /// Direct entry, falling back to the inverse of the reverse entry.
    pub fn lookup(&self, base: &str, target: &str) -> Option<f64> {
        if let Some(rate) = self.rates.get(base).and_then(|t| t.get(target)) {
            return Some(*rate);
        }
        self.rates
            .get(target)
            .and_then(|t| t.get(base))
            .map(|rate| 1.0 / rate)
    }

    /// Composes base->pivot and pivot->target when no direct entry
    /// exists, each leg itself direct-or-inverted.
    pub fn lookup_via(&self, base: &str, target: &str, pivot: &str) -> Option<f64> {
        let first = self.lookup(base, pivot)?;
        let second = self.lookup(pivot, target)?;
        Some(first * second)
    }
}
