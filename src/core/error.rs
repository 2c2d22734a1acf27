//! Error taxonomy for rate resolution.

use crate::core::source::SourceKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RateError {
    /// Currency code does not look like an ISO 4217 code. Format check
    /// only; no canonical currency list is consulted.
    #[error("invalid currency code: {0:?}")]
    InvalidCurrency(String),

    /// Rejected preference write, e.g. a fallback order referencing a
    /// disabled source. Never persisted.
    #[error("invalid preference: {0}")]
    InvalidPreference(String),

    /// A live source failed or timed out. Absorbed by the fallback
    /// chain; surfaces only through logs.
    #[error("source {0} unavailable: {1}")]
    SourceUnavailable(SourceKind, String),

    /// No cache hit, no live fetch succeeded, and the default table has
    /// no entry or triangulation path. Terminal for the request.
    #[error("no rate available for {base}/{target}")]
    RateUnavailable { base: String, target: String },

    #[error("store error: {0}")]
    Store(String),
}
