//! Core rate-resolution logic

pub mod cache;
pub mod currency;
pub mod defaults;
pub mod error;
pub mod flight;
pub mod log;
pub mod prefs;
pub mod resolver;
pub mod source;

// Re-export main types for cleaner imports
pub use cache::{CachedRate, RateCache};
pub use defaults::DefaultRateTable;
pub use error::RateError;
pub use prefs::{PreferenceStore, PreferenceUpdate, UserPreferences};
pub use resolver::{Conversion, Provenance, RateResolver, ResolvedRate, TtlPolicy};
pub use source::{RateProvider, SourceKind};
