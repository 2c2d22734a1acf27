//! Rate source abstractions.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

/// Identifies a live rate source. `Api` is a market-data quote, `Llm` a
/// generative estimate; the trust ordering between them is advisory and
/// expressed through the default fallback order, not enforced here.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Api,
    Llm,
}

impl SourceKind {
    pub const ALL: [SourceKind; 2] = [SourceKind::Api, SourceKind::Llm];
}

impl Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                SourceKind::Api => "api",
                SourceKind::Llm => "llm",
            }
        )
    }
}

impl FromStr for SourceKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "api" => Ok(SourceKind::Api),
            "llm" => Ok(SourceKind::Llm),
            _ => Err(anyhow::anyhow!("Unknown rate source: {}", s)),
        }
    }
}

/// A single external rate provider. Each implementation owns its own
/// I/O, authentication and a bounded per-call timeout; a timeout is
/// reported as an ordinary failure, never left pending.
#[async_trait]
pub trait RateProvider: Send + Sync {
    fn kind(&self) -> SourceKind;

    async fn fetch_rate(&self, base: &str, target: &str) -> Result<f64>;
}
