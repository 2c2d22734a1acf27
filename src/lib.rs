pub mod cli;
pub mod config;
pub mod core;
pub mod providers;
pub mod store;

use crate::core::defaults::DefaultRateTable;
use crate::core::prefs::PreferenceUpdate;
use crate::core::resolver::{RateResolver, TtlPolicy};
use crate::core::source::{RateProvider, SourceKind};
use crate::providers::{LlmRateProvider, YahooFxProvider};
use anyhow::Result;
use chrono::Duration;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub enum AppCommand {
    Rate {
        base: String,
        target: String,
    },
    Convert {
        amount: f64,
        base: String,
        target: String,
    },
    PrefsShow,
    PrefsSet(PreferenceUpdate),
}

pub async fn run_command(
    command: AppCommand,
    user_id: &str,
    config_path: Option<&str>,
) -> Result<()> {
    info!("FX resolver starting...");

    let config = match config_path {
        Some(path) => config::AppConfig::load_from_path(path)?,
        None => config::AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    let stores = store::open(&config);

    let mut providers: HashMap<SourceKind, Arc<dyn RateProvider>> = HashMap::new();
    if let Some(yahoo) = &config.providers.yahoo {
        providers.insert(
            SourceKind::Api,
            Arc::new(YahooFxProvider::new(
                &yahoo.base_url,
                std::time::Duration::from_secs(yahoo.timeout_secs),
            )?),
        );
    }
    if let Some(llm) = &config.providers.llm {
        let api_key = llm
            .api_key_env
            .as_deref()
            .and_then(|var| match std::env::var(var) {
                Ok(key) => Some(key),
                Err(_) => {
                    warn!("LLM api key env var {} not set", var);
                    None
                }
            });
        providers.insert(
            SourceKind::Llm,
            Arc::new(LlmRateProvider::new(
                &llm.base_url,
                &llm.model,
                api_key,
                std::time::Duration::from_secs(llm.timeout_secs),
            )?),
        );
    }

    let defaults = if config.default_rates.is_empty() {
        DefaultRateTable::builtin_seed()
    } else {
        DefaultRateTable::from_table(config.default_rates.clone())?
    };

    let ttl = TtlPolicy {
        api: Duration::hours(config.cache.api_ttl_hours),
        llm: Duration::hours(config.cache.llm_ttl_hours),
    };

    let resolver = RateResolver::new(
        Arc::clone(&stores.rates),
        Arc::clone(&stores.preferences),
        providers,
        defaults,
        ttl,
        &config.base_currency,
    );

    match command {
        AppCommand::Rate { base, target } => {
            cli::rate::run(&resolver, user_id, &base, &target).await
        }
        AppCommand::Convert {
            amount,
            base,
            target,
        } => cli::convert::run(&resolver, user_id, amount, &base, &target).await,
        AppCommand::PrefsShow => cli::prefs::show(stores.preferences.as_ref(), user_id).await,
        AppCommand::PrefsSet(update) => {
            cli::prefs::set(stores.preferences.as_ref(), user_id, update).await
        }
    }
}
