use anyhow::{Context, Result, bail};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::{fs, path::PathBuf};
use tracing::debug;

fn default_timeout_secs() -> u64 {
    10
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct YahooProviderConfig {
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LlmProviderConfig {
    pub base_url: String,
    pub model: String,
    /// Environment variable holding the bearer token, if the endpoint
    /// requires one.
    pub api_key_env: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProvidersConfig {
    pub yahoo: Option<YahooProviderConfig>,
    pub llm: Option<LlmProviderConfig>,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        ProvidersConfig {
            yahoo: Some(YahooProviderConfig {
                base_url: "https://query1.finance.yahoo.com".to_string(),
                timeout_secs: default_timeout_secs(),
            }),
            llm: None,
        }
    }
}

fn default_api_ttl_hours() -> i64 {
    24
}

fn default_llm_ttl_hours() -> i64 {
    6
}

/// Cache lifetimes per source tier. Exact durations are a tuning
/// choice; the load-time contract is only that both are positive.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CacheConfig {
    #[serde(default = "default_api_ttl_hours")]
    pub api_ttl_hours: i64,
    #[serde(default = "default_llm_ttl_hours")]
    pub llm_ttl_hours: i64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            api_ttl_hours: default_api_ttl_hours(),
            llm_ttl_hours: default_llm_ttl_hours(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    pub base_currency: String,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    /// Static fallback matrix, base -> target -> approximate rate.
    /// Empty means the built-in seed table is used.
    #[serde(default)]
    pub default_rates: HashMap<String, HashMap<String, f64>>,
    pub data_path: Option<String>,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("dev", "fxr", "fxr")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn default_data_path(&self) -> Result<PathBuf> {
        if let Some(custom_path) = &self.data_path {
            return Ok(PathBuf::from(custom_path));
        }
        let proj_dirs = ProjectDirs::from("dev", "fxr", "fxr")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.data_dir().to_path_buf())
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        config.validate()?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.cache.api_ttl_hours <= 0 || self.cache.llm_ttl_hours <= 0 {
            bail!("Cache TTLs must be positive");
        }
        for (base, targets) in &self.default_rates {
            for (target, rate) in targets {
                if !(rate.is_finite() && *rate > 0.0) {
                    bail!("Default rate {}/{} must be positive, got {}", base, target, rate);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_deserialization() {
        let yaml_str = r#"
base_currency: "USD"

providers:
  yahoo:
    base_url: "http://example.com/yahoo"
  llm:
    base_url: "http://example.com/llm"
    model: "gpt-4o-mini"
    api_key_env: "FXR_LLM_API_KEY"

cache:
  api_ttl_hours: 48
  llm_ttl_hours: 2

default_rates:
  USD:
    EUR: 0.92
    JPY: 150.0
"#;

        let config: AppConfig = serde_yaml::from_str(yaml_str).expect("Failed to deserialize");
        config.validate().unwrap();
        assert_eq!(config.base_currency, "USD");

        let yahoo = config.providers.yahoo.unwrap();
        assert_eq!(yahoo.base_url, "http://example.com/yahoo");
        assert_eq!(yahoo.timeout_secs, 10);

        let llm = config.providers.llm.unwrap();
        assert_eq!(llm.model, "gpt-4o-mini");
        assert_eq!(llm.api_key_env.as_deref(), Some("FXR_LLM_API_KEY"));

        assert_eq!(config.cache.api_ttl_hours, 48);
        assert_eq!(config.cache.llm_ttl_hours, 2);
        assert_eq!(config.default_rates["USD"]["EUR"], 0.92);
    }

    #[test]
    fn test_config_defaults() {
        let config: AppConfig = serde_yaml::from_str("base_currency: \"EUR\"").unwrap();
        config.validate().unwrap();

        assert!(config.providers.yahoo.is_some());
        assert!(config.providers.llm.is_none());
        assert_eq!(config.cache.api_ttl_hours, 24);
        assert_eq!(config.cache.llm_ttl_hours, 6);
        assert!(config.default_rates.is_empty());
        assert!(config.data_path.is_none());
    }

    #[test]
    fn test_config_rejects_bad_values() {
        let bad_ttl: AppConfig = serde_yaml::from_str(
            "base_currency: \"USD\"\ncache:\n  api_ttl_hours: 0\n",
        )
        .unwrap();
        assert!(bad_ttl.validate().is_err());

        let bad_rate: AppConfig = serde_yaml::from_str(
            "base_currency: \"USD\"\ndefault_rates:\n  USD:\n    EUR: -1.0\n",
        )
        .unwrap();
        assert!(bad_rate.validate().is_err());
    }
}
