use crate::core::source::{RateProvider, SourceKind};
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument};

// LlmRateProvider asks an OpenAI-compatible chat endpoint to estimate a
// rate. Lower trust than a market quote; the default fallback order
// reflects that, not this adapter.
pub struct LlmRateProvider {
    base_url: String,
    model: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl LlmRateProvider {
    pub fn new(
        base_url: &str,
        model: &str,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("fxr/1.0")
            .timeout(timeout)
            .build()?;
        Ok(LlmRateProvider {
            base_url: base_url.to_string(),
            model: model.to_string(),
            api_key,
            client,
        })
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

#[async_trait]
impl RateProvider for LlmRateProvider {
    fn kind(&self) -> SourceKind {
        SourceKind::Llm
    }

    #[instrument(
        name = "LlmRateFetch",
        skip(self),
        fields(base = %base, target = %target, model = %self.model)
    )]
    async fn fetch_rate(&self, base: &str, target: &str) -> Result<f64> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        debug!("Requesting rate estimate from {}", url);

        let body = serde_json::json!({
            "model": self.model,
            "temperature": 0.0,
            "messages": [
                {
                    "role": "system",
                    "content": "You estimate currency exchange rates. \
                                Reply with a single positive decimal number and nothing else."
                },
                {
                    "role": "user",
                    "content": format!(
                        "What is the current exchange rate from {base} to {target}? \
                         Reply with only the numeric rate."
                    )
                }
            ]
        });

        let mut request = self.client.post(&url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| anyhow!("Request error: {} for pair {}/{}", e, base, target))?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "HTTP error: {} for pair {}/{}",
                response.status(),
                base,
                target
            ));
        }

        let data = response
            .json::<ChatResponse>()
            .await
            .with_context(|| format!("Failed to parse completion for {base}/{target}"))?;

        let content = data
            .choices
            .first()
            .map(|c| c.message.content.trim())
            .ok_or_else(|| anyhow!("Empty completion for pair {}/{}", base, target))?;

        let rate: f64 = content
            .parse()
            .map_err(|_| anyhow!("Non-numeric rate estimate: {:?}", content))?;
        if !(rate.is_finite() && rate > 0.0) {
            return Err(anyhow!("Non-positive rate estimate: {}", rate));
        }
        Ok(rate)
    }
}
