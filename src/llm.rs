use crate::config::LlmConfig;
use crate::error::{Result, WranglerError};
use async_trait::async_trait;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Text-in / text-out question answering.
#[async_trait]
pub trait Answerer: Send + Sync {
    async fn answer(&self, prompt: &str) -> Result<String>;
}

/// Client for an OpenAI-compatible chat completions endpoint.
#[derive(Clone)]
pub struct LlmClient {
    config: LlmConfig,
    http: reqwest::Client,
}

impl LlmClient {
    pub fn new(config: LlmConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| WranglerError::Llm(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { config, http })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    pub async fn call_llm(&self, prompt: &str) -> Result<String> {
        let api_key = self.config.api_key.as_deref().ok_or(WranglerError::MissingApiKey)?;

        let body = serde_json::json!({
            "model": self.config.model,
            "messages": [
                {"role": "user", "content": prompt}
            ],
            "temperature": self.config.temperature,
        });
        let url = format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'));

        let attempts = self.config.max_retries + 1;
        let mut last_error = WranglerError::Llm("LLM API was not called".to_string());
        for attempt in 1..=attempts {
            let started = Instant::now();
            match self.send_once(&url, api_key, &body).await {
                Ok(content) => {
                    info!(
                        "LLM call succeeded (model {}, attempt {}, {} ms)",
                        self.config.model,
                        attempt,
                        started.elapsed().as_millis()
                    );
                    return Ok(content);
                }
                Err(Attempt::Fatal(e)) => return Err(e),
                Err(Attempt::Retryable(e)) => {
                    warn!("LLM call attempt {}/{} failed: {}", attempt, attempts, e);
                    last_error = e;
                    if attempt < attempts {
                        tokio::time::sleep(Duration::from_millis(500 * u64::from(attempt))).await;
                    }
                }
            }
        }
        Err(last_error)
    }

    async fn send_once(
        &self,
        url: &str,
        api_key: &str,
        body: &serde_json::Value,
    ) -> std::result::Result<String, Attempt> {
        let response = self
            .http
            .post(url)
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| Attempt::Retryable(WranglerError::Llm(format!("LLM API call failed: {}", e))))?;

        // Check HTTP status
        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            let err = WranglerError::Llm(format!("LLM API error ({}): {}", status, error_text));
            return Err(if status.as_u16() == 429 || status.is_server_error() {
                Attempt::Retryable(err)
            } else {
                Attempt::Fatal(err)
            });
        }

        let response_json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| Attempt::Fatal(WranglerError::Llm(format!("Failed to parse LLM response: {}", e))))?;

        extract_content(&response_json).map_err(Attempt::Fatal)
    }
}

enum Attempt {
    Retryable(WranglerError),
    Fatal(WranglerError),
}

fn extract_content(response_json: &serde_json::Value) -> Result<String> {
    response_json["choices"][0]["message"]["content"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| WranglerError::Llm("No content in LLM response".to_string()))
}

#[async_trait]
impl Answerer for LlmClient {
    async fn answer(&self, prompt: &str) -> Result<String> {
        self.call_llm(prompt).await
    }
}
