//! Runtime configuration read from the process environment.
//!
//! `.env` files are loaded by the binary before `AppConfig::from_env` runs.
//! The API key is optional here; its absence only matters once a question
//! is actually sent.

use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/openai";
pub const DEFAULT_MODEL: &str = "gemini-1.5-pro";
pub const DEFAULT_DESIGNATION_COLUMN: &str = "designation_title";
pub const DEFAULT_DISTRICT_COLUMN: &str = "district_name";

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub timeout: Duration,
    pub max_retries: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.1,
            timeout: Duration::from_secs(60),
            max_retries: 2,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub llm: LlmConfig,
    pub designation_column: String,
    pub district_column: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            llm: LlmConfig::default(),
            designation_column: DEFAULT_DESIGNATION_COLUMN.to_string(),
            district_column: DEFAULT_DISTRICT_COLUMN.to_string(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = AppConfig::default();

        let llm = LlmConfig {
            api_key: get("GOOGLE_API_KEY").or_else(|| get("LLM_API_KEY")),
            base_url: get("LLM_BASE_URL").unwrap_or(defaults.llm.base_url),
            model: get("LLM_MODEL").unwrap_or(defaults.llm.model),
            temperature: defaults.llm.temperature,
            timeout: get("LLM_TIMEOUT_SECS")
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.llm.timeout),
            max_retries: get("LLM_MAX_RETRIES")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.llm.max_retries),
        };

        Self {
            llm,
            designation_column: get("CADRE_DESIGNATION_COLUMN").unwrap_or(defaults.designation_column),
            district_column: get("CADRE_DISTRICT_COLUMN").unwrap_or(defaults.district_column),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_without_environment() {
        let config = AppConfig::from_lookup(|_| None);
        assert!(config.llm.api_key.is_none());
        assert_eq!(config.llm.model, DEFAULT_MODEL);
        assert_eq!(config.designation_column, "designation_title");
        assert_eq!(config.llm.max_retries, 2);
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = [
            ("GOOGLE_API_KEY", "  "),
            ("LLM_API_KEY", "secret"),
            ("LLM_TIMEOUT_SECS", "5"),
            ("LLM_MAX_RETRIES", "not a number"),
            ("CADRE_DISTRICT_COLUMN", "District Name"),
        ]
        .into_iter()
        .collect();
        let config = AppConfig::from_lookup(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.llm.api_key.as_deref(), Some("secret"));
        assert_eq!(config.llm.timeout, Duration::from_secs(5));
        assert_eq!(config.llm.max_retries, 2);
        assert_eq!(config.district_column, "District Name");
    }
}
