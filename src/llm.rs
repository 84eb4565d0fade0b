//! Generative model abstraction.
//!
//! [`ChatProvider`] turns a prompt into generated text. [`GeminiProvider`]
//! calls the Google Generative Language `generateContent` endpoint with the
//! configured temperature (0 by default, for deterministic sampling).

use anyhow::{bail, Result};
use async_trait::async_trait;

use crate::config::LlmConfig;
use crate::error::RagError;
use crate::http;

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const PROVIDER: &str = "gemini";

#[async_trait]
pub trait ChatProvider: Send + Sync {
    fn model_name(&self) -> &str;
    async fn generate(&self, prompt: &str) -> Result<String, RagError>;
}

pub struct GeminiProvider {
    model: String,
    temperature: f32,
    max_retries: u32,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl GeminiProvider {
    /// Create a provider from configuration, reading `GEMINI_API_KEY`.
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let api_key = match std::env::var("GEMINI_API_KEY") {
            Ok(key) if !key.is_empty() => key,
            _ => bail!("GEMINI_API_KEY environment variable not set"),
        };
        Self::with_api_key(config, api_key)
    }

    pub fn with_api_key(config: &LlmConfig, api_key: String) -> Result<Self> {
        Ok(Self {
            model: config.model.clone(),
            temperature: config.temperature,
            max_retries: config.max_retries,
            base_url: config
                .base_url
                .as_deref()
                .unwrap_or(GEMINI_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
            api_key,
            client: http::build_client(config.timeout_secs)?,
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }
}

#[async_trait]
impl ChatProvider for GeminiProvider {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> Result<String, RagError> {
        let body = serde_json::json!({
            "contents": [
                {"role": "user", "parts": [{"text": prompt}]}
            ],
            "generationConfig": {"temperature": self.temperature},
        });
        let headers = [("x-goog-api-key", self.api_key.clone())];
        let json = http::post_json(
            &self.client,
            PROVIDER,
            &self.endpoint(),
            &headers,
            &body,
            self.max_retries,
        )
        .await?;
        parse_gemini_response(&json)
    }
}

/// Concatenate the text parts of the first candidate.
fn parse_gemini_response(json: &serde_json::Value) -> Result<String, RagError> {
    let candidate = json
        .get("candidates")
        .and_then(|c| c.as_array())
        .and_then(|c| c.first())
        .ok_or_else(|| {
            let reason = json
                .pointer("/promptFeedback/blockReason")
                .and_then(|r| r.as_str())
                .unwrap_or("no candidates returned");
            RagError::provider(PROVIDER, format!("invalid response: {}", reason))
        })?;

    let parts = candidate
        .pointer("/content/parts")
        .and_then(|p| p.as_array())
        .ok_or_else(|| RagError::provider(PROVIDER, "invalid response: missing content parts"))?;

    Ok(parts
        .iter()
        .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
        .collect::<Vec<_>>()
        .concat())
}

/// Create the [`ChatProvider`] named by `config.provider`.
pub fn create_chat_provider(config: &LlmConfig) -> Result<Box<dyn ChatProvider>> {
    match config.provider.as_str() {
        "gemini" => Ok(Box::new(GeminiProvider::new(config)?)),
        other => bail!("Unknown llm provider: {}", other),
    }
}
