use anyhow::{bail, Result};
use async_trait::async_trait;

use super::{validate_embeddings, EmbeddingProvider, InputType};
use crate::config::EmbeddingConfig;
use crate::error::RagError;
use crate::http;

const DEFAULT_BASE_URL: &str = "https://api.voyageai.com";
const PROVIDER: &str = "voyage";

/// Embedding provider using the Voyage AI API.
///
/// Calls `POST {base_url}/v1/embeddings` with the configured model and the
/// request's `input_type`. Inputs are sent in batches of at most
/// `batch_size` texts; the results are concatenated in input order.
pub struct VoyageProvider {
    model: String,
    dims: usize,
    batch_size: usize,
    max_retries: u32,
    url: String,
    api_key: String,
    client: reqwest::Client,
}

impl VoyageProvider {
    /// Create a provider from configuration, reading `VOYAGE_API_KEY`.
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let api_key = match std::env::var("VOYAGE_API_KEY") {
            Ok(key) if !key.is_empty() => key,
            _ => bail!("VOYAGE_API_KEY environment variable not set"),
        };
        Self::with_api_key(config, api_key)
    }

    pub fn with_api_key(config: &EmbeddingConfig, api_key: String) -> Result<Self> {
        let base = config
            .base_url
            .as_deref()
            .unwrap_or(DEFAULT_BASE_URL)
            .trim_end_matches('/');
        Ok(Self {
            model: config.model.clone(),
            dims: config.dims,
            batch_size: config.batch_size.max(1),
            max_retries: config.max_retries,
            url: format!("{}/v1/embeddings", base),
            api_key,
            client: http::build_client(config.timeout_secs)?,
        })
    }

    async fn embed_batch(
        &self,
        texts: &[String],
        input_type: InputType,
    ) -> Result<Vec<Vec<f32>>, RagError> {
        let body = serde_json::json!({
            "input": texts,
            "model": self.model,
            "input_type": input_type.as_str(),
        });
        let headers = [("Authorization", format!("Bearer {}", self.api_key))];
        let json = http::post_json(
            &self.client,
            PROVIDER,
            &self.url,
            &headers,
            &body,
            self.max_retries,
        )
        .await?;
        parse_voyage_response(&json)
    }
}

#[async_trait]
impl EmbeddingProvider for VoyageProvider {
    fn model_name(&self) -> &str {
        &self.model
    }
    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed(
        &self,
        texts: &[String],
        input_type: InputType,
    ) -> Result<Vec<Vec<f32>>, RagError> {
        let mut out = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            let vectors = self.embed_batch(batch, input_type).await?;
            validate_embeddings(PROVIDER, batch.len(), self.dims, &vectors)?;
            out.extend(vectors);
        }
        log::debug!(
            "embedded {} texts as {} with {}",
            out.len(),
            input_type.as_str(),
            self.model
        );
        Ok(out)
    }
}

/// Parse the Voyage embeddings response JSON.
///
/// Extracts `data[].embedding` and orders them by `data[].index` so the
/// result lines up with the request inputs.
fn parse_voyage_response(json: &serde_json::Value) -> Result<Vec<Vec<f32>>, RagError> {
    let data = json
        .get("data")
        .and_then(|d| d.as_array())
        .ok_or_else(|| RagError::provider(PROVIDER, "invalid response: missing data array"))?;

    let mut indexed = Vec::with_capacity(data.len());

    for (position, item) in data.iter().enumerate() {
        let embedding = item
            .get("embedding")
            .and_then(|e| e.as_array())
            .ok_or_else(|| RagError::provider(PROVIDER, "invalid response: missing embedding"))?;

        let index = item
            .get("index")
            .and_then(|i| i.as_u64())
            .map(|i| i as usize)
            .unwrap_or(position);

        let vec: Vec<f32> = embedding
            .iter()
            .map(|v| v.as_f64().unwrap_or(0.0) as f32)
            .collect();

        indexed.push((index, vec));
    }

    indexed.sort_by_key(|(index, _)| *index);
    Ok(indexed.into_iter().map(|(_, v)| v).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_orders_by_index() {
        let json = serde_json::json!({
            "object": "list",
            "data": [
                {"object": "embedding", "embedding": [0.0, 1.0], "index": 1},
                {"object": "embedding", "embedding": [1.0, 0.0], "index": 0}
            ],
            "model": "voyage-3",
            "usage": {"total_tokens": 4}
        });
        let vecs = parse_voyage_response(&json).unwrap();
        assert_eq!(vecs, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }

    #[test]
    fn test_parse_missing_data() {
        let json = serde_json::json!({"detail": "Unauthorized"});
        let err = parse_voyage_response(&json).unwrap_err();
        assert!(err.to_string().contains("missing data array"));
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let config = EmbeddingConfig {
            base_url: Some("http://127.0.0.1:9999/".to_string()),
            ..EmbeddingConfig::default()
        };
        let provider = VoyageProvider::with_api_key(&config, "k".to_string()).unwrap();
        assert_eq!(provider.url, "http://127.0.0.1:9999/v1/embeddings");
        assert_eq!(provider.dims(), 1024);
        assert_eq!(provider.model_name(), "voyage-3");
    }
}
