//! Shared JSON-over-HTTP call used by the embedding and chat providers.
//!
//! Retry strategy (only when `max_retries > 0`):
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → fail immediately
//! - Network errors → retry
//! - Backoff: 1s, 2s, 4s, 8s, 16s, 32s (capped at 2^5)

use std::time::Duration;

use crate::error::RagError;

pub fn build_client(timeout_secs: u64) -> Result<reqwest::Client, RagError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| RagError::provider("http", e.to_string()))
}

/// POST `body` to `url` and return the decoded JSON response.
pub async fn post_json(
    client: &reqwest::Client,
    provider: &str,
    url: &str,
    headers: &[(&str, String)],
    body: &serde_json::Value,
    max_retries: u32,
) -> Result<serde_json::Value, RagError> {
    let mut last_err = None;

    for attempt in 0..=max_retries {
        if attempt > 0 {
            let delay = Duration::from_secs(1 << (attempt - 1).min(5));
            log::debug!("{}: retry {} after {:?}", provider, attempt, delay);
            tokio::time::sleep(delay).await;
        }

        let mut request = client
            .post(url)
            .header("Content-Type", "application/json")
            .json(body);
        for (name, value) in headers {
            request = request.header(*name, value);
        }

        match request.send().await {
            Ok(response) => {
                let status = response.status();

                if status.is_success() {
                    return response
                        .json::<serde_json::Value>()
                        .await
                        .map_err(|e| RagError::provider(provider, format!("invalid JSON: {}", e)));
                }

                let body_text = response.text().await.unwrap_or_default();
                let err = RagError::provider(provider, format!("HTTP {}: {}", status, body_text));

                // Rate limited or server error: retry
                if status.as_u16() == 429 || status.is_server_error() {
                    log::warn!("{} call failed with {}", provider, status);
                    last_err = Some(err);
                    continue;
                }

                return Err(err);
            }
            Err(e) => {
                log::warn!("{} request error: {}", provider, e);
                last_err = Some(RagError::provider(provider, e.to_string()));
                continue;
            }
        }
    }

    Err(last_err.unwrap_or_else(|| RagError::provider(provider, "request failed after retries")))
}
