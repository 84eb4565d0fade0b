//! Embedding provider abstraction and vector utilities.
//!
//! Defines the [`EmbeddingProvider`] trait and the concrete
//! [`VoyageProvider`], which calls the Voyage AI embeddings API. Documents
//! and queries are embedded with different [`InputType`]s, matching the
//! asymmetric retrieval models Voyage serves.
//!
//! Also provides vector utilities used by the stores:
//! - [`cosine_similarity`]: compute similarity between two embedding vectors
//! - [`vec_to_blob`]: encode a `Vec<f32>` as little-endian bytes for SQLite BLOB storage
//! - [`blob_to_vec`]: decode a SQLite BLOB back into a `Vec<f32>`
//!
//! # Provider Selection
//!
//! Use [`create_provider`] to instantiate the provider named in the
//! configuration. The API key is read from `VOYAGE_API_KEY`.

mod voyage;

pub use voyage::VoyageProvider;

use anyhow::{bail, Result};
use async_trait::async_trait;

use crate::config::EmbeddingConfig;
use crate::error::RagError;

/// Whether text is being indexed or used to search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputType {
    Document,
    Query,
}

impl InputType {
    pub fn as_str(&self) -> &'static str {
        match self {
            InputType::Document => "document",
            InputType::Query => "query",
        }
    }
}

/// Trait for embedding providers.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Returns the model identifier (e.g. `"voyage-3"`).
    fn model_name(&self) -> &str;
    /// Returns the embedding vector dimensionality (e.g. `1024`).
    fn dims(&self) -> usize;

    /// Embed a batch of texts.
    ///
    /// Returns one vector per input text, in input order, each of length
    /// [`dims`](EmbeddingProvider::dims).
    async fn embed(&self, texts: &[String], input_type: InputType)
        -> Result<Vec<Vec<f32>>, RagError>;
}

/// Embed a single query text.
pub async fn embed_query(provider: &dyn EmbeddingProvider, text: &str) -> Result<Vec<f32>, RagError> {
    let results = provider
        .embed(&[text.to_string()], InputType::Query)
        .await?;
    results
        .into_iter()
        .next()
        .ok_or_else(|| RagError::provider(provider.model_name(), "empty embedding response"))
}

/// Check a provider response against the request: one vector per text, each
/// of the expected dimensionality.
pub fn validate_embeddings(
    provider: &str,
    expected_count: usize,
    dims: usize,
    vectors: &[Vec<f32>],
) -> Result<(), RagError> {
    if vectors.len() != expected_count {
        return Err(RagError::provider(
            provider,
            format!(
                "expected {} embeddings, got {}",
                expected_count,
                vectors.len()
            ),
        ));
    }
    if let Some(bad) = vectors.iter().find(|v| v.len() != dims) {
        return Err(RagError::DimensionMismatch {
            expected: dims,
            actual: bad.len(),
        });
    }
    Ok(())
}

/// Create the [`EmbeddingProvider`] named by `config.provider`.
///
/// | Config Value | Provider |
/// |-------------|----------|
/// | `"voyage"` | [`VoyageProvider`] |
pub fn create_provider(config: &EmbeddingConfig) -> Result<Box<dyn EmbeddingProvider>> {
    match config.provider.as_str() {
        "voyage" => Ok(Box::new(VoyageProvider::new(config)?)),
        other => bail!("Unknown embedding provider: {}", other),
    }
}

/// Encode a float vector as a BLOB (little-endian f32 bytes).
///
/// ```rust
/// use pdf_rag::embedding::{vec_to_blob, blob_to_vec};
///
/// let v = vec![1.0f32, -2.5, 3.125];
/// let blob = vec_to_blob(&v);
/// assert_eq!(blob.len(), 12); // 3 × 4 bytes
/// assert_eq!(blob_to_vec(&blob), v);
/// ```
pub fn vec_to_blob(vec: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vec.len() * 4);
    for &v in vec {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

/// Decode a BLOB back into a float vector.
pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

/// Compute cosine similarity between two embedding vectors.
///
/// Returns a value in `[-1.0, 1.0]`, or `0.0` for empty vectors or vectors
/// of different lengths.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }

    dot / denom
}

/// Map cosine similarity onto `[0, 1]` as `(1 + cos) / 2`.
///
/// This is the score the store ranks and thresholds on.
pub fn similarity_score(a: &[f32], b: &[f32]) -> f64 {
    (1.0 + cosine_similarity(a, b) as f64) / 2.0
}
