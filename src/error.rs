//! Error taxonomy for the pipeline seams.
//!
//! Application code (ingestion, CLI commands) propagates [`anyhow::Result`];
//! the typed [`RagError`] is returned where a caller needs to tell the
//! failure classes apart, e.g. the interactive loop distinguishing an empty
//! question from a provider outage.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RagError {
    /// The vector store could not be reached or the pool failed.
    #[error("store connection failed: {0}")]
    Connection(String),

    /// An embedding or generation call failed (HTTP, auth, rate limit, bad payload).
    #[error("{provider} provider error: {message}")]
    Provider { provider: String, message: String },

    /// The question was empty or whitespace only.
    #[error("question must not be empty")]
    EmptyQuestion,

    /// A vector did not match the store's configured dimensionality.
    #[error("embedding has {actual} dimensions, store expects {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// The PDF could not be read or parsed.
    #[error("PDF extraction failed: {0}")]
    Pdf(String),
}

impl RagError {
    pub fn provider(provider: &str, message: impl Into<String>) -> Self {
        RagError::Provider {
            provider: provider.to_string(),
            message: message.into(),
        }
    }
}
