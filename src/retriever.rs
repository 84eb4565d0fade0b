//! Query-time retrieval with a fixed similarity policy.
//!
//! The default policy is plain similarity search: top `k = 3`, scores at or
//! above `0.01`, no re-ranking, no metadata pre-filter.

use std::sync::Arc;

use anyhow::Result;

use crate::config::RetrievalConfig;
use crate::embedding::{embed_query, EmbeddingProvider};
use crate::error::RagError;
use crate::models::ScoredRecord;
use crate::store::{MetadataFilter, SearchParams, VectorStore};

pub struct Retriever {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    params: SearchParams,
}

impl Retriever {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
        params: SearchParams,
    ) -> Self {
        Self {
            embedder,
            store,
            params,
        }
    }

    pub fn from_config(
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
        config: &RetrievalConfig,
    ) -> Result<Self> {
        let filter = config
            .pre_filter
            .as_deref()
            .map(MetadataFilter::parse)
            .transpose()?;
        Ok(Self::new(
            embedder,
            store,
            SearchParams {
                k: config.k,
                score_threshold: config.score_threshold,
                filter,
            },
        ))
    }

    pub fn params(&self) -> &SearchParams {
        &self.params
    }

    /// Embed `query` and return at most `k` records scoring at least the
    /// threshold, best first.
    pub async fn retrieve(&self, query: &str) -> Result<Vec<ScoredRecord>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(RagError::EmptyQuestion.into());
        }

        let vector = embed_query(self.embedder.as_ref(), query).await?;
        let mut results = self.store.query(&vector, &self.params).await?;

        // Backends rank already; hold the contract even for a store that over-returns.
        results.retain(|r| r.score >= self.params.score_threshold);
        results.truncate(self.params.k);

        log::debug!("retrieved {} chunks for query", results.len());
        Ok(results)
    }
}
