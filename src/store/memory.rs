//! In-memory [`VectorStore`] implementation for testing and dry runs.
//!
//! Records live in a `Vec` behind `std::sync::RwLock`. Query is a
//! brute-force cosine scan over every record.

use std::sync::RwLock;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use super::{check_dims, rank_candidates, SearchParams, VectorStore};
use crate::embedding::similarity_score;
use crate::models::{ScoredRecord, StoredRecord};

pub struct InMemoryStore {
    dims: usize,
    records: RwLock<Vec<StoredRecord>>,
}

impl InMemoryStore {
    pub fn new(dims: usize) -> Self {
        Self {
            dims,
            records: RwLock::new(Vec::new()),
        }
    }
}

#[async_trait]
impl VectorStore for InMemoryStore {
    fn dims(&self) -> usize {
        self.dims
    }

    async fn insert(&self, records: &[StoredRecord]) -> Result<usize> {
        check_dims(self.dims, records)?;
        let mut stored = self
            .records
            .write()
            .map_err(|_| anyhow!("in-memory store lock poisoned"))?;
        stored.extend_from_slice(records);
        Ok(records.len())
    }

    async fn query(&self, vector: &[f32], params: &SearchParams) -> Result<Vec<ScoredRecord>> {
        let stored = self
            .records
            .read()
            .map_err(|_| anyhow!("in-memory store lock poisoned"))?;
        let candidates = stored.iter().map(|r| ScoredRecord {
            text: r.text.clone(),
            metadata: r.metadata.clone(),
            source: r.source.clone(),
            page: r.page,
            score: similarity_score(vector, &r.embedding),
        });
        Ok(rank_candidates(candidates, params))
    }

    async fn count(&self) -> Result<u64> {
        let stored = self
            .records
            .read()
            .map_err(|_| anyhow!("in-memory store lock poisoned"))?;
        Ok(stored.len() as u64)
    }

    async fn clear(&self) -> Result<u64> {
        let mut stored = self
            .records
            .write()
            .map_err(|_| anyhow!("in-memory store lock poisoned"))?;
        let removed = stored.len() as u64;
        stored.clear();
        Ok(removed)
    }
}
