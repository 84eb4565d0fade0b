//! Core data models used throughout the pipeline.
//!
//! These types represent the pages, documents, chunks, and stored records
//! that flow through ingestion and retrieval.

use serde::{Deserialize, Serialize};

/// Raw text of a single PDF page, before filtering.
#[derive(Debug, Clone)]
pub struct Page {
    /// 1-based page number.
    pub number: usize,
    pub text: String,
}

/// Heuristic metadata attached to every retained page and inherited by its chunks.
///
/// Serialized with the persisted field names `title`, `keywords`, `hasCode`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    pub title: String,
    pub keywords: Vec<String>,
    #[serde(rename = "hasCode")]
    pub has_code: bool,
}

/// A retained page with its metadata.
#[derive(Debug, Clone)]
pub struct Document {
    pub page: usize,
    pub text: String,
    pub metadata: Metadata,
}

/// A bounded substring of a [`Document`], the atomic retrieval unit.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub page: usize,
    /// Position within the parent document, contiguous from 0.
    pub index: usize,
    pub text: String,
    /// SHA-256 of `text`, hex encoded.
    pub hash: String,
    pub metadata: Metadata,
}

/// A chunk together with its embedding, as handed to a store.
#[derive(Debug, Clone)]
pub struct StoredRecord {
    pub id: String,
    pub source: String,
    pub page: usize,
    pub chunk_index: usize,
    pub text: String,
    pub embedding: Vec<f32>,
    pub metadata: Metadata,
}

/// A record returned from a similarity query.
#[derive(Debug, Clone)]
pub struct ScoredRecord {
    pub text: String,
    pub metadata: Metadata,
    pub source: String,
    pub page: usize,
    /// Similarity in `[0, 1]`, higher is better.
    pub score: f64,
}
