//! Vector store abstraction.
//!
//! The [`VectorStore`] trait is everything ingestion and retrieval need
//! from persistence: bulk insert, nearest-neighbour query with a score
//! threshold, count, and clear. Two backends ship:
//!
//! - [`SqliteStore`]: persistent, sqlx/SQLite, brute-force cosine scan
//!   over the collection's rows.
//! - [`InMemoryStore`]: for tests and dry runs.
//!
//! Both rank with [`rank_candidates`], so ordering, threshold, and `k`
//! behave identically.

pub mod memory;
pub mod sqlite;

pub use memory::InMemoryStore;
pub use sqlite::SqliteStore;

use std::cmp::Ordering;

use anyhow::{bail, Result};
use async_trait::async_trait;

use crate::error::RagError;
use crate::models::{Metadata, ScoredRecord, StoredRecord};

/// Metadata pre-filter applied before scoring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetadataFilter {
    /// Records with at least one keyword.
    HasKeywords,
    /// Records whose page was flagged as containing code.
    HasCode,
    /// Records carrying this keyword.
    Keyword(String),
}

impl MetadataFilter {
    /// Parse `has_keywords`, `has_code`, or `keyword:<word>`.
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "has_keywords" => Ok(MetadataFilter::HasKeywords),
            "has_code" => Ok(MetadataFilter::HasCode),
            other => match other.strip_prefix("keyword:") {
                Some(word) if !word.trim().is_empty() => {
                    Ok(MetadataFilter::Keyword(word.trim().to_lowercase()))
                }
                _ => bail!(
                    "Unknown pre_filter: '{}'. Use has_keywords, has_code, or keyword:<word>.",
                    other
                ),
            },
        }
    }

    pub fn matches(&self, metadata: &Metadata) -> bool {
        match self {
            MetadataFilter::HasKeywords => !metadata.keywords.is_empty(),
            MetadataFilter::HasCode => metadata.has_code,
            MetadataFilter::Keyword(word) => metadata.keywords.iter().any(|k| k == word),
        }
    }
}

/// Parameters of one similarity query.
#[derive(Debug, Clone)]
pub struct SearchParams {
    pub k: usize,
    pub score_threshold: f64,
    pub filter: Option<MetadataFilter>,
}

#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Dimensionality every stored vector must have.
    fn dims(&self) -> usize;

    /// Persist records. Rejects the whole batch if any vector has the wrong
    /// dimensionality. Returns the number of records written.
    async fn insert(&self, records: &[StoredRecord]) -> Result<usize>;

    /// Up to `params.k` records scoring at least `params.score_threshold`, best first.
    async fn query(&self, vector: &[f32], params: &SearchParams) -> Result<Vec<ScoredRecord>>;

    async fn count(&self) -> Result<u64>;

    /// Delete every record. Returns the number removed.
    async fn clear(&self) -> Result<u64>;
}

/// Fail with [`RagError::DimensionMismatch`] on the first record whose
/// embedding length is not `dims`.
pub fn check_dims(dims: usize, records: &[StoredRecord]) -> Result<(), RagError> {
    match records.iter().find(|r| r.embedding.len() != dims) {
        Some(bad) => Err(RagError::DimensionMismatch {
            expected: dims,
            actual: bad.embedding.len(),
        }),
        None => Ok(()),
    }
}

/// Apply the threshold, order best first, keep the top `k`.
pub fn rank_candidates(
    candidates: impl IntoIterator<Item = ScoredRecord>,
    params: &SearchParams,
) -> Vec<ScoredRecord> {
    let mut ranked: Vec<ScoredRecord> = candidates
        .into_iter()
        .filter(|c| c.score >= params.score_threshold)
        .filter(|c| params.filter.as_ref().map_or(true, |f| f.matches(&c.metadata)))
        .collect();
    ranked.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    ranked.truncate(params.k);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scored(text: &str, score: f64, keywords: &[&str], has_code: bool) -> ScoredRecord {
        ScoredRecord {
            text: text.to_string(),
            metadata: Metadata {
                title: String::new(),
                keywords: keywords.iter().map(|k| k.to_string()).collect(),
                has_code,
            },
            source: "test.pdf".to_string(),
            page: 1,
            score,
        }
    }

    fn params(k: usize, threshold: f64) -> SearchParams {
        SearchParams {
            k,
            score_threshold: threshold,
            filter: None,
        }
    }

    #[test]
    fn test_rank_orders_and_truncates() {
        let ranked = rank_candidates(
            vec![
                scored("a", 0.2, &[], false),
                scored("b", 0.9, &[], false),
                scored("c", 0.5, &[], false),
                scored("d", 0.7, &[], false),
            ],
            &params(3, 0.01),
        );
        let texts: Vec<&str> = ranked.iter().map(|r| r.text.as_str()).collect();
        assert_eq!(texts, vec!["b", "d", "c"]);
    }

    #[test]
    fn test_rank_applies_threshold() {
        let ranked = rank_candidates(
            vec![scored("a", 0.005, &[], false), scored("b", 0.01, &[], false)],
            &params(3, 0.01),
        );
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].text, "b");
    }

    #[test]
    fn test_rank_with_filter() {
        let mut p = params(3, 0.0);
        p.filter = Some(MetadataFilter::Keyword("shard".to_string()));
        let ranked = rank_candidates(
            vec![
                scored("a", 0.9, &["index"], false),
                scored("b", 0.5, &["shard"], false),
            ],
            &p,
        );
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].text, "b");
    }

    #[test]
    fn test_filter_parse() {
        assert_eq!(
            MetadataFilter::parse("has_keywords").unwrap(),
            MetadataFilter::HasKeywords
        );
        assert_eq!(MetadataFilter::parse("has_code").unwrap(), MetadataFilter::HasCode);
        assert_eq!(
            MetadataFilter::parse("keyword:Shard").unwrap(),
            MetadataFilter::Keyword("shard".to_string())
        );
        assert!(MetadataFilter::parse("keyword:").is_err());
        assert!(MetadataFilter::parse("anything").is_err());
    }

    #[test]
    fn test_filter_matches() {
        let meta = Metadata {
            title: "t".to_string(),
            keywords: vec![],
            has_code: true,
        };
        assert!(!MetadataFilter::HasKeywords.matches(&meta));
        assert!(MetadataFilter::HasCode.matches(&meta));
    }
}
