//! SQLite-backed [`VectorStore`] implementation.
//!
//! Records of every collection share one `records` table; each collection
//! owns one row in `vector_indexes` that pins its name and dimensionality.
//! Opening a collection whose index was created with a different
//! dimensionality fails instead of mixing vector sizes.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use super::{check_dims, rank_candidates, SearchParams, VectorStore};
use crate::config::Config;
use crate::db;
use crate::embedding::{blob_to_vec, similarity_score, vec_to_blob};
use crate::migrate;
use crate::models::{Metadata, ScoredRecord, StoredRecord};

pub struct SqliteStore {
    pool: SqlitePool,
    collection: String,
    dims: usize,
}

impl SqliteStore {
    /// Connect, migrate, and bind to the configured collection.
    pub async fn open(config: &Config) -> Result<Self> {
        let pool = db::connect(config).await?;
        migrate::run_migrations(&pool).await?;
        Self::with_pool(
            pool,
            &config.store.collection,
            &config.store.index_name,
            config.embedding.dims,
        )
        .await
    }

    pub async fn with_pool(
        pool: SqlitePool,
        collection: &str,
        index_name: &str,
        dims: usize,
    ) -> Result<Self> {
        ensure_index(&pool, collection, index_name, dims).await?;
        Ok(Self {
            pool,
            collection: collection.to_string(),
            dims,
        })
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

async fn ensure_index(pool: &SqlitePool, collection: &str, name: &str, dims: usize) -> Result<()> {
    let existing: Option<(String, i64)> =
        sqlx::query_as("SELECT name, dims FROM vector_indexes WHERE collection = ?")
            .bind(collection)
            .fetch_optional(pool)
            .await?;

    match existing {
        Some((existing_name, existing_dims)) => {
            if existing_dims as usize != dims {
                bail!(
                    "Collection '{}' has vector index '{}' with {} dimensions, but embedding.dims is {}",
                    collection,
                    existing_name,
                    existing_dims,
                    dims
                );
            }
        }
        None => {
            sqlx::query(
                "INSERT INTO vector_indexes (collection, name, dims, similarity) VALUES (?, ?, ?, 'cosine')",
            )
            .bind(collection)
            .bind(name)
            .bind(dims as i64)
            .execute(pool)
            .await?;
            log::info!(
                "created vector index '{}' on collection '{}' ({} dims)",
                name,
                collection,
                dims
            );
        }
    }
    Ok(())
}

#[async_trait]
impl VectorStore for SqliteStore {
    fn dims(&self) -> usize {
        self.dims
    }

    async fn insert(&self, records: &[StoredRecord]) -> Result<usize> {
        check_dims(self.dims, records)?;

        let now = chrono::Utc::now().timestamp();
        let mut tx = self.pool.begin().await?;

        for record in records {
            let metadata_json = serde_json::to_string(&record.metadata)?;
            sqlx::query(
                r#"
                INSERT INTO records (id, collection, source, page, chunk_index, text,
                                     embedding, dims, metadata_json, created_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&record.id)
            .bind(&self.collection)
            .bind(&record.source)
            .bind(record.page as i64)
            .bind(record.chunk_index as i64)
            .bind(&record.text)
            .bind(vec_to_blob(&record.embedding))
            .bind(record.embedding.len() as i64)
            .bind(metadata_json)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(records.len())
    }

    async fn query(&self, vector: &[f32], params: &SearchParams) -> Result<Vec<ScoredRecord>> {
        let rows = sqlx::query(
            "SELECT text, embedding, metadata_json, source, page FROM records WHERE collection = ?",
        )
        .bind(&self.collection)
        .fetch_all(&self.pool)
        .await?;

        let mut candidates = Vec::with_capacity(rows.len());
        for row in rows {
            let blob: Vec<u8> = row.get("embedding");
            let metadata_json: String = row.get("metadata_json");
            let page: i64 = row.get("page");
            let metadata: Metadata = serde_json::from_str(&metadata_json).with_context(|| {
                format!(
                    "corrupt metadata in collection '{}' (page {})",
                    self.collection, page
                )
            })?;
            candidates.push(ScoredRecord {
                text: row.get("text"),
                metadata,
                source: row.get("source"),
                page: page as usize,
                score: similarity_score(vector, &blob_to_vec(&blob)),
            });
        }

        Ok(rank_candidates(candidates, params))
    }

    async fn count(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM records WHERE collection = ?")
            .bind(&self.collection)
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }

    async fn clear(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM records WHERE collection = ?")
            .bind(&self.collection)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn open_store(tmp: &TempDir, collection: &str, dims: usize) -> Result<SqliteStore> {
        let mut config = Config::with_db_path(tmp.path().join("data").join("rag.sqlite"));
        config.store.collection = collection.to_string();
        config.embedding.dims = dims;
        SqliteStore::open(&config).await
    }

    fn record(id: &str, text: &str, embedding: Vec<f32>, keywords: &[&str]) -> StoredRecord {
        StoredRecord {
            id: id.to_string(),
            source: "mongodb.pdf".to_string(),
            page: 2,
            chunk_index: 0,
            text: text.to_string(),
            embedding,
            metadata: Metadata {
                title: "Sharding".to_string(),
                keywords: keywords.iter().map(|k| k.to_string()).collect(),
                has_code: false,
            },
        }
    }

    fn params(k: usize) -> SearchParams {
        SearchParams {
            k,
            score_threshold: 0.01,
            filter: None,
        }
    }

    #[tokio::test]
    async fn test_roundtrip_metadata_and_ranking() {
        let tmp = TempDir::new().unwrap();
        let store = open_store(&tmp, "chunked_data", 3).await.unwrap();
        store
            .insert(&[
                record("1", "alpha", vec![1.0, 0.0, 0.0], &["shard"]),
                record("2", "beta", vec![0.0, 1.0, 0.0], &[]),
                record("3", "gamma", vec![0.7, 0.7, 0.0], &["node"]),
            ])
            .await
            .unwrap();

        assert_eq!(store.count().await.unwrap(), 3);
        let results = store.query(&[1.0, 0.0, 0.0], &params(2)).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].text, "alpha");
        assert_eq!(results[0].metadata.keywords, vec!["shard"]);
        assert_eq!(results[0].metadata.title, "Sharding");
        assert_eq!(results[0].page, 2);
        assert_eq!(results[1].text, "gamma");
        assert!(results[0].score >= results[1].score);
    }

    #[tokio::test]
    async fn test_collections_are_isolated() {
        let tmp = TempDir::new().unwrap();
        let a = open_store(&tmp, "a", 2).await.unwrap();
        a.insert(&[record("1", "in a", vec![1.0, 0.0], &[])])
            .await
            .unwrap();
        a.close().await;

        let b = open_store(&tmp, "b", 2).await.unwrap();
        assert_eq!(b.count().await.unwrap(), 0);
        assert!(b.query(&[1.0, 0.0], &params(3)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_reopen_with_other_dims_fails() {
        let tmp = TempDir::new().unwrap();
        let store = open_store(&tmp, "chunked_data", 4).await.unwrap();
        store.close().await;
        let err = open_store(&tmp, "chunked_data", 8).await.err().unwrap();
        assert!(err.to_string().contains("4 dimensions"));
    }

    #[tokio::test]
    async fn test_clear_collection() {
        let tmp = TempDir::new().unwrap();
        let store = open_store(&tmp, "chunked_data", 2).await.unwrap();
        store
            .insert(&[
                record("1", "x", vec![1.0, 0.0], &[]),
                record("2", "y", vec![0.0, 1.0], &[]),
            ])
            .await
            .unwrap();
        assert_eq!(store.clear().await.unwrap(), 2);
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_corrupt_metadata_row_is_error() {
        let tmp = TempDir::new().unwrap();
        let store = open_store(&tmp, "chunked_data", 2).await.unwrap();
        store
            .insert(&[record("1", "x", vec![1.0, 0.0], &[])])
            .await
            .unwrap();
        sqlx::query("UPDATE records SET metadata_json = 'not json' WHERE id = '1'")
            .execute(&store.pool)
            .await
            .unwrap();

        let err = store.query(&[1.0, 0.0], &params(3)).await.unwrap_err();
        assert!(err.to_string().contains("corrupt metadata"));
    }

    #[tokio::test]
    async fn test_wrong_dims_insert_rejected() {
        let tmp = TempDir::new().unwrap();
        let store = open_store(&tmp, "chunked_data", 2).await.unwrap();
        assert!(store
            .insert(&[record("1", "x", vec![1.0, 0.0, 0.0], &[])])
            .await
            .is_err());
        assert_eq!(store.count().await.unwrap(), 0);
    }
}
