use anyhow::Result;
use sqlx::SqlitePool;

/// Create the record and index tables. Idempotent.
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS records (
            id TEXT PRIMARY KEY,
            collection TEXT NOT NULL,
            source TEXT NOT NULL,
            page INTEGER NOT NULL,
            chunk_index INTEGER NOT NULL,
            text TEXT NOT NULL,
            embedding BLOB NOT NULL,
            dims INTEGER NOT NULL,
            metadata_json TEXT NOT NULL DEFAULT '{}',
            created_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // One vector index definition per collection; pins the dimensionality.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS vector_indexes (
            collection TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            dims INTEGER NOT NULL,
            similarity TEXT NOT NULL DEFAULT 'cosine'
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_records_collection ON records(collection)")
        .execute(pool)
        .await?;

    Ok(())
}
