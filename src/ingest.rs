//! Ingestion pipeline orchestration.
//!
//! Coordinates the one-shot indexing job: PDF → pages → short-page filter →
//! metadata → chunking → embedding → storage. Any failure aborts the run;
//! there is no partial recovery.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use uuid::Uuid;

use crate::chunk::Chunker;
use crate::config::Config;
use crate::embedding::{self, EmbeddingProvider, InputType};
use crate::metadata::MetadataExtractor;
use crate::models::{Chunk, Document, Page, StoredRecord};
use crate::pdf;
use crate::store::{SqliteStore, VectorStore};

/// Counts reported at the end of an ingestion run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub pages_loaded: usize,
    pub pages_kept: usize,
    pub chunks: usize,
    /// Chunks whose text hash matches an earlier chunk of the same run.
    pub duplicate_chunks: usize,
    pub records_written: usize,
}

/// Number of chunks repeating an earlier chunk's content hash.
pub fn count_duplicate_chunks(chunks: &[Chunk]) -> usize {
    let mut seen = HashSet::with_capacity(chunks.len());
    chunks.iter().filter(|c| !seen.insert(c.hash.as_str())).count()
}

/// Filter, enrich, and chunk pages. No I/O.
pub fn prepare(pages: Vec<Page>, config: &Config) -> Result<(Vec<Document>, Vec<Chunk>)> {
    let kept = pdf::filter_short_pages(pages, config.pdf.min_words);
    let extractor = MetadataExtractor::new();
    let docs: Vec<Document> = kept.into_iter().map(|p| extractor.enrich(p)).collect();
    let chunker = Chunker::from_config(&config.chunking)?;
    let chunks = chunker.chunk_documents(&docs);
    Ok((docs, chunks))
}

/// Run the pipeline over already-extracted pages.
pub async fn ingest_pages(
    pages: Vec<Page>,
    source: &str,
    config: &Config,
    embedder: &dyn EmbeddingProvider,
    store: &dyn VectorStore,
) -> Result<IngestReport> {
    let pages_loaded = pages.len();
    let (docs, chunks) = prepare(pages, config)?;
    log::info!(
        "metadata extracted for {} of {} pages; {} chunks",
        docs.len(),
        pages_loaded,
        chunks.len()
    );
    let duplicate_chunks = count_duplicate_chunks(&chunks);
    if duplicate_chunks > 0 {
        log::warn!(
            "{} of {} chunks repeat earlier chunk text",
            duplicate_chunks,
            chunks.len()
        );
    }

    if embedder.dims() != store.dims() {
        bail!(
            "embedding model {} produces {} dimensions but the store expects {}",
            embedder.model_name(),
            embedder.dims(),
            store.dims()
        );
    }

    let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
    let vectors = embedder
        .embed(&texts, InputType::Document)
        .await
        .context("embedding chunks failed")?;
    embedding::validate_embeddings(embedder.model_name(), texts.len(), embedder.dims(), &vectors)?;

    let records: Vec<StoredRecord> = chunks
        .into_iter()
        .zip(vectors)
        .map(|(chunk, vector)| StoredRecord {
            id: Uuid::new_v4().to_string(),
            source: source.to_string(),
            page: chunk.page,
            chunk_index: chunk.index,
            text: chunk.text,
            embedding: vector,
            metadata: chunk.metadata,
        })
        .collect();

    let written = store
        .insert(&records)
        .await
        .context("storing records failed")?;

    Ok(IngestReport {
        pages_loaded,
        pages_kept: docs.len(),
        chunks: records.len(),
        duplicate_chunks,
        records_written: written,
    })
}

fn source_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// `rag ingest`: load the PDF, embed its chunks, and store them.
pub async fn run_ingest(
    config: &Config,
    pdf_path: Option<PathBuf>,
    replace: bool,
    dry_run: bool,
) -> Result<()> {
    let path = pdf::resolve_pdf_path(&config.pdf, pdf_path.as_deref());
    println!("Loading PDF from: {}", path.display());
    let pages = pdf::load_pages(&path)?;
    println!("Loaded {} pages from PDF", pages.len());

    if dry_run {
        let pages_loaded = pages.len();
        let (docs, chunks) = prepare(pages, config)?;
        let with_code = docs.iter().filter(|d| d.metadata.has_code).count();
        println!("ingest {} (dry-run)", source_label(&path));
        println!("  pages loaded: {}", pages_loaded);
        println!("  pages kept: {}", docs.len());
        println!("  pages with code: {}", with_code);
        println!("  chunks: {}", chunks.len());
        println!("  duplicate chunks: {}", count_duplicate_chunks(&chunks));
        return Ok(());
    }

    let embedder = embedding::create_provider(&config.embedding)?;
    let store = SqliteStore::open(config).await?;

    if replace {
        let removed = store.clear().await?;
        println!("Cleared {} records from {}", removed, store.collection());
    }

    println!(
        "Creating embeddings with {} and storing in {}...",
        embedder.model_name(),
        store.collection()
    );
    let report = ingest_pages(
        pages,
        &source_label(&path),
        config,
        embedder.as_ref(),
        &store,
    )
    .await?;

    println!("ingest {}", source_label(&path));
    println!("  pages loaded: {}", report.pages_loaded);
    println!("  pages kept: {}", report.pages_kept);
    println!("  chunks: {}", report.chunks);
    println!("  duplicate chunks: {}", report.duplicate_chunks);
    println!("  records written: {}", report.records_written);
    println!("ok");

    store.close().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RagError;
    use crate::store::InMemoryStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingEmbedder {
        dims: usize,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl EmbeddingProvider for CountingEmbedder {
        fn model_name(&self) -> &str {
            "counting"
        }
        fn dims(&self) -> usize {
            self.dims
        }
        async fn embed(
            &self,
            texts: &[String],
            input_type: InputType,
        ) -> Result<Vec<Vec<f32>>, RagError> {
            assert_eq!(input_type, InputType::Document);
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(texts
                .iter()
                .map(|t| vec![t.len() as f32; self.dims])
                .collect())
        }
    }

    struct FailingEmbedder;

    #[async_trait]
    impl EmbeddingProvider for FailingEmbedder {
        fn model_name(&self) -> &str {
            "failing"
        }
        fn dims(&self) -> usize {
            4
        }
        async fn embed(&self, _: &[String], _: InputType) -> Result<Vec<Vec<f32>>, RagError> {
            Err(RagError::provider("failing", "HTTP 401: unauthorized"))
        }
    }

    fn config() -> Config {
        let mut cfg = Config::with_db_path(PathBuf::from("unused.sqlite"));
        cfg.embedding.dims = 4;
        cfg
    }

    fn long_page(number: usize) -> Page {
        Page {
            number,
            text: (0..200)
                .map(|i| format!("shard{}", i % 9))
                .collect::<Vec<_>>()
                .join(" "),
        }
    }

    fn short_page(number: usize) -> Page {
        Page {
            number,
            text: "Table of contents".to_string(),
        }
    }

    #[tokio::test]
    async fn test_ingest_filters_chunks_and_stores() {
        let cfg = config();
        let store = InMemoryStore::new(4);
        let embedder = CountingEmbedder {
            dims: 4,
            calls: AtomicUsize::new(0),
        };
        let report = ingest_pages(
            vec![short_page(1), long_page(2), long_page(3)],
            "mongodb.pdf",
            &cfg,
            &embedder,
            &store,
        )
        .await
        .unwrap();

        assert_eq!(report.pages_loaded, 3);
        assert_eq!(report.pages_kept, 2);
        assert!(report.chunks >= 4);
        assert_eq!(report.records_written, report.chunks);
        assert_eq!(store.count().await.unwrap() as usize, report.chunks);
    }

    #[tokio::test]
    async fn test_ingest_aborts_on_provider_error() {
        let cfg = config();
        let store = InMemoryStore::new(4);
        let err = ingest_pages(vec![long_page(1)], "x.pdf", &cfg, &FailingEmbedder, &store)
            .await
            .unwrap_err();
        assert!(format!("{:#}", err).contains("unauthorized"));
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_ingest_rejects_dimension_mismatch_up_front() {
        let cfg = config();
        let store = InMemoryStore::new(8);
        let embedder = CountingEmbedder {
            dims: 4,
            calls: AtomicUsize::new(0),
        };
        assert!(ingest_pages(vec![long_page(1)], "x.pdf", &cfg, &embedder, &store)
            .await
            .is_err());
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_prepare_metadata_flows_to_chunks() {
        let cfg = config();
        let mut page = long_page(5);
        page.text = format!("Sharding overview. {}", page.text);
        let (docs, chunks) = prepare(vec![page], &cfg).unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].metadata.title, "Sharding overview");
        for c in &chunks {
            assert_eq!(c.page, 5);
            assert_eq!(c.metadata, docs[0].metadata);
        }
    }

    #[tokio::test]
    async fn test_repeated_pages_reported_as_duplicate_chunks() {
        let cfg = config();
        let store = InMemoryStore::new(4);
        let embedder = CountingEmbedder {
            dims: 4,
            calls: AtomicUsize::new(0),
        };
        let report = ingest_pages(
            vec![long_page(1), long_page(2), short_page(3)],
            "mongodb.pdf",
            &cfg,
            &embedder,
            &store,
        )
        .await
        .unwrap();

        assert_eq!(report.chunks % 2, 0);
        assert_eq!(report.duplicate_chunks, report.chunks / 2);
        // Duplicates are still stored.
        assert_eq!(report.records_written, report.chunks);
    }

    #[test]
    fn test_distinct_pages_have_no_duplicate_chunks() {
        let cfg = config();
        let mut other = long_page(2);
        other.text = other.text.replace("shard", "node");
        let (_, chunks) = prepare(vec![long_page(1), other], &cfg).unwrap();
        assert_eq!(count_duplicate_chunks(&chunks), 0);
    }

    #[test]
    fn test_source_label_is_file_name() {
        assert_eq!(source_label(Path::new("resources/mongodb.pdf")), "mongodb.pdf");
    }
}
