//! Query-side commands: `ask`, `retrieve`, and `stats`.
//!
//! The store pool and providers are created once per process and reused for
//! every question in an interactive session.

use std::io::Write;
use std::sync::Arc;

use anyhow::Result;

use crate::answer::Answerer;
use crate::config::Config;
use crate::embedding::{self, EmbeddingProvider};
use crate::llm;
use crate::models::ScoredRecord;
use crate::repl;
use crate::retriever::Retriever;
use crate::store::{SqliteStore, VectorStore};

/// Characters of chunk text shown per result by `rag retrieve`.
const PREVIEW_CHARS: usize = 300;

async fn build_retriever(config: &Config) -> Result<(Retriever, Arc<SqliteStore>)> {
    let embedder: Arc<dyn EmbeddingProvider> =
        Arc::from(embedding::create_provider(&config.embedding)?);
    let store = Arc::new(SqliteStore::open(config).await?);
    let retriever = Retriever::from_config(embedder, store.clone(), &config.retrieval)?;
    Ok((retriever, store))
}

/// `rag ask`: one-shot when a question is given, otherwise the interactive loop.
pub async fn run_ask(config: &Config, question: Option<String>) -> Result<()> {
    let (retriever, store) = build_retriever(config).await?;
    let chat: Arc<dyn llm::ChatProvider> = Arc::from(llm::create_chat_provider(&config.llm)?);
    let answerer = Answerer::new(retriever, chat);

    match question {
        Some(q) => {
            let answer = answerer.answer(&q).await?;
            let mut out = std::io::stdout();
            repl::write_answer(&mut out, &answer)?;
        }
        None => {
            let stdin = std::io::stdin();
            let mut out = std::io::stdout();
            let interactive = atty::is(atty::Stream::Stdin);
            repl::run_loop(&answerer, stdin.lock(), &mut out, interactive).await?;
        }
    }

    store.close().await;
    Ok(())
}

/// `rag retrieve`: show what the retriever returns for a question, without
/// calling the generative model.
pub async fn run_retrieve(config: &Config, question: &str) -> Result<()> {
    let (retriever, store) = build_retriever(config).await?;
    println!("Question: {}\n", question);
    println!("Retrieving relevant documents...");
    let results = retriever.retrieve(question).await?;

    let mut out = std::io::stdout();
    write_results(&mut out, &results)?;

    store.close().await;
    Ok(())
}

pub fn write_results<W: Write>(out: &mut W, results: &[ScoredRecord]) -> Result<()> {
    writeln!(out, "\nFound {} relevant documents:\n", results.len())?;
    writeln!(out, "{}", "=".repeat(60))?;
    for (i, r) in results.iter().enumerate() {
        let preview: String = r.text.chars().take(PREVIEW_CHARS).collect();
        writeln!(out, "\nDocument {}:", i + 1)?;
        writeln!(out, "Score: {:.4}  (page {} of {})", r.score, r.page, r.source)?;
        writeln!(out, "Content: {}...", preview)?;
        writeln!(out, "Metadata: {}", serde_json::to_string(&r.metadata)?)?;
    }
    Ok(())
}

/// `rag stats`: record count of the configured collection.
pub async fn run_stats(config: &Config) -> Result<()> {
    let store = SqliteStore::open(config).await?;
    let count = store.count().await?;
    println!("collection: {}", store.collection());
    println!("  index: {}", config.store.index_name);
    println!("  dims: {}", store.dims());
    println!("  records: {}", count);
    store.close().await;
    Ok(())
}
