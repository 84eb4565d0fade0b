//! # pdf-rag CLI (`rag`)
//!
//! Commands for creating the store, indexing a PDF, and asking questions.
//!
//! ## Usage
//!
//! ```bash
//! rag --config ./config/rag.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `rag init` | Create the SQLite database and schema |
//! | `rag ingest` | Load, chunk, embed, and store the PDF |
//! | `rag ask [QUESTION]` | Answer one question, or start the interactive loop |
//! | `rag retrieve QUESTION` | Show the retrieved chunks for a question |
//! | `rag stats` | Show the collection's record count |
//!
//! Set `RUST_LOG=debug` for pipeline logging on stderr.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use pdf_rag::store::SqliteStore;
use pdf_rag::{config, ingest, query};

/// Question answering over a PDF with retrieval-augmented generation.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/rag.example.toml` for a full example. API keys are read
/// from `VOYAGE_API_KEY` and `GEMINI_API_KEY`.
#[derive(Parser)]
#[command(
    name = "rag",
    about = "Retrieval-augmented question answering over a PDF",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/rag.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite file, the records table, and the vector index
    /// entry for the configured collection. Safe to run repeatedly.
    Init,

    /// Index a PDF.
    ///
    /// Extracts pages, drops pages with 20 words or fewer, attaches metadata,
    /// chunks, embeds, and stores every chunk. Any failure aborts the run.
    Ingest {
        /// PDF to load. Defaults to `[pdf].path`, then `[pdf].fallback_path`.
        #[arg(long)]
        pdf: Option<PathBuf>,

        /// Delete the collection's existing records first.
        #[arg(long)]
        replace: bool,

        /// Report page and chunk counts without embedding or storing.
        #[arg(long)]
        dry_run: bool,
    },

    /// Ask a question, or start the interactive loop when none is given.
    Ask {
        /// The question. Omit for interactive mode.
        question: Option<String>,
    },

    /// Show the chunks retrieved for a question, without generating an answer.
    Retrieve {
        /// The question to retrieve context for.
        question: String,
    },

    /// Show the number of stored records.
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            let store = SqliteStore::open(&cfg).await?;
            println!("Database initialized successfully.");
            println!(
                "  collection: {} (index {}, {} dims)",
                store.collection(),
                cfg.store.index_name,
                cfg.embedding.dims
            );
            store.close().await;
        }
        Commands::Ingest {
            pdf,
            replace,
            dry_run,
        } => {
            ingest::run_ingest(&cfg, pdf, replace, dry_run).await?;
        }
        Commands::Ask { question } => {
            query::run_ask(&cfg, question).await?;
        }
        Commands::Retrieve { question } => {
            query::run_retrieve(&cfg, &question).await?;
        }
        Commands::Stats => {
            query::run_stats(&cfg).await?;
        }
    }

    Ok(())
}
