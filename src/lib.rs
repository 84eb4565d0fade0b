//! # pdf-rag
//!
//! Retrieval-augmented question answering over a single PDF.
//!
//! The ingestion pipeline splits the PDF into pages, drops near-empty pages,
//! attaches heuristic metadata, cuts overlapping chunks, embeds them, and
//! persists them in a vector store. At query time the question is embedded,
//! the top matching chunks are retrieved, and a generative model answers from
//! that context.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────┐   ┌──────────┐   ┌─────────┐   ┌─────────┐   ┌─────────┐
//! │  PDF  │──▶│ Metadata │──▶│ Chunker │──▶│ Embedder│──▶│  Store  │
//! │ pages │   │ extractor│   │ 500/150 │   │ (doc)   │   │ SQLite  │
//! └───────┘   └──────────┘   └─────────┘   └─────────┘   └────┬────┘
//!                                                             │
//!   question ──▶ Embedder (query) ──▶ Retriever (k=3, ≥0.01) ◀┘
//!                                          │
//!                                          ▼
//!                                  Answerer ──▶ LLM ──▶ answer
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! rag init                                  # create database
//! rag ingest --pdf resources/mongodb.pdf    # index the PDF
//! rag retrieve "how many nodes for a sharded cluster?"
//! rag ask                                   # interactive loop
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`pdf`] | PDF page extraction and filtering |
//! | [`metadata`] | Title, keyword, and code heuristics |
//! | [`chunk`] | Overlapping text chunking |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`llm`] | Generative provider abstraction |
//! | [`store`] | Vector store trait, SQLite and in-memory backends |
//! | [`retriever`] | Fixed-policy similarity retrieval |
//! | [`answer`] | Prompt assembly and answering |
//! | [`ingest`] | Ingestion pipeline |
//! | [`query`] | `ask`, `retrieve`, `stats` commands |
//! | [`repl`] | Interactive question loop |

pub mod answer;
pub mod chunk;
pub mod config;
pub mod db;
pub mod embedding;
pub mod error;
pub mod http;
pub mod ingest;
pub mod llm;
pub mod metadata;
pub mod migrate;
pub mod models;
pub mod pdf;
pub mod query;
pub mod repl;
pub mod retriever;
pub mod store;
