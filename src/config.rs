use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub pdf: PdfConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub llm: LlmConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

fn default_connect_timeout_ms() -> u64 {
    5000
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    #[serde(default = "default_collection")]
    pub collection: String,
    #[serde(default = "default_index_name")]
    pub index_name: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            collection: default_collection(),
            index_name: default_index_name(),
        }
    }
}

fn default_collection() -> String {
    "chunked_data".to_string()
}
fn default_index_name() -> String {
    "vector_index".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct PdfConfig {
    #[serde(default = "default_pdf_path")]
    pub path: PathBuf,
    #[serde(default = "default_fallback_path")]
    pub fallback_path: Option<PathBuf>,
    /// Pages with this many space-separated words or fewer are dropped.
    #[serde(default = "default_min_words")]
    pub min_words: usize,
}

impl Default for PdfConfig {
    fn default() -> Self {
        Self {
            path: default_pdf_path(),
            fallback_path: default_fallback_path(),
            min_words: default_min_words(),
        }
    }
}

fn default_pdf_path() -> PathBuf {
    PathBuf::from("resources").join("mongodb.pdf")
}
fn default_fallback_path() -> Option<PathBuf> {
    Some(PathBuf::from("~/Downloads/mongodb.pdf"))
}
fn default_min_words() -> usize {
    20
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_strategy")]
    pub strategy: String,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            strategy: default_strategy(),
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
        }
    }
}

fn default_strategy() -> String {
    "window".to_string()
}
fn default_chunk_size() -> usize {
    500
}
fn default_chunk_overlap() -> usize {
    150
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_search_type")]
    pub search_type: String,
    #[serde(default = "default_k")]
    pub k: usize,
    #[serde(default = "default_score_threshold")]
    pub score_threshold: f64,
    /// Metadata pre-filter: `has_keywords`, `has_code`, or `keyword:<word>`.
    /// Unset by default.
    #[serde(default)]
    pub pre_filter: Option<String>,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            search_type: default_search_type(),
            k: default_k(),
            score_threshold: default_score_threshold(),
            pre_filter: None,
        }
    }
}

fn default_search_type() -> String {
    "similarity".to_string()
}
fn default_k() -> usize {
    3
}
fn default_score_threshold() -> f64 {
    0.01
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_provider")]
    pub provider: String,
    #[serde(default = "default_embedding_model")]
    pub model: String,
    #[serde(default = "default_dims")]
    pub dims: usize,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub max_retries: u32,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            model: default_embedding_model(),
            dims: default_dims(),
            batch_size: default_batch_size(),
            base_url: None,
            timeout_secs: default_timeout_secs(),
            max_retries: 0,
        }
    }
}

fn default_embedding_provider() -> String {
    "voyage".to_string()
}
fn default_embedding_model() -> String {
    "voyage-3".to_string()
}
fn default_dims() -> usize {
    1024
}
fn default_batch_size() -> usize {
    64
}
fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    #[serde(default = "default_llm_provider")]
    pub provider: String,
    #[serde(default = "default_llm_model")]
    pub model: String,
    #[serde(default)]
    pub temperature: f32,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub max_retries: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_llm_provider(),
            model: default_llm_model(),
            temperature: 0.0,
            base_url: None,
            timeout_secs: default_llm_timeout_secs(),
            max_retries: 0,
        }
    }
}

fn default_llm_provider() -> String {
    "gemini".to_string()
}
fn default_llm_model() -> String {
    "gemini-2.5-flash".to_string()
}
fn default_llm_timeout_secs() -> u64 {
    60
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse_config(&content)
}

pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if config.store.collection.trim().is_empty() {
        anyhow::bail!("store.collection must not be empty");
    }

    // Validate chunking
    if config.chunking.chunk_size == 0 {
        anyhow::bail!("chunking.chunk_size must be > 0");
    }
    if config.chunking.chunk_overlap >= config.chunking.chunk_size {
        anyhow::bail!(
            "chunking.chunk_overlap ({}) must be smaller than chunking.chunk_size ({})",
            config.chunking.chunk_overlap,
            config.chunking.chunk_size
        );
    }
    match config.chunking.strategy.as_str() {
        "window" | "recursive" => {}
        other => anyhow::bail!(
            "Unknown chunking strategy: '{}'. Must be window or recursive.",
            other
        ),
    }

    // Validate retrieval
    if config.retrieval.search_type != "similarity" {
        anyhow::bail!(
            "Unsupported retrieval.search_type: '{}'. Only similarity is supported.",
            config.retrieval.search_type
        );
    }
    if config.retrieval.k < 1 {
        anyhow::bail!("retrieval.k must be >= 1");
    }
    if !(0.0..=1.0).contains(&config.retrieval.score_threshold) {
        anyhow::bail!("retrieval.score_threshold must be in [0.0, 1.0]");
    }
    if let Some(filter) = &config.retrieval.pre_filter {
        crate::store::MetadataFilter::parse(filter)?;
    }

    // Validate embedding
    if config.embedding.dims == 0 {
        anyhow::bail!("embedding.dims must be > 0");
    }
    if config.embedding.batch_size == 0 {
        anyhow::bail!("embedding.batch_size must be > 0");
    }
    match config.embedding.provider.as_str() {
        "voyage" => {}
        other => anyhow::bail!("Unknown embedding provider: '{}'. Must be voyage.", other),
    }

    // Validate llm
    if !(0.0..=2.0).contains(&config.llm.temperature) {
        anyhow::bail!("llm.temperature must be in [0.0, 2.0]");
    }
    match config.llm.provider.as_str() {
        "gemini" => {}
        other => anyhow::bail!("Unknown llm provider: '{}'. Must be gemini.", other),
    }

    Ok(())
}

impl Config {
    /// Config with every default and the given database path.
    pub fn with_db_path(path: PathBuf) -> Self {
        Self {
            db: DbConfig {
                path,
                connect_timeout_ms: default_connect_timeout_ms(),
            },
            store: StoreConfig::default(),
            pdf: PdfConfig::default(),
            chunking: ChunkingConfig::default(),
            retrieval: RetrievalConfig::default(),
            embedding: EmbeddingConfig::default(),
            llm: LlmConfig::default(),
        }
    }
}
