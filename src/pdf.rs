//! PDF loading: path resolution, per-page text extraction, short-page filter.

use std::path::{Path, PathBuf};

use crate::config::PdfConfig;
use crate::error::RagError;
use crate::models::Page;

/// Pick the PDF to ingest.
///
/// An explicit path always wins. Otherwise the configured path is used when
/// it exists, then the fallback path (with `~` expanded). When neither
/// exists the configured path is returned so the caller reports it.
pub fn resolve_pdf_path(config: &PdfConfig, explicit: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }
    if config.path.exists() {
        return config.path.clone();
    }
    if let Some(fallback) = &config.fallback_path {
        let expanded = expand_tilde(fallback);
        if expanded.exists() {
            return expanded;
        }
    }
    config.path.clone()
}

fn expand_tilde(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => match std::env::var_os("HOME") {
            Some(home) => PathBuf::from(home).join(rest),
            None => path.to_path_buf(),
        },
        Err(_) => path.to_path_buf(),
    }
}

/// Extract one [`Page`] per PDF page, numbered from 1.
pub fn load_pages(path: &Path) -> Result<Vec<Page>, RagError> {
    let bytes = std::fs::read(path)
        .map_err(|e| RagError::Pdf(format!("cannot read {}: {}", path.display(), e)))?;
    pages_from_bytes(&bytes)
}

pub fn pages_from_bytes(bytes: &[u8]) -> Result<Vec<Page>, RagError> {
    let texts = pdf_extract::extract_text_from_mem_by_pages(bytes)
        .map_err(|e| RagError::Pdf(e.to_string()))?;
    Ok(texts
        .into_iter()
        .enumerate()
        .map(|(i, text)| Page { number: i + 1, text })
        .collect())
}

/// Keep pages with more than `min_words` space-separated words.
pub fn filter_short_pages(pages: Vec<Page>, min_words: usize) -> Vec<Page> {
    pages
        .into_iter()
        .filter(|p| p.text.split(' ').count() > min_words)
        .collect()
}
