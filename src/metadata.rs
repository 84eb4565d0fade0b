//! Heuristic page metadata: title, keywords, and code detection.
//!
//! All three are cheap regex/string heuristics over the raw page text. The
//! extractor holds its compiled patterns so a single instance can be reused
//! across every page of an ingestion run.

use regex::{Regex, RegexSet};

use crate::models::{Document, Metadata, Page};

/// Maximum title length, in characters.
const TITLE_MAX_CHARS: usize = 50;

/// Maximum number of keywords kept per page.
const MAX_KEYWORDS: usize = 10;

/// Words never reported as keywords.
pub const STOP_WORDS: &[&str] = &[
    "the",
    "this",
    "that",
    "with",
    "from",
    "have",
    "been",
    "will",
    "mongodb",
    "document",
    "collection",
];

/// Patterns that mark a page as containing code.
const CODE_PATTERNS: &[&str] = &[
    r"```",
    r"\{.*\}",
    r"\(.*\)",
    r"def\s+\w+",
    r"import\s+\w+",
    r"\.\w+\(",
];

pub struct MetadataExtractor {
    word_re: Regex,
    code_set: RegexSet,
}

impl MetadataExtractor {
    pub fn new() -> Self {
        // Both pattern sources are fixed literals; failure here is a programming error.
        let word_re = Regex::new(r"\b[a-zA-Z]{4,}\b").expect("keyword pattern compiles");
        let code_set = RegexSet::new(CODE_PATTERNS).expect("code patterns compile");
        Self { word_re, code_set }
    }

    pub fn extract(&self, text: &str) -> Metadata {
        Metadata {
            title: extract_title(text),
            keywords: self.extract_keywords(text),
            has_code: self.has_code(text),
        }
    }

    /// Attach metadata to a page, producing an immutable [`Document`].
    pub fn enrich(&self, page: Page) -> Document {
        let metadata = self.extract(&page.text);
        Document {
            page: page.number,
            text: page.text,
            metadata,
        }
    }

    /// First ten non-stop-word tokens of four or more letters, in scan order,
    /// then deduplicated. Not frequency ranked.
    pub fn extract_keywords(&self, text: &str) -> Vec<String> {
        let lowered = text.to_lowercase();
        let first: Vec<&str> = self
            .word_re
            .find_iter(&lowered)
            .map(|m| m.as_str())
            .filter(|w| !STOP_WORDS.contains(w))
            .take(MAX_KEYWORDS)
            .collect();

        let mut keywords: Vec<String> = Vec::with_capacity(first.len());
        for word in first {
            if !keywords.iter().any(|k| k == word) {
                keywords.push(word.to_string());
            }
        }
        keywords
    }

    pub fn has_code(&self, text: &str) -> bool {
        self.code_set.is_match(text)
    }
}

impl Default for MetadataExtractor {
    fn default() -> Self {
        Self::new()
    }
}

/// Text before the first `.`, cut to 50 characters, trimmed.
pub fn extract_title(text: &str) -> String {
    let first_sentence = text.split('.').next().unwrap_or(text);
    if first_sentence.chars().count() > TITLE_MAX_CHARS {
        first_sentence
            .chars()
            .take(TITLE_MAX_CHARS)
            .collect::<String>()
            .trim()
            .to_string()
    } else {
        first_sentence.trim().to_string()
    }
}
