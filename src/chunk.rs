//! Overlapping character-window chunker.
//!
//! Splits document text into [`Chunk`]s of at most `chunk_size` characters.
//! Two strategies are available:
//!
//! - [`ChunkStrategy::Window`]: fixed stride windows whose end is pulled
//!   back to a paragraph, line, or word boundary when one exists in the
//!   second half of the window. Consecutive chunks always share exactly
//!   `chunk_overlap` characters.
//! - [`ChunkStrategy::Recursive`]: splits on `"\n\n"`, then `"\n"`, then
//!   `" "`, then single characters, and greedily merges the pieces back
//!   into chunks, carrying up to `chunk_overlap` characters of trailing
//!   pieces into the next chunk. Chunks are whitespace-trimmed.
//!
//! Lengths are measured in characters, not bytes. Every chunk inherits its
//! parent document's metadata unchanged and carries a SHA-256 hash of its
//! text.

use std::collections::VecDeque;

use anyhow::{bail, Result};
use sha2::{Digest, Sha256};

use crate::config::ChunkingConfig;
use crate::models::{Chunk, Document};

/// Separator hierarchy used by the recursive strategy, coarsest first.
const SEPARATORS: &[&str] = &["\n\n", "\n", " ", ""];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkStrategy {
    Window,
    Recursive,
}

impl ChunkStrategy {
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "window" => Ok(ChunkStrategy::Window),
            "recursive" => Ok(ChunkStrategy::Recursive),
            other => bail!("Unknown chunking strategy: '{}'", other),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Chunker {
    strategy: ChunkStrategy,
    chunk_size: usize,
    chunk_overlap: usize,
}

impl Chunker {
    pub fn new(strategy: ChunkStrategy, chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            bail!("chunk_size must be > 0");
        }
        if chunk_overlap >= chunk_size {
            bail!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                chunk_overlap,
                chunk_size
            );
        }
        Ok(Self {
            strategy,
            chunk_size,
            chunk_overlap,
        })
    }

    pub fn from_config(config: &ChunkingConfig) -> Result<Self> {
        Self::new(
            ChunkStrategy::parse(&config.strategy)?,
            config.chunk_size,
            config.chunk_overlap,
        )
    }

    /// Split a document into chunks with contiguous indices starting at 0.
    pub fn chunk_document(&self, doc: &Document) -> Vec<Chunk> {
        self.split_text(&doc.text)
            .into_iter()
            .enumerate()
            .map(|(index, text)| make_chunk(doc, index, text))
            .collect()
    }

    /// Chunk every document in order.
    pub fn chunk_documents(&self, docs: &[Document]) -> Vec<Chunk> {
        docs.iter().flat_map(|d| self.chunk_document(d)).collect()
    }

    pub fn split_text(&self, text: &str) -> Vec<String> {
        if text.trim().is_empty() {
            return Vec::new();
        }
        match self.strategy {
            ChunkStrategy::Window => self.split_windows(text),
            ChunkStrategy::Recursive => self.split_recursive(text, SEPARATORS),
        }
    }

    fn split_windows(&self, text: &str) -> Vec<String> {
        let chars: Vec<char> = text.chars().collect();
        let n = chars.len();
        let min_len = (self.chunk_overlap + 1).max(self.chunk_size / 2);

        let mut out = Vec::new();
        let mut start = 0;
        loop {
            if n - start <= self.chunk_size {
                out.push(chars[start..].iter().collect());
                break;
            }
            let hard_end = start + self.chunk_size;
            let end = find_break(&chars, start + min_len, hard_end).unwrap_or(hard_end);
            out.push(chars[start..end].iter().collect());
            start = end - self.chunk_overlap;
        }
        out
    }

    fn split_recursive(&self, text: &str, separators: &[&str]) -> Vec<String> {
        let pos = separators
            .iter()
            .position(|s| s.is_empty() || text.contains(s))
            .unwrap_or(separators.len() - 1);
        let separator = separators[pos];
        let rest = &separators[pos + 1..];

        let mut finished = Vec::new();
        let mut pending: Vec<&str> = Vec::new();

        for piece in split_keep_separator(text, separator) {
            if char_len(piece) < self.chunk_size {
                pending.push(piece);
                continue;
            }
            if !pending.is_empty() {
                finished.extend(self.merge_pieces(&pending));
                pending.clear();
            }
            if rest.is_empty() {
                let trimmed = piece.trim();
                if !trimmed.is_empty() {
                    finished.push(trimmed.to_string());
                }
            } else {
                finished.extend(self.split_recursive(piece, rest));
            }
        }
        if !pending.is_empty() {
            finished.extend(self.merge_pieces(&pending));
        }
        finished
    }

    fn merge_pieces(&self, pieces: &[&str]) -> Vec<String> {
        let mut docs = Vec::new();
        let mut current: VecDeque<&str> = VecDeque::new();
        let mut total = 0usize;

        for piece in pieces {
            let len = char_len(piece);
            if total + len > self.chunk_size && !current.is_empty() {
                push_joined(&mut docs, &current);
                while total > self.chunk_overlap || (total + len > self.chunk_size && total > 0) {
                    match current.pop_front() {
                        Some(front) => total -= char_len(front),
                        None => break,
                    }
                }
            }
            current.push_back(piece);
            total += len;
        }
        push_joined(&mut docs, &current);
        docs
    }
}

/// Latest cut position in `min_end..=hard_end` that follows a paragraph
/// break, then a line break, then a space.
fn find_break(chars: &[char], min_end: usize, hard_end: usize) -> Option<usize> {
    if min_end > hard_end {
        return None;
    }
    let paragraph = (min_end.max(2)..=hard_end)
        .rev()
        .find(|&p| chars[p - 2] == '\n' && chars[p - 1] == '\n');
    paragraph
        .or_else(|| {
            (min_end.max(1)..=hard_end)
                .rev()
                .find(|&p| chars[p - 1] == '\n')
        })
        .or_else(|| {
            (min_end.max(1)..=hard_end)
                .rev()
                .find(|&p| chars[p - 1] == ' ')
        })
}

/// Split on `separator`, attaching each separator to the start of the piece
/// that follows it. An empty separator splits into single characters.
fn split_keep_separator<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    if separator.is_empty() {
        return text
            .char_indices()
            .map(|(i, c)| &text[i..i + c.len_utf8()])
            .collect();
    }
    let mut pieces = Vec::new();
    let mut last = 0;
    for (idx, _) in text.match_indices(separator) {
        if idx > last {
            pieces.push(&text[last..idx]);
        }
        last = idx;
    }
    if last < text.len() {
        pieces.push(&text[last..]);
    }
    pieces
}

fn push_joined(docs: &mut Vec<String>, current: &VecDeque<&str>) {
    let joined: String = current.iter().copied().collect();
    let trimmed = joined.trim();
    if !trimmed.is_empty() {
        docs.push(trimmed.to_string());
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn make_chunk(doc: &Document, index: usize, text: String) -> Chunk {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let hash = format!("{:x}", hasher.finalize());

    Chunk {
        page: doc.page,
        index,
        text,
        hash,
        metadata: doc.metadata.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Metadata;

    fn doc(text: &str) -> Document {
        Document {
            page: 3,
            text: text.to_string(),
            metadata: Metadata {
                title: "Sharding".to_string(),
                keywords: vec!["shard".to_string(), "cluster".to_string()],
                has_code: false,
            },
        }
    }

    fn prose(words: usize) -> String {
        (0..words)
            .map(|i| format!("word{}", i % 17))
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn suffix(s: &str, n: usize) -> String {
        let chars: Vec<char> = s.chars().collect();
        chars[chars.len() - n..].iter().collect()
    }

    fn prefix(s: &str, n: usize) -> String {
        s.chars().take(n).collect()
    }

    #[test]
    fn test_small_text_single_chunk() {
        let chunker = Chunker::new(ChunkStrategy::Window, 500, 150).unwrap();
        let chunks = chunker.chunk_document(&doc("Hello, world!"));
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].index, 0);
        assert_eq!(chunks[0].text, "Hello, world!");
    }

    #[test]
    fn test_blank_text_no_chunks() {
        let chunker = Chunker::new(ChunkStrategy::Window, 500, 150).unwrap();
        assert!(chunker.chunk_document(&doc("   \n ")).is_empty());
    }

    #[test]
    fn test_window_bounds_and_exact_overlap() {
        let chunker = Chunker::new(ChunkStrategy::Window, 500, 150).unwrap();
        let text = prose(900);
        let chunks = chunker.chunk_document(&doc(&text));
        assert!(chunks.len() > 3);
        for c in &chunks {
            assert!(c.text.chars().count() <= 500);
        }
        for pair in chunks.windows(2) {
            assert_eq!(suffix(&pair[0].text, 150), prefix(&pair[1].text, 150));
        }
    }

    #[test]
    fn test_window_covers_whole_text() {
        let chunker = Chunker::new(ChunkStrategy::Window, 500, 150).unwrap();
        let text = prose(700);
        let chunks = chunker.split_text(&text);
        let mut rebuilt = chunks[0].clone();
        for c in &chunks[1..] {
            rebuilt.extend(c.chars().skip(150));
        }
        assert_eq!(rebuilt, text);
    }

    #[test]
    fn test_window_prefers_word_boundary() {
        let chunker = Chunker::new(ChunkStrategy::Window, 500, 150).unwrap();
        let chunks = chunker.split_text(&prose(300));
        assert!(chunks[0].ends_with(' '));
    }

    #[test]
    fn test_window_without_whitespace_hard_splits() {
        let chunker = Chunker::new(ChunkStrategy::Window, 500, 150).unwrap();
        let text = "x".repeat(1200);
        let chunks = chunker.split_text(&text);
        assert_eq!(chunks[0].chars().count(), 500);
        for pair in chunks.windows(2) {
            assert_eq!(suffix(&pair[0], 150), prefix(&pair[1], 150));
        }
    }

    #[test]
    fn test_window_multibyte_text() {
        let chunker = Chunker::new(ChunkStrategy::Window, 500, 150).unwrap();
        let text = "ünïcödé ".repeat(200);
        let chunks = chunker.split_text(&text);
        for c in &chunks {
            assert!(c.chars().count() <= 500);
        }
        for pair in chunks.windows(2) {
            assert_eq!(suffix(&pair[0], 150), prefix(&pair[1], 150));
        }
    }

    #[test]
    fn test_chunks_inherit_metadata_and_indices() {
        let chunker = Chunker::new(ChunkStrategy::Window, 500, 150).unwrap();
        let d = doc(&prose(600));
        let chunks = chunker.chunk_document(&d);
        for (i, c) in chunks.iter().enumerate() {
            assert_eq!(c.index, i);
            assert_eq!(c.page, 3);
            assert_eq!(c.metadata, d.metadata);
            assert_eq!(c.hash.len(), 64);
        }
    }

    #[test]
    fn test_recursive_respects_size_and_overlap_bound() {
        let chunker = Chunker::new(ChunkStrategy::Recursive, 500, 150).unwrap();
        let text = (0..30)
            .map(|i| format!("Paragraph {} talks about shards and replica sets in some depth.", i))
            .collect::<Vec<_>>()
            .join("\n\n");
        let chunks = chunker.split_text(&text);
        assert!(chunks.len() > 1);
        for c in &chunks {
            assert!(c.chars().count() <= 500);
            assert_eq!(c.trim(), c.as_str());
        }
    }

    #[test]
    fn test_recursive_splits_long_paragraph_on_words() {
        let chunker = Chunker::new(ChunkStrategy::Recursive, 100, 30).unwrap();
        let text = prose(120);
        let chunks = chunker.split_text(&text);
        assert!(chunks.len() > 1);
        for c in &chunks {
            assert!(c.chars().count() <= 100);
            assert!(!c.starts_with(' '));
        }
        // Overlap carries trailing words into the next chunk.
        let last_word = chunks[0].split(' ').last().unwrap();
        let head: String = chunks[1].chars().take(30).collect();
        assert!(head.contains(last_word));
    }

    #[test]
    fn test_recursive_character_fallback() {
        let chunker = Chunker::new(ChunkStrategy::Recursive, 50, 10).unwrap();
        let chunks = chunker.split_text(&"y".repeat(180));
        assert!(chunks.len() >= 4);
        for c in &chunks {
            assert!(c.chars().count() <= 50);
        }
    }

    #[test]
    fn test_deterministic() {
        let chunker = Chunker::new(ChunkStrategy::Window, 500, 150).unwrap();
        let d = doc(&prose(400));
        let c1 = chunker.chunk_document(&d);
        let c2 = chunker.chunk_document(&d);
        assert_eq!(c1.len(), c2.len());
        for (a, b) in c1.iter().zip(c2.iter()) {
            assert_eq!(a.text, b.text);
            assert_eq!(a.hash, b.hash);
        }
    }

    #[test]
    fn test_invalid_settings() {
        assert!(Chunker::new(ChunkStrategy::Window, 0, 0).is_err());
        assert!(Chunker::new(ChunkStrategy::Window, 100, 100).is_err());
        assert!(ChunkStrategy::parse("semantic").is_err());
    }
}
