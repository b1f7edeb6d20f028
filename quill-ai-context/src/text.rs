//! Word-window chunking for document text.
//!
//! This module turns flattened document text into bounded, overlapping
//! word-windows suitable for embedding models. Each window holds at most
//! `max_words` whitespace-separated words, and consecutive windows from the
//! same text share exactly `overlap` words. Overlap is never carried across
//! texts: each call to [`ChunkingConfig::chunk`] starts a fresh window.
//!
//! A companion normalization step, [`clean_for_embedding`], strips characters
//! that add embedding-space noise or break CSV/JSON escaping (pipes,
//! newlines, tabs, runs of hyphens) and collapses whitespace. It is applied
//! to each chunk before storage, not to the raw text, so word boundaries are
//! computed on the original content.
//!
//! # Usage
//!
//! ```
//! use quill_ai_context::text::ChunkingConfig;
//!
//! let config = ChunkingConfig::new(5, 2).unwrap();
//! let chunks = config.chunk("one two three four five six seven");
//! assert_eq!(chunks, vec![
//!     "one two three four five",
//!     "four five six seven",
//! ]);
//! ```

use crate::error::ContextError;
use regex::Regex;
use std::sync::LazyLock;

/// Default window size in words, matched to the embedding model's input budget.
pub const DEFAULT_MAX_WORDS: usize = 250;

/// Default overlap between consecutive windows, in words.
pub const DEFAULT_OVERLAP: usize = 50;

static NOISE_CHARS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[|\n\t]").unwrap());
static HYPHEN_RUNS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"-{2,}").unwrap());
static WHITESPACE_RUNS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Configuration for word-window chunking.
///
/// Invariant: `overlap < max_words`, enforced at construction. An overlap
/// equal to or larger than the window would keep the cursor from advancing,
/// so the constructor rejects it up front rather than looping forever.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingConfig {
    max_words: usize,
    overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_words: DEFAULT_MAX_WORDS,
            overlap: DEFAULT_OVERLAP,
        }
    }
}

impl ChunkingConfig {
    /// Create a chunking configuration, validating the window parameters.
    ///
    /// Fails with [`ContextError::InvalidConfiguration`] if `max_words` is
    /// zero or `overlap >= max_words`. No partial output is ever produced
    /// from an invalid configuration.
    pub fn new(max_words: usize, overlap: usize) -> Result<Self, ContextError> {
        if max_words == 0 {
            return Err(ContextError::invalid_configuration(
                "max_words must be greater than zero",
            ));
        }
        if overlap >= max_words {
            return Err(ContextError::invalid_configuration(format!(
                "overlap ({overlap}) must be strictly less than max_words ({max_words})"
            )));
        }
        Ok(Self { max_words, overlap })
    }

    /// Maximum number of words per window.
    pub fn max_words(&self) -> usize {
        self.max_words
    }

    /// Number of words shared by consecutive windows.
    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Split `text` into overlapping word-windows.
    ///
    /// Emits windows of up to `max_words` consecutive words, advancing the
    /// cursor by `max_words - overlap` after each, and stops immediately
    /// once a window reaches the end of the word sequence. Empty (or
    /// whitespace-only) text yields no chunks; text shorter than `max_words`
    /// yields exactly one chunk equal to the whole text.
    pub fn chunk(&self, text: &str) -> Vec<String> {
        let words: Vec<&str> = text.split_whitespace().collect();
        let mut chunks = Vec::new();
        let mut start = 0;

        while start < words.len() {
            let end = (start + self.max_words).min(words.len());
            chunks.push(words[start..end].join(" "));
            if end == words.len() {
                break;
            }
            start = end - self.overlap;
        }

        chunks
    }
}

/// Normalize a chunk before it is embedded and persisted.
///
/// Removes pipe, newline, and tab characters, collapses runs of hyphens to
/// one, collapses whitespace runs to a single space, and trims.
pub fn clean_for_embedding(text: &str) -> String {
    let text = NOISE_CHARS.replace_all(text, " ");
    let text = HYPHEN_RUNS.replace_all(&text, "-");
    let text = WHITESPACE_RUNS.replace_all(&text, " ");
    text.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_empty_text() {
        let config = ChunkingConfig::default();
        assert!(config.chunk("").is_empty());
        assert!(config.chunk("   \n\t ").is_empty());
    }

    #[test]
    fn test_chunk_short_text_single_chunk() {
        let config = ChunkingConfig::default();
        assert_eq!(config.chunk("a b c"), vec!["a b c".to_string()]);
    }

    #[test]
    fn test_chunk_windows_and_overlap() {
        let config = ChunkingConfig::new(4, 1).unwrap();
        let text = "w0 w1 w2 w3 w4 w5 w6 w7 w8";
        let chunks = config.chunk(text);
        assert_eq!(
            chunks,
            vec![
                "w0 w1 w2 w3".to_string(),
                "w3 w4 w5 w6".to_string(),
                "w6 w7 w8".to_string(),
            ]
        );
    }

    #[test]
    fn test_chunk_terminates_at_exact_boundary() {
        // The final window reaches the end exactly; no trailing window of
        // only overlapped words should be emitted.
        let config = ChunkingConfig::new(3, 1).unwrap();
        let chunks = config.chunk("a b c d e");
        assert_eq!(chunks, vec!["a b c".to_string(), "c d e".to_string()]);
    }

    #[test]
    fn test_chunk_word_conservation() {
        // Concatenated window sizes minus declared overlaps reconstruct the
        // original word count: no words dropped or duplicated beyond overlap.
        let config = ChunkingConfig::new(7, 3).unwrap();
        let words: Vec<String> = (0..100).map(|i| format!("word{i}")).collect();
        let text = words.join(" ");
        let chunks = config.chunk(&text);

        let total: usize = chunks
            .iter()
            .map(|c| c.split_whitespace().count())
            .sum::<usize>()
            - (chunks.len() - 1) * config.overlap();
        assert_eq!(total, 100);

        // Every window except possibly the last is full size.
        for chunk in &chunks[..chunks.len() - 1] {
            assert_eq!(chunk.split_whitespace().count(), 7);
        }
        assert!(chunks.last().unwrap().split_whitespace().count() <= 7);
    }

    #[test]
    fn test_invalid_configuration_rejected() {
        assert!(matches!(
            ChunkingConfig::new(50, 50),
            Err(ContextError::InvalidConfiguration { .. })
        ));
        assert!(matches!(
            ChunkingConfig::new(10, 250),
            Err(ContextError::InvalidConfiguration { .. })
        ));
        assert!(matches!(
            ChunkingConfig::new(0, 0),
            Err(ContextError::InvalidConfiguration { .. })
        ));
    }

    #[test]
    fn test_clean_for_embedding() {
        let raw = "| Column A | Column B |\n|---|---|\n| 1\t| 2 |";
        assert_eq!(clean_for_embedding(raw), "Column A Column B - - 1 2");
        assert_eq!(clean_for_embedding("  plain   text  "), "plain text");
        assert_eq!(clean_for_embedding(""), "");
    }
}
