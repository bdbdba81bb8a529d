//! Token counting used for every budget decision in the chunker.

use std::path::Path;

use tokenizers::Tokenizer;

use crate::error::{ChunkError, Result};

/// Counts tokens the way the boundary model and the budget see them.
pub trait TokenCounter: Send + Sync {
    fn count(&self, text: &str) -> usize;

    /// Joint length of a `(prev, next)` pair as fed to the boundary model.
    fn count_pair(&self, first: &str, second: &str) -> usize {
        self.count(first) + self.count(second)
    }
}

/// Whitespace word counter, used when no tokenizer file is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct WordTokenCounter;

impl TokenCounter for WordTokenCounter {
    fn count(&self, text: &str) -> usize {
        text.split_whitespace().count()
    }
}

/// HuggingFace tokenizer; counts include special tokens.
///
/// Truncation and padding stored in the tokenizer are switched off so counts
/// reflect the full text.
pub struct HfTokenCounter {
    tokenizer: Tokenizer,
}

impl std::fmt::Debug for HfTokenCounter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HfTokenCounter").finish_non_exhaustive()
    }
}

impl HfTokenCounter {
    /// Load a `tokenizer.json` from disk.
    ///
    /// # Errors
    ///
    /// Returns `ChunkError::Tokenizer` if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let tokenizer = Tokenizer::from_file(path)
            .map_err(|e| ChunkError::Tokenizer(format!("{}: {e}", path.display())))?;
        Self::new(tokenizer)
    }

    /// # Errors
    ///
    /// Returns `ChunkError::Tokenizer` if truncation cannot be disabled.
    pub fn new(mut tokenizer: Tokenizer) -> Result<Self> {
        tokenizer
            .with_truncation(None)
            .map_err(|e| ChunkError::Tokenizer(e.to_string()))?;
        tokenizer.with_padding(None);
        Ok(Self { tokenizer })
    }
}

/// Rough fallback when the tokenizer rejects an input.
fn estimate_tokens(text: &str) -> usize {
    text.chars().count() / 4
}

impl TokenCounter for HfTokenCounter {
    fn count(&self, text: &str) -> usize {
        match self.tokenizer.encode(text, true) {
            Ok(enc) => enc.len(),
            Err(e) => {
                tracing::warn!("tokenizer failed, estimating token count: {e}");
                estimate_tokens(text)
            }
        }
    }

    fn count_pair(&self, first: &str, second: &str) -> usize {
        match self.tokenizer.encode((first, second), true) {
            Ok(enc) => enc.len(),
            Err(e) => {
                tracing::warn!("tokenizer failed on pair, estimating token count: {e}");
                estimate_tokens(first) + estimate_tokens(second)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn word_counter_counts_whitespace_tokens() {
        assert_eq!(WordTokenCounter.count("granite  is\nigneous rock"), 4);
        assert_eq!(WordTokenCounter.count(""), 0);
    }

    #[test]
    fn word_counter_pair_is_sum() {
        assert_eq!(WordTokenCounter.count_pair("a b", "c d e"), 5);
    }

    #[test]
    fn estimate_is_quarter_of_chars() {
        assert_eq!(estimate_tokens("abcdefgh"), 2);
    }

    const BOUNDED_TOKENIZER: &str = r#"{
        "version": "1.0",
        "truncation": {
            "direction": "Right",
            "max_length": 512,
            "strategy": "LongestFirst",
            "stride": 0
        },
        "padding": {
            "strategy": { "Fixed": 16 },
            "direction": "Right",
            "pad_to_multiple_of": null,
            "pad_id": 0,
            "pad_type_id": 0,
            "pad_token": "[UNK]"
        },
        "added_tokens": [],
        "normalizer": null,
        "pre_tokenizer": { "type": "Whitespace" },
        "post_processor": null,
        "decoder": null,
        "model": {
            "type": "WordLevel",
            "vocab": { "[UNK]": 0, "basalt": 1, "flow": 2 },
            "unk_token": "[UNK]"
        }
    }"#;

    fn bounded_tokenizer_file() -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, BOUNDED_TOKENIZER.as_bytes()).unwrap();
        file
    }

    #[test]
    fn stored_truncation_does_not_cap_count() {
        let file = bounded_tokenizer_file();
        let counter = HfTokenCounter::from_file(file.path()).unwrap();
        let text = vec!["basalt"; 2000].join(" ");
        assert_eq!(counter.count(&text), 2000);
        assert_eq!(counter.count_pair(&text, &text), 4000);
    }

    #[test]
    fn stored_padding_does_not_inflate_count() {
        let file = bounded_tokenizer_file();
        let counter = HfTokenCounter::from_file(file.path()).unwrap();
        assert_eq!(counter.count("basalt flow"), 2);
    }

    #[test]
    fn wrapped_tokenizer_is_unbounded() {
        let file = bounded_tokenizer_file();
        let tokenizer = Tokenizer::from_file(file.path()).unwrap();
        assert!(tokenizer.get_truncation().is_some());
        let counter = HfTokenCounter::new(tokenizer).unwrap();
        assert_eq!(counter.count(&vec!["flow"; 600].join(" ")), 600);
    }

    #[test]
    fn missing_tokenizer_file_is_error() {
        let err = HfTokenCounter::from_file(Path::new("/nonexistent/tokenizer.json")).unwrap_err();
        assert!(matches!(err, ChunkError::Tokenizer(_)));
    }
}
