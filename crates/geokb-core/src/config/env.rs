use std::path::PathBuf;
use std::str::FromStr;

use super::Config;

/// Parsed value of `key`, or `None` when unset. Unparsable values are
/// ignored with a warning.
fn parsed<T: FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!("ignoring invalid {key} value: {raw}");
            None
        }
    }
}

impl Config {
    pub(crate) fn apply_env_overrides(&mut self) {
        if let Some(v) = parsed("GEOKB_MAX_SIZE") {
            self.chunking.max_size = v;
        }
        if let Ok(v) = std::env::var("GEOKB_CHUNK_DIR") {
            self.chunking.chunk_dir = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("GEOKB_TOKENIZER_PATH") {
            self.chunking.tokenizer_path = Some(PathBuf::from(v));
        }
        if let Ok(v) = std::env::var("GEOKB_BOUNDARY_URL") {
            self.boundary.url = Some(v);
        }
        if let Ok(v) = std::env::var("GEOKB_EMBEDDING_URL") {
            self.embedding.url = v;
        }
        if let Ok(v) = std::env::var("GEOKB_RERANK_URL") {
            self.rerank.url = v;
        }
        if let Some(v) = parsed("GEOKB_INCLUDE_METADATA") {
            self.rerank.include_metadata = v;
        }
        if let Some(v) = parsed("GEOKB_VEC_RECALL_NUM") {
            self.retrieval.vec_recall_num = v;
        }
        if let Some(v) = parsed("GEOKB_TOP_K") {
            self.retrieval.top_k = v;
        }
        if let Some(v) = parsed("GEOKB_SCORE_THRESHOLD") {
            self.retrieval.score_threshold = v;
        }
        if let Some(v) = parsed("GEOKB_EXPAND_RANGE") {
            self.retrieval.expand_range = v;
        }
        if let Some(v) = parsed("GEOKB_EXPAND_TIMEOUT") {
            self.retrieval.expand_timeout_secs = v;
        }
    }
}
