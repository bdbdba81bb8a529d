mod env;
mod types;


pub use types::*;

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, bail};
use geokb_chunk::ChunkerConfig;
use geokb_retrieval::RetrievalConfig;

impl Config {
    /// Load configuration from a TOML file with env var overrides.
    ///
    /// Falls back to defaults when the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed, or
    /// if the resulting configuration is invalid.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str::<Self>(&content).context("failed to parse config file")?
        } else {
            tracing::debug!(path = %path.display(), "config file not found, using defaults");
            Self::default()
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    ///
    /// Returns an error naming the first setting that cannot work.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.chunking.max_size == 0 {
            bail!("chunking.max_size must be greater than 0");
        }
        if self.boundary.batch_size == 0 {
            bail!("boundary.batch_size must be greater than 0");
        }
        if self.boundary.max_window == 0 {
            bail!("boundary.max_window must be greater than 0");
        }
        if self.embedding.batch_size == 0 {
            bail!("embedding.batch_size must be greater than 0");
        }
        if self.rerank.batch_size == 0 {
            bail!("rerank.batch_size must be greater than 0");
        }
        if self.retrieval.vec_recall_num == 0 {
            bail!("retrieval.vec_recall_num must be greater than 0");
        }
        if self.retrieval.top_k == 0 {
            bail!("retrieval.top_k must be greater than 0");
        }
        if self.retrieval.score_threshold.is_nan() {
            bail!("retrieval.score_threshold must be a number");
        }
        if self.retrieval.collection.trim().is_empty() {
            bail!("retrieval.collection must not be empty");
        }
        Ok(())
    }

    #[must_use]
    pub fn chunker_config(&self) -> ChunkerConfig {
        ChunkerConfig {
            max_size: self.chunking.max_size,
            batch_size: self.boundary.batch_size,
            max_window: self.boundary.max_window,
        }
    }

    #[must_use]
    pub fn retrieval_config(&self) -> RetrievalConfig {
        RetrievalConfig {
            vec_recall_num: self.retrieval.vec_recall_num,
            top_k: self.retrieval.top_k,
            score_threshold: self.retrieval.score_threshold,
            include_metadata: self.rerank.include_metadata,
            expand_range: self.retrieval.expand_range,
            expand_timeout: Duration::from_secs(self.retrieval.expand_timeout_secs),
        }
    }
}
