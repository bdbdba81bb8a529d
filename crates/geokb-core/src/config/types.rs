use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use geokb_chunk::boundary::{DEFAULT_BATCH_SIZE, DEFAULT_MAX_WINDOW};
use geokb_chunk::pipeline::DEFAULT_MAX_SIZE;
use geokb_retrieval::orchestrator::{
    DEFAULT_EXPAND_RANGE, DEFAULT_SCORE_THRESHOLD, DEFAULT_TOP_K, DEFAULT_VEC_RECALL_NUM,
};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub boundary: BoundaryConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub rerank: RerankConfig,
    #[serde(default)]
    pub retrieval: RetrievalSection,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

fn default_max_size() -> usize {
    DEFAULT_MAX_SIZE
}

fn default_chunk_dir() -> PathBuf {
    PathBuf::from("split_chunks")
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChunkingConfig {
    /// Token budget of a chunk.
    #[serde(default = "default_max_size")]
    pub max_size: usize,
    #[serde(default = "default_chunk_dir")]
    pub chunk_dir: PathBuf,
    /// HuggingFace `tokenizer.json`; whitespace word counting when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokenizer_path: Option<PathBuf>,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_size: default_max_size(),
            chunk_dir: default_chunk_dir(),
            tokenizer_path: None,
        }
    }
}

fn default_boundary_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

fn default_max_window() -> usize {
    DEFAULT_MAX_WINDOW
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BoundaryConfig {
    /// Boundary model service; the lexical heuristic is used when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default = "default_boundary_batch_size")]
    pub batch_size: usize,
    /// Longest sentence pair, in tokens, the model accepts.
    #[serde(default = "default_max_window")]
    pub max_window: usize,
}

impl Default for BoundaryConfig {
    fn default() -> Self {
        Self {
            url: None,
            batch_size: default_boundary_batch_size(),
            max_window: default_max_window(),
        }
    }
}

fn default_embedding_url() -> String {
    "http://localhost:8810".into()
}

fn default_service_batch_size() -> usize {
    32
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_url")]
    pub url: String,
    #[serde(default = "default_service_batch_size")]
    pub batch_size: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            url: default_embedding_url(),
            batch_size: default_service_batch_size(),
        }
    }
}

fn default_rerank_url() -> String {
    "http://localhost:8811".into()
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RerankConfig {
    #[serde(default = "default_rerank_url")]
    pub url: String,
    #[serde(default = "default_service_batch_size")]
    pub batch_size: usize,
    /// Prefix passages with their title/section/subsection before scoring.
    #[serde(default = "default_true")]
    pub include_metadata: bool,
}

impl Default for RerankConfig {
    fn default() -> Self {
        Self {
            url: default_rerank_url(),
            batch_size: default_service_batch_size(),
            include_metadata: true,
        }
    }
}

fn default_collection() -> String {
    "geodocs".into()
}

fn default_vec_recall_num() -> usize {
    DEFAULT_VEC_RECALL_NUM
}

fn default_top_k() -> usize {
    DEFAULT_TOP_K
}

fn default_score_threshold() -> f32 {
    DEFAULT_SCORE_THRESHOLD
}

fn default_expand_range() -> usize {
    DEFAULT_EXPAND_RANGE
}

fn default_expand_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetrievalSection {
    #[serde(default = "default_collection")]
    pub collection: String,
    #[serde(default = "default_vec_recall_num")]
    pub vec_recall_num: usize,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default = "default_score_threshold")]
    pub score_threshold: f32,
    /// Token budget of an expansion window; `0` disables expansion.
    #[serde(default = "default_expand_range")]
    pub expand_range: usize,
    #[serde(default = "default_expand_timeout_secs")]
    pub expand_timeout_secs: u64,
}

impl Default for RetrievalSection {
    fn default() -> Self {
        Self {
            collection: default_collection(),
            vec_recall_num: default_vec_recall_num(),
            top_k: default_top_k(),
            score_threshold: default_score_threshold(),
            expand_range: default_expand_range(),
            expand_timeout_secs: default_expand_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Write logs to this file instead of stderr.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,
}
