//! Error types for geokb-chunk.

use crate::boundary::BoundaryError;

/// Errors that abort the ingestion of a single document.
#[derive(Debug, thiserror::Error)]
pub enum ChunkError {
    /// IO error reading a document or writing a chunk store.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error in the chunk store.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Boundary scoring failed after exhausting batch-size retries.
    #[error("boundary scoring failed: {0}")]
    Boundary(#[from] BoundaryError),

    /// Tokenizer could not be loaded.
    #[error("tokenizer error: {0}")]
    Tokenizer(String),

    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("file too large: {0} bytes")]
    FileTooLarge(u64),

    /// Chunk store persisted under an unusable name.
    #[error("invalid chunk store path: {0}")]
    InvalidStorePath(String),
}

/// Result type alias using `ChunkError`.
pub type Result<T> = std::result::Result<T, ChunkError>;
