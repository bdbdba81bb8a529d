use geokb_chunk::ChunkError;

use crate::vector_store::VectorStoreError;

#[derive(Debug, thiserror::Error)]
pub enum RetrievalError {
    /// Vector recall failed; the query is aborted.
    #[error("recall failed: {0}")]
    Recall(String),

    /// Cross-encoder scoring failed; the query is aborted.
    #[error("rerank failed: {0}")]
    Rerank(String),

    #[error("embedding failed: {0}")]
    Embedding(String),

    #[error("vector store error: {0}")]
    VectorStore(#[from] VectorStoreError),

    #[error("generation failed: {0}")]
    Generation(String),

    #[error("chunking error: {0}")]
    Chunk(#[from] ChunkError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, RetrievalError>;
