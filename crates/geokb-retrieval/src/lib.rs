//! Query-time retrieval for GeoKB: vector recall, cross-encoder reranking,
//! threshold filtering and concurrent, timeout-bounded context expansion over
//! the chunk stores written by `geokb-chunk`.

use std::future::Future;
use std::pin::Pin;

pub mod embed;
pub mod error;
pub mod expansion;
pub mod generate;
pub mod in_memory_store;
pub mod kb;
pub mod orchestrator;
pub mod prompt;
pub mod recall;
pub mod rerank;
pub mod types;
pub mod vector_store;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub use embed::{Embedder, HttpEmbedder};
pub use error::{Result, RetrievalError};
pub use expansion::{ChunkLookup, ContextExpander, StoreLookup, expand_window};
pub use generate::Generator;
pub use in_memory_store::InMemoryVectorStore;
pub use kb::{Answer, KnowledgeBase, PreparedQuery};
pub use orchestrator::{RetrievalConfig, Retriever};
pub use prompt::{RAG_PROMPT, build_prompt, format_documents};
pub use recall::{SimilaritySearch, VectorIndex};
pub use rerank::{HttpReranker, Reranker};
pub use types::{Candidate, ExpandedChunk, ScoredChunk};
pub use vector_store::{ScoredVectorPoint, VectorPoint, VectorStore, VectorStoreError};
