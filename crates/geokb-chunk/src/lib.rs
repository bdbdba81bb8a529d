//! Structure-aware document chunking for the GeoKB retrieval pipeline.
//!
//! Documents are parsed into a title/section/subsection outline, each
//! section's paragraphs are segmented into sentences, adjacent sentences are
//! scored for coherence by a pluggable [`BoundaryScorer`], and runs that
//! exceed the token budget are cut recursively at their weakest joint before
//! being greedily merged back toward the budget. The resulting chunks are
//! persisted per document as newline-delimited JSON.

pub mod boundary;
pub mod client;
pub mod error;
pub mod loader;
pub mod merger;
pub mod outline;
pub(crate) mod paragraph;
pub mod pipeline;
pub mod sentence;
pub mod splitter;
pub mod store;
pub mod tokenizer;
pub mod types;

pub use boundary::{
    BoundaryError, BoundaryPrediction, BoundaryScorer, HttpBoundaryScorer, LexicalBoundaryScorer,
};
pub use error::{ChunkError, Result};
pub use loader::TextLoader;
pub use outline::{Outline, parse_outline};
pub use pipeline::{ChunkerConfig, DocumentChunker};
pub use store::ChunkStore;
pub use tokenizer::{HfTokenCounter, TokenCounter, WordTokenCounter};
pub use types::{ChunkRecord, Document, ScoredSentence, SectionPath};
