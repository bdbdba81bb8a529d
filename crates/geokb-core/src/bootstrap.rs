//! Construction of the chunking and retrieval collaborators from [`Config`].

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use geokb_chunk::{
    BoundaryScorer, ChunkStore, DocumentChunker, HfTokenCounter, HttpBoundaryScorer,
    LexicalBoundaryScorer, TokenCounter, WordTokenCounter,
};
use geokb_retrieval::{
    HttpEmbedder, HttpReranker, InMemoryVectorStore, KnowledgeBase, VectorIndex, VectorStore,
};

use crate::config::Config;

/// Config file location: an explicit path, then `GEOKB_CONFIG`, then
/// `config/default.toml`.
#[must_use]
pub fn resolve_config_path(explicit: Option<PathBuf>) -> PathBuf {
    if let Some(path) = explicit {
        return path;
    }
    if let Ok(path) = std::env::var("GEOKB_CONFIG") {
        return PathBuf::from(path);
    }
    PathBuf::from("config/default.toml")
}

/// # Errors
///
/// Returns an error if a configured tokenizer file cannot be loaded.
pub fn create_token_counter(config: &Config) -> anyhow::Result<Arc<dyn TokenCounter>> {
    match &config.chunking.tokenizer_path {
        Some(path) => {
            let counter = HfTokenCounter::from_file(path)
                .with_context(|| format!("failed to load tokenizer {}", path.display()))?;
            tracing::info!(path = %path.display(), "using tokenizer");
            Ok(Arc::new(counter))
        }
        None => {
            tracing::info!("no tokenizer configured, counting whitespace words");
            Ok(Arc::new(WordTokenCounter))
        }
    }
}

#[must_use]
pub fn create_boundary_scorer(config: &Config) -> Arc<dyn BoundaryScorer> {
    match &config.boundary.url {
        Some(url) => Arc::new(HttpBoundaryScorer::new(url.clone())),
        None => {
            tracing::info!("no boundary service configured, using lexical heuristic");
            Arc::new(LexicalBoundaryScorer::default())
        }
    }
}

/// # Errors
///
/// Returns an error if the token counter cannot be created.
pub fn create_chunker(config: &Config) -> anyhow::Result<DocumentChunker> {
    Ok(DocumentChunker::new(
        config.chunker_config(),
        create_token_counter(config)?,
        create_boundary_scorer(config),
    ))
}

#[must_use]
pub fn create_chunk_store(config: &Config) -> ChunkStore {
    ChunkStore::new(config.chunking.chunk_dir.clone())
}

/// Knowledge base over the configured services and the given vector store.
///
/// # Errors
///
/// Returns an error if the chunker cannot be created.
pub fn create_knowledge_base(
    config: &Config,
    vector_store: Arc<dyn VectorStore>,
) -> anyhow::Result<KnowledgeBase> {
    let embedder = HttpEmbedder::new(config.embedding.url.clone(), config.embedding.batch_size);
    let reranker = HttpReranker::new(config.rerank.url.clone(), config.rerank.batch_size);
    let index = VectorIndex::new(
        Arc::new(embedder),
        vector_store,
        config.retrieval.collection.clone(),
    );
    Ok(KnowledgeBase::new(
        create_chunker(config)?,
        create_chunk_store(config),
        index,
        Arc::new(reranker),
        config.retrieval_config(),
    ))
}

/// Knowledge base backed by a fresh in-memory vector store.
///
/// # Errors
///
/// Returns an error if the chunker cannot be created.
pub fn create_in_memory_knowledge_base(config: &Config) -> anyhow::Result<KnowledgeBase> {
    create_knowledge_base(config, Arc::new(InMemoryVectorStore::new()))
}
