//! Knowledge base: document ingestion and question answering over one
//! vector collection and its chunk stores.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use geokb_chunk::{ChunkStore, DocumentChunker, TextLoader};

use crate::error::Result;
use crate::expansion::{ChunkLookup, ContextExpander, StoreLookup};
use crate::generate::Generator;
use crate::orchestrator::{RetrievalConfig, Retriever};
use crate::prompt::build_prompt;
use crate::recall::VectorIndex;
use crate::rerank::Reranker;
use crate::types::ExpandedChunk;

/// Retrieval output together with the prompt to send to a generator.
#[derive(Debug, Clone)]
pub struct PreparedQuery {
    pub docs: Vec<ExpandedChunk>,
    /// The filled template, or the bare question when nothing was retrieved.
    pub prompt: String,
}

#[derive(Debug, Clone)]
pub struct Answer {
    pub docs: Vec<ExpandedChunk>,
    pub response: String,
}

pub struct KnowledgeBase {
    loader: TextLoader,
    chunker: DocumentChunker,
    store: ChunkStore,
    index: Arc<VectorIndex>,
    retriever: Retriever,
    expander: ContextExpander,
}

impl std::fmt::Debug for KnowledgeBase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KnowledgeBase")
            .field("store", &self.store)
            .field("index", &self.index)
            .field("retriever", &self.retriever)
            .finish_non_exhaustive()
    }
}

impl KnowledgeBase {
    #[must_use]
    pub fn new(
        chunker: DocumentChunker,
        store: ChunkStore,
        index: VectorIndex,
        reranker: Arc<dyn Reranker>,
        config: RetrievalConfig,
    ) -> Self {
        let index = Arc::new(index);
        let expander = ContextExpander::new(
            Arc::new(StoreLookup),
            config.expand_range,
            config.expand_timeout,
        );
        Self {
            loader: TextLoader::default(),
            chunker,
            store,
            retriever: Retriever::new(index.clone(), reranker, config),
            index,
            expander,
        }
    }

    /// Replace the source of chunk records used for expansion.
    #[must_use]
    pub fn with_lookup(mut self, lookup: Arc<dyn ChunkLookup>) -> Self {
        let config = self.retriever.config();
        self.expander = ContextExpander::new(lookup, config.expand_range, config.expand_timeout);
        self
    }

    #[must_use]
    pub fn with_loader(mut self, loader: TextLoader) -> Self {
        self.loader = loader;
        self
    }

    #[must_use]
    pub fn store(&self) -> &ChunkStore {
        &self.store
    }

    #[must_use]
    pub fn config(&self) -> &RetrievalConfig {
        self.retriever.config()
    }

    /// Load, chunk, embed, persist and index one document. Returns the
    /// number of chunks indexed.
    ///
    /// The chunk store is written only after embedding succeeds, and removed
    /// again if the vector store rejects the points, so the store and the
    /// index never disagree about a document.
    ///
    /// # Errors
    ///
    /// Returns an error if any stage fails; nothing is left indexed for the
    /// document in that case.
    pub async fn add_file(&self, path: &Path) -> Result<usize> {
        let document = self.loader.load(path).await?;
        let chunk_path = self.store.path_for(&document.source)?;
        let records = self
            .chunker
            .chunk(&document, &chunk_path.display().to_string())
            .await?;
        let points = self.index.embed_records(&records).await?;

        self.store.write(&chunk_path, &records).await?;
        match self.index.insert(points).await {
            Ok(count) => {
                tracing::info!(
                    source = %document.source,
                    chunks = count,
                    "document added"
                );
                Ok(count)
            }
            Err(e) => {
                if let Err(rm) = ChunkStore::remove(&chunk_path).await {
                    tracing::warn!(path = %chunk_path.display(), "failed to remove chunk store: {rm}");
                }
                Err(e)
            }
        }
    }

    /// Add every supported document directly under `dir`, in name order.
    /// Documents that fail are logged and skipped. Returns the number of
    /// chunks indexed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be read.
    pub async fn add_dir(&self, dir: &Path) -> Result<usize> {
        let mut entries = tokio::fs::read_dir(dir).await?;
        let mut paths: Vec<PathBuf> = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if entry.file_type().await?.is_file() && self.loader.supports(&path) {
                paths.push(path);
            }
        }
        paths.sort();

        let mut total = 0;
        for path in &paths {
            match self.add_file(path).await {
                Ok(count) => total += count,
                Err(e) => tracing::warn!(path = %path.display(), "skipping document: {e}"),
            }
        }
        Ok(total)
    }

    /// # Errors
    ///
    /// Returns an error if the vector store fails to drop the collection.
    pub async fn drop_collection(&mut self) -> Result<()> {
        self.index.drop_collection().await
    }

    /// Drop the collection and re-index every persisted chunk store. Returns
    /// the number of chunks indexed.
    ///
    /// # Errors
    ///
    /// Returns an error if a store cannot be read or indexing fails.
    pub async fn rebuild(&mut self) -> Result<usize> {
        self.index.drop_collection().await?;
        let mut total = 0;
        for path in self.store.list().await? {
            let records = ChunkStore::load(&path).await?;
            total += self.index.add_records(&records).await?;
        }
        tracing::info!(collection = %self.index.collection(), chunks = total, "collection rebuilt");
        Ok(total)
    }

    /// Recall, rerank, filter and expand. An empty result means no
    /// supporting context was found.
    ///
    /// # Errors
    ///
    /// Returns `RetrievalError::Recall` or `RetrievalError::Rerank` when the
    /// query cannot be served. Expansion problems never fail the query.
    pub async fn retrieval(&self, question: &str) -> Result<Vec<ExpandedChunk>> {
        let selected = self.retriever.retrieve(question).await?;
        Ok(self.expander.expand_all(selected).await)
    }

    /// # Errors
    ///
    /// Returns an error if retrieval fails.
    pub async fn prepare(&self, question: &str) -> Result<PreparedQuery> {
        let docs = self.retrieval(question).await?;
        let prompt = if docs.is_empty() {
            tracing::info!("no supporting context retrieved, using bare question");
            question.to_owned()
        } else {
            build_prompt(question, &docs, chrono::Local::now().date_naive())
        };
        Ok(PreparedQuery { docs, prompt })
    }

    /// # Errors
    ///
    /// Returns an error if retrieval or generation fails.
    pub async fn answer(&self, question: &str, generator: &dyn Generator) -> Result<Answer> {
        let PreparedQuery { docs, prompt } = self.prepare(question).await?;
        let response = generator.generate(&prompt).await?;
        Ok(Answer { docs, response })
    }
}
