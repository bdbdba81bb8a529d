//! Embedding-space recall over a vector store.

use std::sync::Arc;

use geokb_chunk::ChunkRecord;
use uuid::Uuid;

use crate::BoxFuture;
use crate::embed::Embedder;
use crate::error::{Result, RetrievalError};
use crate::types::Candidate;
use crate::vector_store::{VectorPoint, VectorStore};

/// Nearest-neighbour recall capability.
pub trait SimilaritySearch: Send + Sync {
    /// Up to `k` chunks closest to `query`, nearest first.
    fn similarity_search<'a>(&'a self, query: &'a str, k: usize) -> BoxFuture<'a, Result<Vec<Candidate>>>;
}

/// Chunk index built from an [`Embedder`] and a [`VectorStore`]. Each point's
/// payload is the full chunk record, so recall needs no second lookup.
pub struct VectorIndex {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    collection: String,
}

impl std::fmt::Debug for VectorIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorIndex")
            .field("collection", &self.collection)
            .finish_non_exhaustive()
    }
}

fn record_payload(
    record: &ChunkRecord,
) -> Result<std::collections::HashMap<String, serde_json::Value>> {
    match serde_json::to_value(record)? {
        serde_json::Value::Object(map) => Ok(map.into_iter().collect()),
        other => Err(RetrievalError::Embedding(format!(
            "chunk record serialized to non-object: {other}"
        ))),
    }
}

impl VectorIndex {
    #[must_use]
    pub fn new(
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorStore>,
        collection: impl Into<String>,
    ) -> Self {
        Self {
            embedder,
            store,
            collection: collection.into(),
        }
    }

    #[must_use]
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Embed chunk records into points ready for [`Self::insert`].
    ///
    /// # Errors
    ///
    /// Returns `RetrievalError::Embedding` if the embedder fails or returns the
    /// wrong number of vectors.
    pub async fn embed_records(&self, records: &[ChunkRecord]) -> Result<Vec<VectorPoint>> {
        if records.is_empty() {
            return Ok(Vec::new());
        }
        let texts: Vec<String> = records.iter().map(|r| r.text.clone()).collect();
        let vectors = self.embedder.embed_documents(&texts).await?;
        if vectors.len() != records.len() {
            return Err(RetrievalError::Embedding(format!(
                "expected {} embeddings, got {}",
                records.len(),
                vectors.len()
            )));
        }

        records
            .iter()
            .zip(vectors)
            .map(|(record, vector)| {
                Ok(VectorPoint {
                    id: Uuid::new_v4().to_string(),
                    vector,
                    payload: record_payload(record)?,
                })
            })
            .collect()
    }

    /// Upsert embedded points, creating the collection on first use.
    ///
    /// # Errors
    ///
    /// Returns an error if the vector store rejects the collection or points.
    pub async fn insert(&self, points: Vec<VectorPoint>) -> Result<usize> {
        let Some(first) = points.first() else {
            return Ok(0);
        };
        let dimension = first.vector.len() as u64;
        self.store
            .ensure_collection(&self.collection, dimension)
            .await?;
        let count = points.len();
        self.store.upsert(&self.collection, points).await?;
        tracing::debug!(collection = %self.collection, count, "chunks indexed");
        Ok(count)
    }

    /// Embed and upsert chunk records. Returns the number of points written.
    ///
    /// # Errors
    ///
    /// Returns an error if embedding fails or the vector store rejects the points.
    pub async fn add_records(&self, records: &[ChunkRecord]) -> Result<usize> {
        let points = self.embed_records(records).await?;
        self.insert(points).await
    }

    /// # Errors
    ///
    /// Returns an error if the vector store fails to drop the collection.
    pub async fn drop_collection(&self) -> Result<()> {
        self.store.delete_collection(&self.collection).await?;
        tracing::info!(collection = %self.collection, "collection dropped");
        Ok(())
    }

    async fn search(&self, query: &str, k: usize) -> Result<Vec<Candidate>> {
        let exists = self
            .store
            .collection_exists(&self.collection)
            .await
            .map_err(|e| RetrievalError::Recall(e.to_string()))?;
        if !exists {
            tracing::debug!(collection = %self.collection, "collection missing, nothing to recall");
            return Ok(Vec::new());
        }

        let vector = self
            .embedder
            .embed_query(query)
            .await
            .map_err(|e| RetrievalError::Recall(e.to_string()))?;
        let hits = self
            .store
            .search(&self.collection, vector, k as u64)
            .await
            .map_err(|e| RetrievalError::Recall(e.to_string()))?;

        hits.into_iter()
            .map(|hit| {
                let record: ChunkRecord =
                    serde_json::from_value(serde_json::Value::Object(hit.payload.into_iter().collect()))
                        .map_err(|e| RetrievalError::Recall(format!("point {}: {e}", hit.id)))?;
                Ok(Candidate {
                    record,
                    distance: 1.0 - hit.score,
                })
            })
            .collect()
    }
}

impl SimilaritySearch for VectorIndex {
    fn similarity_search<'a>(&'a self, query: &'a str, k: usize) -> BoxFuture<'a, Result<Vec<Candidate>>> {
        Box::pin(self.search(query, k))
    }
}
