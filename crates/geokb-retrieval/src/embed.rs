//! Text embedding capability and its HTTP adapter.

use std::fmt;

use serde::{Deserialize, Serialize};

use geokb_chunk::client::{default_client, normalize_base_url};

use crate::BoxFuture;
use crate::error::{Result, RetrievalError};

pub trait Embedder: Send + Sync {
    /// One vector per passage, in input order.
    fn embed_documents<'a>(&'a self, texts: &'a [String]) -> BoxFuture<'a, Result<Vec<Vec<f32>>>>;

    fn embed_query<'a>(&'a self, text: &'a str) -> BoxFuture<'a, Result<Vec<f32>>>;
}

/// Embedding service client.
///
/// Passages go to `POST {base_url}/passage` as `{"passages": [...]}`, queries
/// to `POST {base_url}/query` as `{"queries": [...]}`. Both answer with
/// `{"q_embeddings": ...}`, either a JSON array of vectors or a string holding
/// one.
#[derive(Clone)]
pub struct HttpEmbedder {
    client: reqwest::Client,
    base_url: String,
    batch_size: usize,
}

impl fmt::Debug for HttpEmbedder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpEmbedder")
            .field("client", &"<reqwest::Client>")
            .field("base_url", &self.base_url)
            .field("batch_size", &self.batch_size)
            .finish()
    }
}

#[derive(Serialize)]
struct PassageRequest<'a> {
    passages: &'a [String],
}

#[derive(Serialize)]
struct QueryRequest {
    queries: Vec<String>,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    q_embeddings: Option<EmbeddingPayload>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum EmbeddingPayload {
    Vectors(Vec<Vec<f32>>),
    Encoded(String),
}

impl EmbeddingPayload {
    fn into_vectors(self) -> Result<Vec<Vec<f32>>> {
        match self {
            Self::Vectors(v) => Ok(v),
            Self::Encoded(s) => Ok(serde_json::from_str(&s)?),
        }
    }
}

fn flatten_newlines(text: &str) -> String {
    text.replace('\n', " ")
}

impl HttpEmbedder {
    #[must_use]
    pub fn new(base_url: impl Into<String>, batch_size: usize) -> Self {
        Self {
            client: default_client(),
            base_url: normalize_base_url(base_url.into()),
            batch_size: batch_size.max(1),
        }
    }

    #[must_use]
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    async fn post<B: Serialize + Sync>(&self, endpoint: &str, body: &B) -> Result<Vec<Vec<f32>>> {
        let response = self
            .client
            .post(format!("{}/{endpoint}", self.base_url))
            .json(body)
            .send()
            .await
            .map_err(|e| RetrievalError::Embedding(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| RetrievalError::Embedding(e.to_string()))?;
        if !status.is_success() {
            tracing::error!("embedding service error {status}: {text}");
            return Err(RetrievalError::Embedding(format!(
                "embedding request failed (status {status})"
            )));
        }

        let resp: EmbeddingResponse = serde_json::from_str(&text)?;
        resp.q_embeddings
            .ok_or_else(|| RetrievalError::Embedding("q_embeddings missing from response".into()))?
            .into_vectors()
    }

    async fn embed_batches(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let flattened: Vec<String> = texts.iter().map(|t| flatten_newlines(t)).collect();
        let mut vectors = Vec::with_capacity(texts.len());
        for batch in flattened.chunks(self.batch_size) {
            let embedded = self.post("passage", &PassageRequest { passages: batch }).await?;
            if embedded.len() != batch.len() {
                return Err(RetrievalError::Embedding(format!(
                    "expected {} embeddings, got {}",
                    batch.len(),
                    embedded.len()
                )));
            }
            vectors.extend(embedded);
        }
        Ok(vectors)
    }

    async fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        let body = QueryRequest {
            queries: vec![flatten_newlines(text)],
        };
        self.post("query", &body)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| RetrievalError::Embedding("empty query embedding".into()))
    }
}

impl Embedder for HttpEmbedder {
    fn embed_documents<'a>(&'a self, texts: &'a [String]) -> BoxFuture<'a, Result<Vec<Vec<f32>>>> {
        Box::pin(self.embed_batches(texts))
    }

    fn embed_query<'a>(&'a self, text: &'a str) -> BoxFuture<'a, Result<Vec<f32>>> {
        Box::pin(self.embed_one(text))
    }
}
