//! Cross-encoder scoring of `(query, passage)` pairs.

use std::fmt;

use serde::{Deserialize, Serialize};

use geokb_chunk::client::{default_client, normalize_base_url};

use crate::BoxFuture;
use crate::error::{Result, RetrievalError};

pub trait Reranker: Send + Sync {
    /// One relevance score per pair, in input order; higher is more relevant.
    fn compute_scores<'a>(&'a self, pairs: &'a [(String, String)]) -> BoxFuture<'a, Result<Vec<f32>>>;
}

/// Reranking service client: `POST {base_url}/query` with
/// `{"qp_pairs": [[query, passage], ...]}`, answered by `{"pred_scores": ...}`.
#[derive(Clone)]
pub struct HttpReranker {
    client: reqwest::Client,
    base_url: String,
    batch_size: usize,
}

impl fmt::Debug for HttpReranker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpReranker")
            .field("client", &"<reqwest::Client>")
            .field("base_url", &self.base_url)
            .field("batch_size", &self.batch_size)
            .finish()
    }
}

#[derive(Serialize)]
struct RerankRequest<'a> {
    qp_pairs: Vec<[&'a str; 2]>,
}

#[derive(Deserialize)]
struct RerankResponse {
    pred_scores: Option<ScorePayload>,
}

/// `pred_scores` arrives as a list, a bare float for single pairs, or a
/// string holding either.
#[derive(Deserialize)]
#[serde(untagged)]
enum ScorePayload {
    Many(Vec<f32>),
    One(f32),
    Encoded(String),
}

impl ScorePayload {
    fn into_scores(self) -> Result<Vec<f32>> {
        match self {
            Self::Many(v) => Ok(v),
            Self::One(s) => Ok(vec![s]),
            Self::Encoded(s) => {
                let decoded: Self = serde_json::from_str(&s)
                    .map_err(|e| RetrievalError::Rerank(format!("invalid pred_scores: {e}")))?;
                match decoded {
                    Self::Encoded(_) => Err(RetrievalError::Rerank(format!(
                        "unexpected pred_scores encoding: {s}"
                    ))),
                    other => other.into_scores(),
                }
            }
        }
    }
}

impl HttpReranker {
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

    async fn score_batch(&self, pairs: &[(String, String)]) -> Result<Vec<f32>> {
        let body = RerankRequest {
            qp_pairs: pairs.iter().map(|(q, p)| [q.as_str(), p.as_str()]).collect(),
        };
        let response = self
            .client
            .post(format!("{}/query", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| RetrievalError::Rerank(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| RetrievalError::Rerank(e.to_string()))?;
        if !status.is_success() {
            tracing::error!("rerank service error {status}: {text}");
            return Err(RetrievalError::Rerank(format!(
                "rerank request failed (status {status})"
            )));
        }

        let resp: RerankResponse =
            serde_json::from_str(&text).map_err(|e| RetrievalError::Rerank(e.to_string()))?;
        let scores = resp
            .pred_scores
            .ok_or_else(|| RetrievalError::Rerank("pred_scores missing from response".into()))?
            .into_scores()?;
        if scores.len() != pairs.len() {
            return Err(RetrievalError::Rerank(format!(
                "expected {} scores, got {}",
                pairs.len(),
                scores.len()
            )));
        }
        Ok(scores)
    }

    async fn score_all(&self, pairs: &[(String, String)]) -> Result<Vec<f32>> {
        let mut scores = Vec::with_capacity(pairs.len());
        for batch in pairs.chunks(self.batch_size) {
            scores.extend(self.score_batch(batch).await?);
        }
        Ok(scores)
    }
}

impl Reranker for HttpReranker {
    fn compute_scores<'a>(&'a self, pairs: &'a [(String, String)]) -> BoxFuture<'a, Result<Vec<f32>>> {
        Box::pin(self.score_all(pairs))
    }
}
