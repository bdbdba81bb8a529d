use std::fmt;

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use super::{BoundaryError, BoundaryPrediction, BoundaryScorer, BoxFuture};
use crate::client::{default_client, normalize_base_url};

/// Sentence-pair classifier served over HTTP.
///
/// `POST {base_url}/predict` with `{"pairs": [[prev, next], ...]}`; the
/// response is `{"predictions": [[label, continuation], ...]}`.
#[derive(Clone)]
pub struct HttpBoundaryScorer {
    client: reqwest::Client,
    base_url: String,
}

impl fmt::Debug for HttpBoundaryScorer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpBoundaryScorer")
            .field("client", &"<reqwest::Client>")
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[derive(Serialize)]
struct PredictRequest<'a> {
    pairs: Vec<[&'a str; 2]>,
}

#[derive(Deserialize)]
struct PredictResponse {
    predictions: Vec<(u8, f32)>,
}

/// Statuses the model server uses to signal it cannot fit the batch.
fn is_exhaustion(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::TOO_MANY_REQUESTS
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::INSUFFICIENT_STORAGE
            | StatusCode::PAYLOAD_TOO_LARGE
    )
}

impl HttpBoundaryScorer {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: default_client(),
            base_url: normalize_base_url(base_url.into()),
        }
    }

    #[must_use]
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    async fn predict(
        &self,
        pairs: &[(String, String)],
    ) -> Result<Vec<BoundaryPrediction>, BoundaryError> {
        let body = PredictRequest {
            pairs: pairs.iter().map(|(a, b)| [a.as_str(), b.as_str()]).collect(),
        };

        let response = self
            .client
            .post(format!("{}/predict", self.base_url))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if is_exhaustion(status) {
            return Err(BoundaryError::ResourceExhausted {
                batch_size: pairs.len(),
            });
        }
        let text = response.text().await?;
        if !status.is_success() {
            tracing::error!("boundary model error {status}: {text}");
            return Err(BoundaryError::Other(format!(
                "boundary request failed (status {status})"
            )));
        }

        let resp: PredictResponse = serde_json::from_str(&text)?;
        if resp.predictions.len() != pairs.len() {
            return Err(BoundaryError::Mismatch {
                expected: pairs.len(),
                got: resp.predictions.len(),
            });
        }

        Ok(resp
            .predictions
            .into_iter()
            .map(|(label, continuation)| BoundaryPrediction {
                label,
                continuation,
            })
            .collect())
    }
}

impl BoundaryScorer for HttpBoundaryScorer {
    fn score_boundaries<'a>(
        &'a self,
        pairs: &'a [(String, String)],
    ) -> BoxFuture<'a, Result<Vec<BoundaryPrediction>, BoundaryError>> {
        Box::pin(self.predict(pairs))
    }
}
