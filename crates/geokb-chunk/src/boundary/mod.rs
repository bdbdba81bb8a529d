//! Pairwise sentence-coherence scoring.
//!
//! A [`BoundaryScorer`] predicts, for adjacent sentences `(prev, next)`, the
//! probability that `next` continues `prev`. The splitter cuts where that
//! probability is lowest. Implementations are injected; the batching, window
//! and retry policy around them lives in [`score_sentences`].

mod http;
mod lexical;

use std::future::Future;
use std::pin::Pin;

pub use http::HttpBoundaryScorer;
pub use lexical::LexicalBoundaryScorer;

use crate::tokenizer::TokenCounter;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Score assigned where no prediction was made: maximally coherent, so the
/// position is never chosen as a split point.
pub const DO_NOT_SPLIT: f32 = 1.0;

/// Default number of pairs sent to the scorer at once.
pub const DEFAULT_BATCH_SIZE: usize = 64;

/// Default joint token window of the boundary model.
pub const DEFAULT_MAX_WINDOW: usize = 512;

#[derive(Debug, thiserror::Error)]
pub enum BoundaryError {
    /// The model ran out of memory or capacity for the requested batch.
    #[error("resource exhausted at batch size {batch_size}")]
    ResourceExhausted { batch_size: usize },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parse failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("expected {expected} predictions, got {got}")]
    Mismatch { expected: usize, got: usize },

    #[error("{0}")]
    Other(String),
}

/// Model output for one sentence pair.
///
/// `label` is the argmax class (`0` = continuation); `continuation` is the
/// probability of class `0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundaryPrediction {
    pub label: u8,
    pub continuation: f32,
}

pub trait BoundaryScorer: Send + Sync {
    /// Score each `(prev, next)` pair, returning one prediction per pair in order.
    fn score_boundaries<'a>(
        &'a self,
        pairs: &'a [(String, String)],
    ) -> BoxFuture<'a, Result<Vec<BoundaryPrediction>, BoundaryError>>;
}

/// Batch-size ladder used when the scorer reports resource exhaustion.
fn batch_ladder(batch_size: usize) -> [usize; 3] {
    let full = batch_size.max(1);
    [full, (full / 2).max(1), (full / 4).max(1)]
}

async fn score_in_batches(
    scorer: &dyn BoundaryScorer,
    pairs: &[(String, String)],
    batch_size: usize,
) -> Result<Vec<f32>, BoundaryError> {
    let mut scores = Vec::with_capacity(pairs.len());
    for batch in pairs.chunks(batch_size) {
        let predictions = scorer.score_boundaries(batch).await?;
        if predictions.len() != batch.len() {
            return Err(BoundaryError::Mismatch {
                expected: batch.len(),
                got: predictions.len(),
            });
        }
        scores.extend(predictions.iter().map(|p| p.continuation));
    }
    Ok(scores)
}

/// Boundary score for every sentence of a run; `scores[i]` belongs to the
/// joint between sentence `i - 1` and sentence `i`, and `scores[0]` is
/// [`DO_NOT_SPLIT`].
///
/// Pairs whose joint token length exceeds `max_window` are not sent to the
/// model and keep [`DO_NOT_SPLIT`]: an overlong pair can never become a split
/// point. On `ResourceExhausted` the whole run is retried at half, then a
/// quarter of `batch_size`.
///
/// # Errors
///
/// Returns the scorer's error when it is not `ResourceExhausted`, or
/// `ResourceExhausted` once the quarter batch size also fails.
pub async fn score_sentences(
    scorer: &dyn BoundaryScorer,
    counter: &dyn TokenCounter,
    sentences: &[String],
    batch_size: usize,
    max_window: usize,
) -> Result<Vec<f32>, BoundaryError> {
    let mut scores = vec![DO_NOT_SPLIT; sentences.len()];
    if sentences.len() < 2 {
        return Ok(scores);
    }

    let mut positions = Vec::new();
    let mut pairs = Vec::new();
    for (i, window) in sentences.windows(2).enumerate() {
        let joint = counter.count_pair(&window[0], &window[1]);
        if joint > max_window {
            tracing::debug!(
                position = i + 1,
                tokens = joint,
                "sentence pair exceeds boundary window, keeping as non-split point"
            );
            continue;
        }
        positions.push(i + 1);
        pairs.push((window[0].clone(), window[1].clone()));
    }
    if pairs.is_empty() {
        return Ok(scores);
    }

    let ladder = batch_ladder(batch_size);
    let mut last_err = None;
    for (attempt, size) in ladder.into_iter().enumerate() {
        match score_in_batches(scorer, &pairs, size).await {
            Ok(predicted) => {
                for (pos, score) in positions.into_iter().zip(predicted) {
                    scores[pos] = score;
                }
                return Ok(scores);
            }
            Err(BoundaryError::ResourceExhausted { batch_size }) => {
                tracing::warn!(
                    attempt = attempt + 1,
                    batch_size,
                    "boundary scorer exhausted resources, retrying with smaller batches"
                );
                last_err = Some(BoundaryError::ResourceExhausted { batch_size });
            }
            Err(e) => return Err(e),
        }
    }

    Err(last_err.unwrap_or(BoundaryError::ResourceExhausted {
        batch_size: ladder[2],
    }))
}
