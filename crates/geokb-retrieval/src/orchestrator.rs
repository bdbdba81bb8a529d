//! Recall, rerank, filter.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::{Result, RetrievalError};
use crate::recall::SimilaritySearch;
use crate::rerank::Reranker;
use crate::types::{Candidate, ScoredChunk};

pub const DEFAULT_VEC_RECALL_NUM: usize = 128;
pub const DEFAULT_TOP_K: usize = 3;
pub const DEFAULT_SCORE_THRESHOLD: f32 = 1.5;
pub const DEFAULT_EXPAND_RANGE: usize = 1024;
pub const DEFAULT_EXPAND_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq)]
pub struct RetrievalConfig {
    /// Candidates recalled from the vector index.
    pub vec_recall_num: usize,
    /// Maximum results kept after reranking.
    pub top_k: usize,
    /// Candidates scoring below this are dropped.
    pub score_threshold: f32,
    /// Prefix passages with title/section/subsection for the reranker.
    pub include_metadata: bool,
    /// Token budget of an expansion window; `0` disables expansion.
    pub expand_range: usize,
    pub expand_timeout: Duration,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            vec_recall_num: DEFAULT_VEC_RECALL_NUM,
            top_k: DEFAULT_TOP_K,
            score_threshold: DEFAULT_SCORE_THRESHOLD,
            include_metadata: true,
            expand_range: DEFAULT_EXPAND_RANGE,
            expand_timeout: DEFAULT_EXPAND_TIMEOUT,
        }
    }
}

/// Reranker input for each candidate, in recall order.
#[must_use]
pub fn rerank_pairs(query: &str, candidates: &[Candidate], include_metadata: bool) -> Vec<(String, String)> {
    candidates
        .iter()
        .map(|c| {
            let passage = if include_metadata {
                format!("{}\n{}", c.record.metadata_prefix(), c.record.text)
            } else {
                c.record.text.clone()
            };
            (query.to_owned(), passage)
        })
        .collect()
}

/// Attach scores and sort descending. The sort is stable, so equal scores
/// keep recall order.
#[must_use]
pub fn rank(candidates: Vec<Candidate>, scores: &[f32]) -> Vec<ScoredChunk> {
    let mut ranked: Vec<ScoredChunk> = candidates
        .into_iter()
        .zip(scores.iter().copied())
        .map(|(c, score)| ScoredChunk {
            record: c.record,
            distance: c.distance,
            score,
        })
        .collect();
    ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
    ranked
}

/// Drop scores below `threshold`, then keep at most `top_k`.
#[must_use]
pub fn select(ranked: Vec<ScoredChunk>, threshold: f32, top_k: usize) -> Vec<ScoredChunk> {
    ranked
        .into_iter()
        .filter(|c| c.score >= threshold)
        .take(top_k)
        .collect()
}

/// Sequences recall, rerank and filtering.
pub struct Retriever {
    index: Arc<dyn SimilaritySearch>,
    reranker: Arc<dyn Reranker>,
    config: RetrievalConfig,
}

impl std::fmt::Debug for Retriever {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Retriever")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Retriever {
    #[must_use]
    pub fn new(
        index: Arc<dyn SimilaritySearch>,
        reranker: Arc<dyn Reranker>,
        config: RetrievalConfig,
    ) -> Self {
        Self {
            index,
            reranker,
            config,
        }
    }

    #[must_use]
    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    /// Top reranked chunks for `query`. An empty result means no supporting
    /// context was found.
    ///
    /// # Errors
    ///
    /// Returns `RetrievalError::Recall` or `RetrievalError::Rerank` when a
    /// collaborator fails; no partial results are returned.
    pub async fn retrieve(&self, query: &str) -> Result<Vec<ScoredChunk>> {
        let start = Instant::now();
        let candidates = self
            .index
            .similarity_search(query, self.config.vec_recall_num)
            .await?;
        tracing::info!(
            candidates = candidates.len(),
            elapsed_ms = start.elapsed().as_millis(),
            "vector recall finished"
        );
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let start = Instant::now();
        let pairs = rerank_pairs(query, &candidates, self.config.include_metadata);
        let scores = self.reranker.compute_scores(&pairs).await?;
        if scores.len() != candidates.len() {
            return Err(RetrievalError::Rerank(format!(
                "expected {} scores, got {}",
                candidates.len(),
                scores.len()
            )));
        }
        let selected = select(
            rank(candidates, &scores),
            self.config.score_threshold,
            self.config.top_k,
        );
        tracing::info!(
            selected = selected.len(),
            elapsed_ms = start.elapsed().as_millis(),
            "rerank and filter finished"
        );
        Ok(selected)
    }
}

#[cfg(test)]
mod tests {
    use geokb_chunk::ChunkRecord;

    use super::*;
    use crate::BoxFuture;

    fn candidate(index: usize, text: &str) -> Candidate {
        Candidate {
            record: ChunkRecord {
                title: "Faults".into(),
                section: "Mechanics".into(),
                subsection: String::new(),
                source: "faults.md".into(),
                index,
                text: text.into(),
                length: 10,
                chunk_path: "faults.jsonl".into(),
            },
            distance: 0.25,
        }
    }

    struct FixedRecall(Vec<Candidate>);

    impl SimilaritySearch for FixedRecall {
        fn similarity_search<'a>(
            &'a self,
            _query: &'a str,
            k: usize,
        ) -> BoxFuture<'a, Result<Vec<Candidate>>> {
            Box::pin(async move { Ok(self.0.iter().take(k).cloned().collect()) })
        }
    }

    struct FailingRecall;

    impl SimilaritySearch for FailingRecall {
        fn similarity_search<'a>(
            &'a self,
            _query: &'a str,
            _k: usize,
        ) -> BoxFuture<'a, Result<Vec<Candidate>>> {
            Box::pin(async { Err(RetrievalError::Recall("index offline".into())) })
        }
    }

    /// Scores a passage by the number in its last word.
    struct TextScore;

    impl Reranker for TextScore {
        fn compute_scores<'a>(
            &'a self,
            pairs: &'a [(String, String)],
        ) -> BoxFuture<'a, Result<Vec<f32>>> {
            Box::pin(async move {
                Ok(pairs
                    .iter()
                    .map(|(_, p)| {
                        p.split_whitespace()
                            .last()
                            .and_then(|w| w.parse().ok())
                            .unwrap_or(0.0)
                    })
                    .collect())
            })
        }
    }

    struct FailingRerank;

    impl Reranker for FailingRerank {
        fn compute_scores<'a>(
            &'a self,
            _pairs: &'a [(String, String)],
        ) -> BoxFuture<'a, Result<Vec<f32>>> {
            Box::pin(async { Err(RetrievalError::Rerank("model offline".into())) })
        }
    }

    fn retriever(
        index: impl SimilaritySearch + 'static,
        reranker: impl Reranker + 'static,
    ) -> Retriever {
        Retriever::new(Arc::new(index), Arc::new(reranker), RetrievalConfig::default())
    }

    #[test]
    fn pairs_carry_metadata_prefix() {
        let pairs = rerank_pairs("why", &[candidate(0, "Slip happens.")], true);
        assert_eq!(pairs[0], ("why".into(), "Faults,Mechanics\nSlip happens.".into()));
        let plain = rerank_pairs("why", &[candidate(0, "Slip happens.")], false);
        assert_eq!(plain[0].1, "Slip happens.");
    }

    #[test]
    fn rank_is_stable_for_ties() {
        let candidates = (0..4).map(|i| candidate(i, "t")).collect();
        let ranked = rank(candidates, &[1.0, 3.0, 1.0, 3.0]);
        let order: Vec<_> = ranked.iter().map(|c| c.record.index).collect();
        assert_eq!(order, vec![1, 3, 0, 2]);
    }

    #[test]
    fn nan_score_never_survives_selection() {
        let candidates = (0..4).map(|i| candidate(i, "t")).collect();
        let ranked = rank(candidates, &[2.0, f32::NAN, 4.0, 2.0]);
        let order: Vec<_> = ranked
            .iter()
            .filter(|c| !c.score.is_nan())
            .map(|c| c.record.index)
            .collect();
        assert_eq!(order, vec![2, 0, 3]);

        let kept: Vec<_> = select(ranked, 1.5, 10).iter().map(|c| c.record.index).collect();
        assert_eq!(kept, vec![2, 0, 3]);
    }

    #[test]
    fn select_applies_threshold_then_top_k() {
        let candidates = (0..5).map(|i| candidate(i, "t")).collect();
        let ranked = rank(candidates, &[5.0, 4.0, 1.4, 3.0, 1.5]);
        let kept: Vec<_> = select(ranked.clone(), 1.5, 3)
            .iter()
            .map(|c| c.record.index)
            .collect();
        assert_eq!(kept, vec![0, 1, 3]);
        let all: Vec<_> = select(ranked, 1.5, 10).iter().map(|c| c.score).collect();
        assert_eq!(all, vec![5.0, 4.0, 3.0, 1.5]);
    }

    #[tokio::test]
    async fn retrieve_orders_by_rerank_score() {
        let r = retriever(
            FixedRecall(vec![
                candidate(0, "low 2"),
                candidate(1, "high 9"),
                candidate(2, "below 1"),
                candidate(3, "mid 4"),
            ]),
            TextScore,
        );
        let out = r.retrieve("q").await.unwrap();
        let order: Vec<_> = out.iter().map(|c| c.record.index).collect();
        assert_eq!(order, vec![1, 3, 0]);
    }

    #[tokio::test]
    async fn empty_recall_is_empty_result() {
        let r = retriever(FixedRecall(vec![]), FailingRerank);
        assert!(r.retrieve("q").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn recall_failure_aborts_query() {
        let r = retriever(FailingRecall, TextScore);
        assert!(matches!(r.retrieve("q").await, Err(RetrievalError::Recall(_))));
    }

    #[tokio::test]
    async fn rerank_failure_aborts_query() {
        let r = retriever(FixedRecall(vec![candidate(0, "x 3")]), FailingRerank);
        assert!(matches!(r.retrieve("q").await, Err(RetrievalError::Rerank(_))));
    }

    mod proptest_orchestrator {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn filtered_output_is_sorted_bounded_and_above_threshold(
                scores in prop::collection::vec(-5.0f32..10.0, 0..50),
                threshold in -2.0f32..5.0,
                top_k in 1usize..8,
            ) {
                let candidates = (0..scores.len()).map(|i| candidate(i, "t")).collect();
                let ranked = rank(candidates, &scores);
                for pair in ranked.windows(2) {
                    prop_assert!(pair[0].score >= pair[1].score);
                    if pair[0].score.to_bits() == pair[1].score.to_bits() {
                        prop_assert!(pair[0].record.index < pair[1].record.index);
                    }
                }
                let selected = select(ranked, threshold, top_k);
                prop_assert!(selected.len() <= top_k);
                prop_assert!(selected.iter().all(|c| c.score >= threshold));
            }
        }
    }
}
