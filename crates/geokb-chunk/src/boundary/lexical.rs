use std::collections::HashSet;

use super::{BoundaryError, BoundaryPrediction, BoundaryScorer, BoxFuture};

/// Offline scorer: continuation probability is the Jaccard overlap of the
/// two sentences' lowercase word sets, lifted by `floor`.
///
/// Used when no boundary model URL is configured. It splits where adjacent
/// sentences share the least vocabulary.
#[derive(Debug, Clone, Copy)]
pub struct LexicalBoundaryScorer {
    floor: f32,
}

impl Default for LexicalBoundaryScorer {
    fn default() -> Self {
        Self { floor: 0.1 }
    }
}

fn words(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.len() > 2)
        .map(str::to_lowercase)
        .collect()
}

#[allow(clippy::cast_precision_loss)]
fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f32 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f32 / union as f32
}

impl LexicalBoundaryScorer {
    #[must_use]
    pub fn new(floor: f32) -> Self {
        Self {
            floor: floor.clamp(0.0, 1.0),
        }
    }

    fn predict(&self, prev: &str, next: &str) -> BoundaryPrediction {
        let overlap = jaccard(&words(prev), &words(next));
        let continuation = self.floor + (1.0 - self.floor) * overlap;
        BoundaryPrediction {
            label: u8::from(continuation < 0.5),
            continuation,
        }
    }
}

impl BoundaryScorer for LexicalBoundaryScorer {
    fn score_boundaries<'a>(
        &'a self,
        pairs: &'a [(String, String)],
    ) -> BoxFuture<'a, Result<Vec<BoundaryPrediction>, BoundaryError>> {
        Box::pin(async move {
            Ok(pairs
                .iter()
                .map(|(prev, next)| self.predict(prev, next))
                .collect())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_vocabulary_scores_higher() {
        let scorer = LexicalBoundaryScorer::default();
        let related = scorer.predict("Granite forms from magma.", "Granite magma cools slowly.");
        let unrelated = scorer.predict("Granite forms from magma.", "Rivers deposit silt downstream.");
        assert!(related.continuation > unrelated.continuation);
        assert!((unrelated.continuation - 0.1).abs() < f32::EPSILON);
        assert_eq!(unrelated.label, 1);
    }

    #[test]
    fn identical_sentences_are_fully_coherent() {
        let p = LexicalBoundaryScorer::default().predict("Basalt flows.", "basalt FLOWS");
        assert!((p.continuation - 1.0).abs() < f32::EPSILON);
        assert_eq!(p.label, 0);
    }

    #[tokio::test]
    async fn one_prediction_per_pair() {
        let pairs = vec![
            ("a b c".to_owned(), "d e f".to_owned()),
            ("x".to_owned(), "y".to_owned()),
        ];
        let out = LexicalBoundaryScorer::new(0.3)
            .score_boundaries(&pairs)
            .await
            .unwrap();
        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|p| (p.continuation - 0.3).abs() < f32::EPSILON));
    }
}
