//! Divide-and-conquer splitting of a sentence run at its weakest joint.

use crate::types::ScoredSentence;

fn total_tokens(run: &[ScoredSentence]) -> usize {
    run.iter().map(|s| s.tokens).sum()
}

/// Position (relative to `run`) of the lowest boundary score, ignoring the
/// first sentence. Ties resolve to the earliest position.
fn weakest_joint(run: &[ScoredSentence]) -> usize {
    let mut best = 1;
    for (i, sentence) in run.iter().enumerate().skip(2) {
        if sentence.boundary < run[best].boundary {
            best = i;
        }
    }
    best
}

/// Split `run` into fragments of at most `max_size` tokens, cutting each
/// oversized fragment at its weakest joint.
///
/// Fragments are returned in original sentence order and cover `run`
/// exactly. A single sentence is never subdivided, even when it alone
/// exceeds `max_size`. The cut is greedy per level, not a globally optimal
/// partition.
#[must_use]
pub fn split_run(run: &[ScoredSentence], max_size: usize) -> Vec<&[ScoredSentence]> {
    let mut fragments = Vec::new();
    // Right halves are pushed first so fragments pop in sentence order.
    let mut pending = vec![run];

    while let Some(current) = pending.pop() {
        if current.is_empty() {
            continue;
        }
        if current.len() == 1 || total_tokens(current) <= max_size {
            fragments.push(current);
            continue;
        }
        let (left, right) = current.split_at(weakest_joint(current));
        pending.push(right);
        pending.push(left);
    }

    fragments
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(spec: &[(usize, f32)]) -> Vec<ScoredSentence> {
        spec.iter()
            .enumerate()
            .map(|(position, &(tokens, boundary))| ScoredSentence {
                position,
                text: format!("s{position}"),
                tokens,
                boundary,
            })
            .collect()
    }

    fn positions(fragments: &[&[ScoredSentence]]) -> Vec<Vec<usize>> {
        fragments
            .iter()
            .map(|f| f.iter().map(|s| s.position).collect())
            .collect()
    }

    #[test]
    fn run_within_budget_is_one_fragment() {
        let sentences = run(&[(100, 1.0), (100, 0.1), (100, 0.5)]);
        assert_eq!(positions(&split_run(&sentences, 512)), vec![vec![0, 1, 2]]);
    }

    #[test]
    fn oversized_single_sentence_stays_whole() {
        let sentences = run(&[(900, 1.0)]);
        let fragments = split_run(&sentences, 512);
        assert_eq!(fragments.len(), 1);
        assert_eq!(fragments[0][0].tokens, 900);
    }

    #[test]
    fn first_sentence_boundary_is_ignored() {
        let sentences = run(&[(200, 0.0), (200, 0.4), (200, 0.2)]);
        assert_eq!(
            positions(&split_run(&sentences, 512)),
            vec![vec![0, 1], vec![2]]
        );
    }

    #[test]
    fn ties_cut_at_first_occurrence() {
        let sentences = run(&[(200, 1.0), (200, 0.3), (200, 0.3), (200, 0.9)]);
        assert_eq!(weakest_joint(&sentences), 1);
    }

    #[test]
    fn cuts_at_weakest_joint() {
        // Ten sentences of 80 tokens, weakest joint before position 5.
        let mut spec = vec![(80, 0.9); 10];
        spec[5].1 = 0.05;
        let sentences = run(&spec);
        let fragments = split_run(&sentences, 512);
        assert_eq!(
            positions(&fragments),
            vec![vec![0, 1, 2, 3, 4], vec![5, 6, 7, 8, 9]]
        );
        assert!(fragments.iter().all(|f| total_tokens(f) <= 512));
    }

    #[test]
    fn empty_run_has_no_fragments() {
        assert!(split_run(&[], 512).is_empty());
    }

    mod proptest_splitter {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn fragments_cover_run_in_order(
                spec in prop::collection::vec((1usize..300, 0.0f32..1.0), 0..60),
                max_size in 1usize..800,
            ) {
                let sentences = run(&spec);
                let fragments = split_run(&sentences, max_size);
                let flat: Vec<usize> = fragments.iter().flat_map(|f| f.iter().map(|s| s.position)).collect();
                prop_assert_eq!(flat, (0..spec.len()).collect::<Vec<_>>());
                for fragment in &fragments {
                    prop_assert!(!fragment.is_empty());
                    prop_assert!(fragment.len() == 1 || total_tokens(fragment) <= max_size);
                }
            }
        }
    }
}
