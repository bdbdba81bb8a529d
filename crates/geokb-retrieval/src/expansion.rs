//! Context expansion: grow each selected chunk into a token-budgeted window
//! of neighbouring chunks from the same section.
//!
//! Each candidate is expanded by its own task. The caller waits on the tasks
//! in rank order, each for at most the configured timeout; a task that runs
//! over is aborted and its candidate is returned unexpanded. Expansion never
//! fails a query.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use geokb_chunk::{ChunkRecord, ChunkStore};
use tokio::task::JoinHandle;

use crate::BoxFuture;
use crate::types::{ExpandedChunk, ScoredChunk};

/// How long an aborted worker is given to wind down before it is abandoned.
const REAP_TIMEOUT: Duration = Duration::from_secs(1);

/// Source of a document's persisted chunk records, keyed by `chunk_path`.
pub trait ChunkLookup: Send + Sync {
    fn load<'a>(&'a self, chunk_path: &'a str) -> BoxFuture<'a, geokb_chunk::Result<Vec<ChunkRecord>>>;
}

/// Reads chunk stores from disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct StoreLookup;

impl ChunkLookup for StoreLookup {
    fn load<'a>(&'a self, chunk_path: &'a str) -> BoxFuture<'a, geokb_chunk::Result<Vec<ChunkRecord>>> {
        Box::pin(ChunkStore::load(Path::new(chunk_path)))
    }
}

/// Indices (ascending) of the window grown around `center`.
///
/// `lengths` maps each available chunk index of the section to its token
/// length. Radius `k` looks at `center - k` and then `center + k`, within the
/// section's index range; offsets missing from `lengths` are passed over. The
/// first neighbour that would push the running total past `budget` stops
/// growth entirely.
#[must_use]
pub fn expand_window(
    center: usize,
    center_len: usize,
    lengths: &BTreeMap<usize, usize>,
    budget: usize,
) -> Vec<usize> {
    let mut included = BTreeSet::from([center]);
    let (Some(&lo), Some(&hi)) = (lengths.keys().next(), lengths.keys().next_back()) else {
        return vec![center];
    };

    let mut running = center_len;
    let max_radius = center.saturating_sub(lo).max(hi.saturating_sub(center));
    'grow: for k in 1..=max_radius {
        let below = center.checked_sub(k).filter(|i| *i >= lo);
        let above = center.checked_add(k).filter(|i| *i <= hi);
        for offset in [below, above].into_iter().flatten() {
            let Some(&len) = lengths.get(&offset) else {
                continue;
            };
            if running + len > budget {
                break 'grow;
            }
            included.insert(offset);
            running += len;
        }
    }

    included.into_iter().collect()
}

/// Expand one candidate against its chunk store. Any lookup problem yields
/// the candidate unexpanded.
async fn expand_one(lookup: Arc<dyn ChunkLookup>, chunk: ScoredChunk, budget: usize) -> ExpandedChunk {
    let records = match lookup.load(&chunk.record.chunk_path).await {
        Ok(records) => records,
        Err(e) => {
            tracing::warn!(
                chunk_path = %chunk.record.chunk_path,
                "chunk store unavailable, using unexpanded chunk: {e}"
            );
            return ExpandedChunk::unexpanded(chunk);
        }
    };

    let section: BTreeMap<usize, &ChunkRecord> = records
        .iter()
        .filter(|r| r.section == chunk.record.section)
        .map(|r| (r.index, r))
        .collect();
    if !section.contains_key(&chunk.record.index) {
        tracing::warn!(
            chunk_path = %chunk.record.chunk_path,
            index = chunk.record.index,
            "chunk missing from its store, using unexpanded chunk"
        );
        return ExpandedChunk::unexpanded(chunk);
    }

    let lengths: BTreeMap<usize, usize> = section.iter().map(|(i, r)| (*i, r.length)).collect();
    let window = expand_window(chunk.record.index, chunk.record.length, &lengths, budget);
    let text = window
        .iter()
        .filter_map(|i| section.get(i))
        .map(|r| r.text.as_str())
        .collect::<Vec<_>>()
        .join("\n");

    ExpandedChunk {
        record: chunk.record,
        score: chunk.score,
        text,
        window,
    }
}

/// Aborts every worker still running when dropped.
struct Workers(Vec<JoinHandle<ExpandedChunk>>);

impl Drop for Workers {
    fn drop(&mut self) {
        for handle in &self.0 {
            handle.abort();
        }
    }
}

pub struct ContextExpander {
    lookup: Arc<dyn ChunkLookup>,
    expand_range: usize,
    timeout: Duration,
}

impl std::fmt::Debug for ContextExpander {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextExpander")
            .field("expand_range", &self.expand_range)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl ContextExpander {
    #[must_use]
    pub fn new(lookup: Arc<dyn ChunkLookup>, expand_range: usize, timeout: Duration) -> Self {
        Self {
            lookup,
            expand_range,
            timeout,
        }
    }

    /// Expand every chunk, returning one result per input in the same order.
    pub async fn expand_all(&self, ranked: Vec<ScoredChunk>) -> Vec<ExpandedChunk> {
        if self.expand_range == 0 {
            return ranked.into_iter().map(ExpandedChunk::unexpanded).collect();
        }

        let start = Instant::now();
        let mut workers = Workers(
            ranked
                .iter()
                .map(|chunk| {
                    tokio::spawn(expand_one(
                        Arc::clone(&self.lookup),
                        chunk.clone(),
                        self.expand_range,
                    ))
                })
                .collect(),
        );

        let mut results = Vec::with_capacity(ranked.len());
        for (handle, chunk) in workers.0.iter_mut().zip(ranked) {
            let expanded = match tokio::time::timeout(self.timeout, &mut *handle).await {
                Ok(Ok(expanded)) => expanded,
                Ok(Err(e)) => {
                    tracing::warn!(index = chunk.record.index, "expansion worker failed: {e}");
                    ExpandedChunk::unexpanded(chunk)
                }
                Err(_) => {
                    tracing::warn!(
                        index = chunk.record.index,
                        timeout_secs = self.timeout.as_secs_f64(),
                        "expansion timed out, using unexpanded chunk"
                    );
                    handle.abort();
                    reap(handle, chunk.record.index).await;
                    ExpandedChunk::unexpanded(chunk)
                }
            };
            results.push(expanded);
        }

        tracing::info!(
            chunks = results.len(),
            elapsed_ms = start.elapsed().as_millis(),
            "context expansion finished"
        );
        results
    }
}

async fn reap(handle: &mut JoinHandle<ExpandedChunk>, index: usize) {
    match tokio::time::timeout(REAP_TIMEOUT, handle).await {
        Ok(Err(e)) if e.is_cancelled() => tracing::debug!(index, "expansion worker reaped"),
        Ok(Err(e)) => tracing::warn!(index, "expansion worker failed while aborting: {e}"),
        Ok(Ok(_)) => tracing::debug!(index, "expansion worker finished before abort"),
        Err(_) => tracing::warn!(index, "expansion worker did not stop after abort"),
    }
}
