use geokb_chunk::ChunkRecord;
use serde::Serialize;

/// A recalled chunk with its embedding-space distance (`1 - cosine`).
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub record: ChunkRecord,
    pub distance: f32,
}

/// A candidate after cross-encoder scoring.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredChunk {
    pub record: ChunkRecord,
    pub distance: f32,
    pub score: f32,
}

/// Final retrieval result: a selected chunk with the context grown around it.
///
/// `window` lists the chunk indices whose texts make up `text`, ascending. It
/// is just the chunk's own index when expansion was skipped or failed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExpandedChunk {
    pub record: ChunkRecord,
    pub score: f32,
    pub text: String,
    pub window: Vec<usize>,
}

impl ExpandedChunk {
    /// The chunk as recalled, with its rerank score attached.
    #[must_use]
    pub fn unexpanded(chunk: ScoredChunk) -> Self {
        Self {
            text: chunk.record.text.clone(),
            window: vec![chunk.record.index],
            score: chunk.score,
            record: chunk.record,
        }
    }

    #[must_use]
    pub fn is_expanded(&self) -> bool {
        self.window.len() > 1
    }
}
