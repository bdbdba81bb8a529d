//! Greedy re-merging of split fragments into budgeted chunk records.

use crate::types::{ChunkRecord, ScoredSentence, SectionPath};

/// Assembles chunk records for one document, section by section.
///
/// The chunk index is global to the document: it keeps counting across
/// sections in the order they are pushed.
#[derive(Debug)]
pub struct ChunkAssembler {
    title: String,
    source: String,
    chunk_path: String,
    max_size: usize,
    next_index: usize,
    records: Vec<ChunkRecord>,
}

impl ChunkAssembler {
    #[must_use]
    pub fn new(
        title: impl Into<String>,
        source: impl Into<String>,
        chunk_path: impl Into<String>,
        max_size: usize,
    ) -> Self {
        Self {
            title: title.into(),
            source: source.into(),
            chunk_path: chunk_path.into(),
            max_size,
            next_index: 0,
            records: Vec::new(),
        }
    }

    /// Emit a chunk without merging, e.g. a whole section that already fits.
    pub fn push_chunk(&mut self, path: &SectionPath, text: String, length: usize) {
        self.records.push(ChunkRecord {
            title: self.title.clone(),
            section: path.section.clone(),
            subsection: path.subsection.clone(),
            source: self.source.clone(),
            index: self.next_index,
            text,
            length,
            chunk_path: self.chunk_path.clone(),
        });
        self.next_index += 1;
    }

    /// Greedily accumulate fragments while the running total stays within
    /// budget, emitting a chunk whenever the next fragment would overflow.
    pub fn push_fragments(&mut self, path: &SectionPath, fragments: &[&[ScoredSentence]]) {
        let mut running: Vec<&ScoredSentence> = Vec::new();
        let mut running_len = 0;

        for fragment in fragments {
            let fragment_len: usize = fragment.iter().map(|s| s.tokens).sum();
            if !running.is_empty() && running_len + fragment_len > self.max_size {
                self.emit(path, &running, running_len);
                running.clear();
                running_len = 0;
            }
            running.extend(fragment.iter());
            running_len += fragment_len;
        }

        if !running.is_empty() {
            self.emit(path, &running, running_len);
        }
    }

    fn emit(&mut self, path: &SectionPath, sentences: &[&ScoredSentence], length: usize) {
        let text = sentences
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        self.push_chunk(path, text, length);
    }

    #[must_use]
    pub fn finish(self) -> Vec<ChunkRecord> {
        self.records
    }
}
