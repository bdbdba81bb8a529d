use serde::{Deserialize, Serialize};

/// Raw input text plus the identifier of where it came from.
#[derive(Debug, Clone)]
pub struct Document {
    pub content: String,
    pub source: String,
}

/// `(section, subsection)` heading pair owned by one outline slot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SectionPath {
    pub section: String,
    pub subsection: String,
}

impl SectionPath {
    #[must_use]
    pub fn new(section: impl Into<String>, subsection: impl Into<String>) -> Self {
        Self {
            section: section.into(),
            subsection: subsection.into(),
        }
    }
}

/// One sentence of a section run, ready for splitting.
///
/// `boundary` is the continuation probability between this sentence and its
/// predecessor; lower values mark stronger split points. The first sentence of
/// a run carries `1.0` because it has no predecessor.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredSentence {
    pub position: usize,
    pub text: String,
    pub tokens: usize,
    pub boundary: f32,
}

/// The durable unit of retrieval, one line of a chunk store.
///
/// `index` is global across the whole document and never resets per section;
/// expansion keys on "same section, nearby index".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkRecord {
    pub title: String,
    pub section: String,
    pub subsection: String,
    pub source: String,
    pub index: usize,
    pub text: String,
    pub length: usize,
    #[serde(rename = "chunkPath", alias = "chunk_path", default)]
    pub chunk_path: String,
}

impl ChunkRecord {
    /// Comma-joined non-empty values of title, section and subsection.
    #[must_use]
    pub fn metadata_prefix(&self) -> String {
        [&self.title, &self.section, &self.subsection]
            .into_iter()
            .filter(|v| !v.is_empty())
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(",")
    }
}
