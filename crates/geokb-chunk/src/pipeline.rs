use std::path::PathBuf;
use std::sync::Arc;

use crate::boundary::{self, BoundaryScorer, DEFAULT_BATCH_SIZE, DEFAULT_MAX_WINDOW};
use crate::error::Result;
use crate::merger::ChunkAssembler;
use crate::outline::{SectionBlock, parse_outline};
use crate::sentence::segment;
use crate::splitter::split_run;
use crate::store::ChunkStore;
use crate::tokenizer::TokenCounter;
use crate::types::{ChunkRecord, Document, ScoredSentence};

/// Default chunk token budget.
pub const DEFAULT_MAX_SIZE: usize = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkerConfig {
    /// Token budget per chunk.
    pub max_size: usize,
    /// Sentence pairs per boundary-scorer call.
    pub batch_size: usize,
    /// Joint token window of the boundary model.
    pub max_window: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            max_size: DEFAULT_MAX_SIZE,
            batch_size: DEFAULT_BATCH_SIZE,
            max_window: DEFAULT_MAX_WINDOW,
        }
    }
}

/// Turns documents into budgeted chunk records: outline, sentences,
/// boundary scores, recursive split, greedy merge.
pub struct DocumentChunker {
    config: ChunkerConfig,
    counter: Arc<dyn TokenCounter>,
    scorer: Arc<dyn BoundaryScorer>,
}

impl std::fmt::Debug for DocumentChunker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentChunker")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl DocumentChunker {
    #[must_use]
    pub fn new(
        config: ChunkerConfig,
        counter: Arc<dyn TokenCounter>,
        scorer: Arc<dyn BoundaryScorer>,
    ) -> Self {
        Self {
            config,
            counter,
            scorer,
        }
    }

    #[must_use]
    pub fn config(&self) -> &ChunkerConfig {
        &self.config
    }

    #[must_use]
    pub fn counter(&self) -> &dyn TokenCounter {
        self.counter.as_ref()
    }

    /// Chunk a document. Every record carries `chunk_path` as its store id.
    ///
    /// # Errors
    ///
    /// Returns `ChunkError::Boundary` if boundary scoring fails after retries;
    /// no records are produced for the document in that case.
    pub async fn chunk(&self, document: &Document, chunk_path: &str) -> Result<Vec<ChunkRecord>> {
        let outline = parse_outline(&document.content);
        let mut assembler = ChunkAssembler::new(
            outline.title.clone(),
            document.source.clone(),
            chunk_path,
            self.config.max_size,
        );

        for block in outline.into_sections() {
            self.chunk_section(&mut assembler, &block).await?;
        }

        let records = assembler.finish();
        tracing::info!(source = %document.source, chunks = records.len(), "document chunked");
        Ok(records)
    }

    async fn chunk_section(&self, assembler: &mut ChunkAssembler, block: &SectionBlock) -> Result<()> {
        let text = block.text();
        let total = self.counter.count(&text);
        if total <= self.config.max_size {
            assembler.push_chunk(&block.path, text, total);
            return Ok(());
        }

        let sentences = segment(&text);
        let scores = boundary::score_sentences(
            self.scorer.as_ref(),
            self.counter.as_ref(),
            &sentences,
            self.config.batch_size,
            self.config.max_window,
        )
        .await?;

        let run: Vec<ScoredSentence> = sentences
            .into_iter()
            .zip(scores)
            .enumerate()
            .map(|(position, (text, boundary))| ScoredSentence {
                position,
                tokens: self.counter.count(&text),
                text,
                boundary,
            })
            .collect();

        tracing::debug!(
            section = %block.path.section,
            sentences = run.len(),
            tokens = total,
            "splitting oversized section"
        );
        let fragments = split_run(&run, self.config.max_size);
        assembler.push_fragments(&block.path, &fragments);
        Ok(())
    }

    /// Chunk a document and write its chunk store, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns an error if chunking fails or the store cannot be written.
    pub async fn ingest(
        &self,
        document: &Document,
        store: &ChunkStore,
    ) -> Result<(PathBuf, Vec<ChunkRecord>)> {
        let path = store.path_for(&document.source)?;
        let records = self.chunk(document, &path.display().to_string()).await?;
        store.write(&path, &records).await?;
        Ok((path, records))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boundary::LexicalBoundaryScorer;
    use crate::boundary::tests::ScriptedScorer;
    use crate::error::ChunkError;
    use crate::tokenizer::WordTokenCounter;

    fn chunker(max_size: usize, scorer: Arc<dyn BoundaryScorer>) -> DocumentChunker {
        DocumentChunker::new(
            ChunkerConfig {
                max_size,
                ..ChunkerConfig::default()
            },
            Arc::new(WordTokenCounter),
            scorer,
        )
    }

    fn doc(content: &str) -> Document {
        Document {
            content: content.to_owned(),
            source: "papers/delta.md".to_owned(),
        }
    }

    #[tokio::test]
    async fn section_within_budget_is_single_chunk() {
        let content = "# Delta Formation\n## Introduction\nDeltas form where rivers meet the sea.\nSediment accumulates.";
        let records = chunker(512, Arc::new(LexicalBoundaryScorer::default()))
            .chunk(&doc(content), "split_chunks/delta.jsonl")
            .await
            .unwrap();
        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r.title, "Delta Formation");
        assert_eq!(r.section, "Introduction");
        assert_eq!(r.source, "papers/delta.md");
        assert_eq!(r.chunk_path, "split_chunks/delta.jsonl");
        assert_eq!(
            r.text,
            "Deltas form where rivers meet the sea.\nSediment accumulates."
        );
        assert_eq!(r.length, 9);
    }

    #[tokio::test]
    async fn oversized_section_splits_at_lowest_score() {
        let sentences: Vec<String> = (0..6).map(|i| format!("Layer {i} holds silt.")).collect();
        let content = format!("## Results\n{}", sentences.join(" "));
        let scorer = Arc::new(ScriptedScorer::new(vec![("Layer 3 holds silt.", 0.05)]));
        let records = chunker(12, scorer).chunk(&doc(&content), "x").await.unwrap();

        let texts: Vec<_> = records.iter().map(|r| r.text.as_str()).collect();
        assert_eq!(
            texts,
            vec![
                "Layer 0 holds silt. Layer 1 holds silt. Layer 2 holds silt.",
                "Layer 3 holds silt. Layer 4 holds silt. Layer 5 holds silt.",
            ]
        );
        assert!(records.iter().all(|r| r.length == 12));
    }

    #[tokio::test]
    async fn boundary_failure_aborts_document() {
        let scorer = Arc::new(ScriptedScorer {
            capacity: 0,
            ..ScriptedScorer::new(vec![])
        });
        let content = format!("## Methods\n{}", "Core sample taken. ".repeat(20));
        let err = chunker(10, scorer)
            .chunk(&doc(&content), "x")
            .await
            .unwrap_err();
        assert!(matches!(err, ChunkError::Boundary(_)));
    }

    #[tokio::test]
    async fn references_are_not_chunked() {
        let content = "## Introduction\nBody text.\n## References\nSmith, 2001.";
        let records = chunker(512, Arc::new(LexicalBoundaryScorer::default()))
            .chunk(&doc(content), "x")
            .await
            .unwrap();
        assert_eq!(records.len(), 1);
        assert!(!records[0].text.contains("Smith"));
    }

    #[tokio::test]
    async fn empty_document_has_no_chunks() {
        let records = chunker(512, Arc::new(LexicalBoundaryScorer::default()))
            .chunk(&doc(""), "x")
            .await
            .unwrap();
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn ingest_writes_store_named_after_source() {
        let dir = tempfile::tempdir().unwrap();
        let store = ChunkStore::new(dir.path());
        let (path, records) = chunker(512, Arc::new(LexicalBoundaryScorer::default()))
            .ingest(&doc("## Introduction\nShort text."), &store)
            .await
            .unwrap();

        assert_eq!(path, dir.path().join("delta.jsonl"));
        assert_eq!(records[0].chunk_path, path.display().to_string());
        assert_eq!(ChunkStore::load(&path).await.unwrap(), records);
    }
}
