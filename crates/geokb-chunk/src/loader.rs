use std::path::Path;

use crate::error::{ChunkError, Result};
use crate::types::Document;

/// Largest document accepted for ingestion.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 50 * 1024 * 1024;

const SUPPORTED_EXTENSIONS: [&str; 3] = ["txt", "md", "markdown"];

/// Reads plain-text and markdown documents from disk.
#[derive(Debug, Clone, Copy)]
pub struct TextLoader {
    pub max_file_size: u64,
}

impl Default for TextLoader {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }
}

impl TextLoader {
    #[must_use]
    pub fn supported_extensions(&self) -> &[&str] {
        &SUPPORTED_EXTENSIONS
    }

    #[must_use]
    pub fn supports(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| SUPPORTED_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
    }

    /// Load a document; its source is the canonical path.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedFormat` for other extensions, `FileTooLarge` above
    /// `max_file_size`, or an IO error.
    pub async fn load(&self, path: &Path) -> Result<Document> {
        if !self.supports(path) {
            return Err(ChunkError::UnsupportedFormat(path.display().to_string()));
        }
        let path = tokio::fs::canonicalize(path).await?;

        let meta = tokio::fs::metadata(&path).await?;
        if meta.len() > self.max_file_size {
            return Err(ChunkError::FileTooLarge(meta.len()));
        }

        let content = tokio::fs::read_to_string(&path).await?;
        Ok(Document {
            content,
            source: path.display().to_string(),
        })
    }
}
