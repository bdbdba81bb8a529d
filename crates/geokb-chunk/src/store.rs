//! Per-document chunk stores: one newline-delimited JSON file per source.
//!
//! Stores are write-once and read-many. A store is written to a temporary
//! file in the target directory and renamed into place, so readers never
//! observe a partially written document.

use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::error::{ChunkError, Result};
use crate::types::ChunkRecord;

const STORE_EXTENSION: &str = "jsonl";

#[derive(Debug, Clone)]
pub struct ChunkStore {
    dir: PathBuf,
}

impl ChunkStore {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Store file for a source, named after its base name without extension.
    ///
    /// # Errors
    ///
    /// Returns `ChunkError::InvalidStorePath` if the source has no file stem.
    pub fn path_for(&self, source: &str) -> Result<PathBuf> {
        let stem = Path::new(source)
            .file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ChunkError::InvalidStorePath(source.to_owned()))?;
        Ok(self.dir.join(format!("{stem}.{STORE_EXTENSION}")))
    }

    /// Atomically replace the store at `path` with `records`, in the given order.
    ///
    /// The file work runs on the blocking pool.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or the file cannot
    /// be written or renamed into place.
    pub async fn write(&self, path: &Path, records: &[ChunkRecord]) -> Result<()> {
        let parent = path.parent().unwrap_or(self.dir.as_path()).to_path_buf();
        let target = path.to_path_buf();
        let records = records.to_vec();
        let count = records.len();
        tokio::task::spawn_blocking(move || write_records(&parent, &target, &records))
            .await
            .map_err(|e| ChunkError::Io(std::io::Error::other(e)))??;

        tracing::info!(path = %path.display(), chunks = count, "chunk store written");
        Ok(())
    }

    /// Read every record of a store.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or a line is not a valid record.
    pub async fn load(path: &Path) -> Result<Vec<ChunkRecord>> {
        let content = tokio::fs::read_to_string(path).await?;
        parse_records(&content)
    }

    /// Delete the store at `path`; a missing file is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be removed.
    pub async fn remove(path: &Path) -> Result<()> {
        match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// All store files in the directory, sorted by path.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory exists but cannot be listed.
    pub async fn list(&self) -> Result<Vec<PathBuf>> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut paths = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == STORE_EXTENSION) {
                paths.push(path);
            }
        }
        paths.sort();
        Ok(paths)
    }
}

fn write_records(parent: &Path, path: &Path, records: &[ChunkRecord]) -> Result<()> {
    std::fs::create_dir_all(parent)?;

    let mut tmp = NamedTempFile::new_in(parent)?;
    {
        let mut writer = std::io::BufWriter::new(tmp.as_file_mut());
        for record in records {
            serde_json::to_writer(&mut writer, record)?;
            writer.write_all(b"\n")?;
        }
        writer.flush()?;
    }
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| ChunkError::Io(e.error))?;
    Ok(())
}

/// Parse newline-delimited records, skipping blank lines.
///
/// # Errors
///
/// Returns `ChunkError::Json` on the first malformed line.
pub fn parse_records(content: &str) -> Result<Vec<ChunkRecord>> {
    content
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| serde_json::from_str(l).map_err(ChunkError::from))
        .collect()
}
