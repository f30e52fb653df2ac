//! Ingestion knobs read from the environment.

use std::path::PathBuf;

use crate::errors::IngestError;

#[derive(Clone, Debug, PartialEq)]
pub struct IngestConfig {
    /// Chunk size in characters.
    pub chunk_size: usize,
    /// Characters shared by consecutive chunks.
    pub chunk_overlap: usize,
    /// Where uploaded files are stored (`UPLOAD_DIR`).
    pub upload_dir: PathBuf,
    /// Snapshot directory (`INDEX_PERSIST_DIR`); `None` disables the snapshot.
    pub index_persist_dir: Option<PathBuf>,
    /// Concurrent embedding calls per document.
    pub embed_concurrency: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1024,
            chunk_overlap: 200,
            upload_dir: PathBuf::from("Data/uploads"),
            index_persist_dir: Some(PathBuf::from("storage/index")),
            embed_concurrency: 4,
        }
    }
}

impl IngestConfig {
    /// Chunking comes from the provider settings; paths from the environment.
    pub fn from_env(chunk_size: usize, chunk_overlap: usize) -> Result<Self, IngestError> {
        Self::from_lookup(chunk_size, chunk_overlap, |k| std::env::var(k).ok())
    }

    /// An explicitly empty `INDEX_PERSIST_DIR` disables the snapshot.
    pub fn from_lookup<F>(
        chunk_size: usize,
        chunk_overlap: usize,
        lookup: F,
    ) -> Result<Self, IngestError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self {
            chunk_size,
            chunk_overlap,
            ..Self::default()
        };
        if let Some(dir) = lookup("UPLOAD_DIR").filter(|v| !v.trim().is_empty()) {
            cfg.upload_dir = PathBuf::from(dir.trim());
        }
        if let Some(dir) = lookup("INDEX_PERSIST_DIR") {
            cfg.index_persist_dir = match dir.trim() {
                "" => None,
                d => Some(PathBuf::from(d)),
            };
        }
        if let Some(n) = lookup("EMBED_CONCURRENCY").filter(|v| !v.trim().is_empty()) {
            cfg.embed_concurrency = n
                .trim()
                .parse()
                .map_err(|_| IngestError::Config(format!("EMBED_CONCURRENCY is not a number: {n}")))?;
        }
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), IngestError> {
        if self.chunk_size == 0 {
            return Err(IngestError::Config("chunk_size must be > 0".into()));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(IngestError::Config(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        if self.embed_concurrency == 0 {
            return Err(IngestError::Config("embed_concurrency must be > 0".into()));
        }
        Ok(())
    }
}
