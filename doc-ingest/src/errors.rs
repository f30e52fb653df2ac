use std::path::PathBuf;

use rag_store::RagError;
use thiserror::Error;

/// Errors of the ingestion pipeline. No variant is retried.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Extension we cannot extract text from.
    #[error("unsupported file type: {0}")]
    Unsupported(String),

    /// The document produced no text (image-only PDF, empty file).
    #[error("no extractable text in {0}")]
    EmptyDocument(String),

    #[error("pdf extraction failed for {file}: {reason}")]
    Pdf { file: String, reason: String },

    #[error("invalid ingest config: {0}")]
    Config(String),

    /// Snapshot (index JSONL) serialization.
    #[error("snapshot error: {0}")]
    Snapshot(#[from] serde_json::Error),

    /// Embedding or vector-store failure.
    #[error(transparent)]
    Store(#[from] RagError),
}

impl IngestError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
