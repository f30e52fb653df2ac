//! Document ingestion for the RAG index.
//!
//! A file is read ([`extract`]), cut into overlapping page-aware chunks
//! ([`chunker`]), embedded and upserted into a [`rag_store::VectorStore`]
//! by [`IngestPipeline`]. Each successful ingestion is also appended to a
//! local JSONL snapshot ([`snapshot`]).

pub mod chunker;
pub mod config;
pub mod errors;
pub mod extract;
#[cfg(any(test, feature = "test-util"))]
pub mod fixture;
pub mod pipeline;
pub mod progress;
pub mod snapshot;

pub use chunker::{chunk_pages, split_text};
pub use config::IngestConfig;
pub use errors::IngestError;
pub use extract::{FileKind, PageText, extract_file};
pub use pipeline::{DirReport, IngestPipeline, IngestReport, sanitize_filename, save_upload};
pub use progress::{IndicatifProgress, NoopProgress, Progress};
pub use snapshot::{IndexSnapshot, SnapshotEntry};
