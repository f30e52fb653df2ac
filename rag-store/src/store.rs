//! The `VectorStore` seam used by the ingestion and query pipelines.

use std::{future::Future, pin::Pin};

use crate::embed::check_dim;
use crate::errors::RagError;
use crate::record::{ChunkRecord, RagFilter, RagHit};

/// Boxed future returned by [`VectorStore`] methods.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, RagError>> + Send + 'a>>;

/// Collection-scoped chunk storage with similarity search.
pub trait VectorStore: Send + Sync {
    fn collection(&self) -> &str;

    /// Dimensionality every stored vector must have.
    fn dim(&self) -> usize;

    /// Create the collection if it does not exist. Returns `true` when it was created.
    fn ensure_collection(&self) -> StoreFuture<'_, bool>;

    /// Drop every stored chunk and recreate the empty collection.
    fn reset_collection(&self) -> StoreFuture<'_, ()>;

    /// Write chunks (with embeddings). Nothing is written if any vector is
    /// missing or has the wrong size.
    fn upsert_chunks<'a>(&'a self, chunks: &'a [ChunkRecord]) -> StoreFuture<'a, usize>;

    /// Top-K nearest chunks under an optional filter, best first.
    fn search<'a>(
        &'a self,
        vector: Vec<f32>,
        top_k: u64,
        filter: Option<&'a RagFilter>,
    ) -> StoreFuture<'a, Vec<RagHit>>;
}

/// Check every chunk before a write: embedding present and sized `dim`.
pub fn validate_chunks(chunks: &[ChunkRecord], dim: usize) -> Result<(), RagError> {
    for c in chunks {
        let v = c
            .embedding
            .as_deref()
            .ok_or_else(|| RagError::MissingEmbedding(c.point_id()))?;
        check_dim(v, dim)?;
    }
    Ok(())
}
