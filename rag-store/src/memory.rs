//! In-memory [`VectorStore`]: a brute-force cosine scan over a map of points.
//!
//! Used with `VECTOR_BACKEND=memory` for local development and as the store
//! double in pipeline and route tests. Not an index.

use std::collections::BTreeMap;

use tokio::sync::RwLock;

use crate::errors::RagError;
use crate::record::{ChunkRecord, RagFilter, RagHit};
use crate::store::{StoreFuture, VectorStore, validate_chunks};

#[derive(Debug)]
pub struct MemoryStore {
    collection: String,
    dim: usize,
    /// `None` until the collection is created.
    points: RwLock<Option<BTreeMap<String, ChunkRecord>>>,
}

impl MemoryStore {
    pub fn new(collection: impl Into<String>, dim: usize) -> Self {
        Self {
            collection: collection.into(),
            dim,
            points: RwLock::new(None),
        }
    }

    /// Number of stored chunks (0 when the collection does not exist).
    pub async fn len(&self) -> usize {
        self.points.read().await.as_ref().map_or(0, BTreeMap::len)
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl VectorStore for MemoryStore {
    fn collection(&self) -> &str {
        &self.collection
    }

    fn dim(&self) -> usize {
        self.dim
    }

    fn ensure_collection(&self) -> StoreFuture<'_, bool> {
        Box::pin(async move {
            let mut points = self.points.write().await;
            if points.is_some() {
                return Ok(false);
            }
            *points = Some(BTreeMap::new());
            Ok(true)
        })
    }

    fn reset_collection(&self) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            *self.points.write().await = Some(BTreeMap::new());
            Ok(())
        })
    }

    fn upsert_chunks<'a>(&'a self, chunks: &'a [ChunkRecord]) -> StoreFuture<'a, usize> {
        Box::pin(async move {
            validate_chunks(chunks, self.dim)?;
            let mut guard = self.points.write().await;
            let points = guard
                .as_mut()
                .ok_or_else(|| RagError::MissingCollection(self.collection.clone()))?;
            for c in chunks {
                points.insert(c.point_id(), c.clone());
            }
            Ok(chunks.len())
        })
    }

    fn search<'a>(
        &'a self,
        vector: Vec<f32>,
        top_k: u64,
        filter: Option<&'a RagFilter>,
    ) -> StoreFuture<'a, Vec<RagHit>> {
        Box::pin(async move {
            let guard = self.points.read().await;
            let Some(points) = guard.as_ref() else {
                return Ok(Vec::new());
            };

            let mut hits: Vec<RagHit> = points
                .values()
                .filter_map(|c| {
                    let payload = c.payload();
                    if filter.is_some_and(|f| !f.matches(&payload)) {
                        return None;
                    }
                    let v = c.embedding.as_deref()?;
                    Some(RagHit::from_payload(cosine(v, &vector), payload))
                })
                .collect();

            hits.sort_by(|a, b| b.score.total_cmp(&a.score));
            hits.truncate(top_k as usize);
            Ok(hits)
        })
    }
}

/// Cosine similarity; 0.0 when either vector has zero norm.
pub fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let na = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let nb = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if na == 0.0 || nb == 0.0 {
        0.0
    } else {
        dot / (na * nb)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(doc: &str, source: &str, idx: usize, v: Vec<f32>) -> ChunkRecord {
        ChunkRecord {
            doc_id: doc.into(),
            source: source.into(),
            page_label: Some("1".into()),
            chunk_index: idx,
            text: format!("{source} #{idx}"),
            embedding: Some(v),
        }
    }

    #[tokio::test]
    async fn ensure_is_idempotent_and_reset_clears() {
        let store = MemoryStore::new("docs", 2);
        assert!(store.ensure_collection().await.unwrap());
        assert!(!store.ensure_collection().await.unwrap());

        store
            .upsert_chunks(&[chunk("d1", "a.pdf", 0, vec![1.0, 0.0])])
            .await
            .unwrap();
        assert_eq!(store.len().await, 1);

        store.ensure_collection().await.unwrap();
        assert_eq!(store.len().await, 1, "ensure must not clear data");

        store.reset_collection().await.unwrap();
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn wrong_dimension_writes_nothing() {
        let store = MemoryStore::new("docs", 2);
        store.ensure_collection().await.unwrap();
        let err = store
            .upsert_chunks(&[
                chunk("d1", "a.pdf", 0, vec![1.0, 0.0]),
                chunk("d1", "a.pdf", 1, vec![1.0, 0.0, 0.0]),
            ])
            .await
            .unwrap_err();
        assert!(matches!(err, RagError::VectorSizeMismatch { got: 3, want: 2 }));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn search_ranks_and_filters() {
        let store = MemoryStore::new("docs", 2);
        store.ensure_collection().await.unwrap();
        store
            .upsert_chunks(&[
                chunk("d1", "a.pdf", 0, vec![1.0, 0.0]),
                chunk("d1", "a.pdf", 1, vec![0.7, 0.7]),
                chunk("d2", "b.pdf", 0, vec![0.9, 0.1]),
            ])
            .await
            .unwrap();

        let hits = store.search(vec![1.0, 0.0], 2, None).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].doc_id.as_deref(), Some("d1"));
        assert_eq!(hits[1].doc_id.as_deref(), Some("d2"));

        let only_d2 = RagFilter::eq("doc_id", "d2");
        let hits = store.search(vec![1.0, 0.0], 5, Some(&only_d2)).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert!(hits.iter().all(|h| h.source.as_deref() == Some("b.pdf")));
    }

    #[tokio::test]
    async fn search_before_create_is_empty() {
        let store = MemoryStore::new("docs", 2);
        assert!(store.search(vec![1.0, 0.0], 3, None).await.unwrap().is_empty());
    }

    #[test]
    fn cosine_handles_zero_vectors() {
        assert_eq!(cosine(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert!((cosine(&[2.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
    }
}
