//! Vector-store connector for document chunks.
//!
//! - [`RagStore`]: the Qdrant-backed [`VectorStore`] (create-if-absent
//!   collection, keyword indexes on `doc_id`/`source`, validated upserts,
//!   filtered search).
//! - [`MemoryStore`]: brute-force in-memory double with the same contract.
//! - [`EmbeddingsProvider`] / [`LlmEmbedder`]: the embedding seam.
//! - [`RagFilter::scope`]: query scoping with `doc_id` precedence.

mod config;
mod embed;
mod errors;
mod filters;
mod memory;
mod qdrant_facade;
mod record;
mod retrieve;
mod store;

pub use config::{DistanceKind, RagConfig, StoreBackend};
pub use embed::{EMBED_BATCH, EmbeddingsProvider, LlmEmbedder, embed_chunks};
pub use errors::RagError;
pub use memory::{MemoryStore, cosine};
pub use record::{ChunkRecord, RagFilter, RagHit, RagQuery};
pub use retrieve::rag_context;
pub use store::{StoreFuture, VectorStore, validate_chunks};

use std::sync::Arc;

use qdrant_client::qdrant::PointStruct;
use tracing::{info, trace};

/// Qdrant-backed chunk store.
pub struct RagStore {
    cfg: RagConfig,
    client: qdrant_facade::QdrantFacade,
}

impl RagStore {
    /// Builds the Qdrant client. Does not touch the network.
    ///
    /// # Errors
    /// `RagError::Config` on invalid config, `RagError::Qdrant` if the client cannot be built.
    pub fn connect(cfg: RagConfig) -> Result<Self, RagError> {
        trace!(collection = %cfg.collection, url = %cfg.qdrant_url, "RagStore::connect");
        let client = qdrant_facade::QdrantFacade::new(&cfg)?;
        Ok(Self { cfg, client })
    }

    pub fn config(&self) -> &RagConfig {
        &self.cfg
    }

    fn to_points(chunks: &[ChunkRecord]) -> Result<Vec<PointStruct>, RagError> {
        chunks
            .iter()
            .map(|c| {
                let vector = c
                    .embedding
                    .clone()
                    .ok_or_else(|| RagError::MissingEmbedding(c.point_id()))?;
                qdrant_facade::make_point(c.point_id(), vector, c.payload())
            })
            .collect()
    }
}

impl VectorStore for RagStore {
    fn collection(&self) -> &str {
        self.client.collection()
    }

    fn dim(&self) -> usize {
        self.client.dim()
    }

    fn ensure_collection(&self) -> StoreFuture<'_, bool> {
        Box::pin(async move {
            let created = self.client.ensure_collection().await?;
            if created {
                info!(collection = self.collection(), "collection created");
            }
            Ok(created)
        })
    }

    fn reset_collection(&self) -> StoreFuture<'_, ()> {
        Box::pin(async move { self.client.reset_collection().await })
    }

    fn upsert_chunks<'a>(&'a self, chunks: &'a [ChunkRecord]) -> StoreFuture<'a, usize> {
        Box::pin(async move {
            validate_chunks(chunks, self.dim())?;
            let mut total = 0;
            for batch in chunks.chunks(self.cfg.upsert_batch.max(1)) {
                total += self.client.upsert_points(Self::to_points(batch)?).await?;
            }
            Ok(total)
        })
    }

    fn search<'a>(
        &'a self,
        vector: Vec<f32>,
        top_k: u64,
        filter: Option<&'a RagFilter>,
    ) -> StoreFuture<'a, Vec<RagHit>> {
        Box::pin(async move {
            let qfilter = filter.map(filters::to_qdrant_filter);
            let hits = self.client.search(vector, top_k, qfilter).await?;
            Ok(hits
                .into_iter()
                .map(|(score, payload)| RagHit::from_payload(score, payload))
                .collect())
        })
    }
}

/// Open the store selected by `cfg.backend`.
pub fn open_store(cfg: RagConfig) -> Result<Arc<dyn VectorStore>, RagError> {
    match cfg.backend {
        StoreBackend::Qdrant => Ok(Arc::new(RagStore::connect(cfg)?)),
        StoreBackend::Memory => {
            info!(collection = %cfg.collection, "using in-memory vector store");
            Ok(Arc::new(MemoryStore::new(cfg.collection, cfg.dim)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(embedding: Option<Vec<f32>>) -> ChunkRecord {
        ChunkRecord {
            doc_id: "d".into(),
            source: "a.pdf".into(),
            page_label: None,
            chunk_index: 0,
            text: "t".into(),
            embedding,
        }
    }

    #[test]
    fn points_need_embeddings() {
        assert!(RagStore::to_points(&[chunk(Some(vec![0.1, 0.2]))]).is_ok());
        assert!(matches!(
            RagStore::to_points(&[chunk(None)]),
            Err(RagError::MissingEmbedding(_))
        ));
    }

    #[test]
    fn open_store_honours_backend() {
        let mut cfg = RagConfig::new_default("http://localhost:6334", "docs", 4);
        cfg.backend = StoreBackend::Memory;
        let store = open_store(cfg.clone()).unwrap();
        assert_eq!((store.collection(), store.dim()), ("docs", 4));

        cfg.backend = StoreBackend::Qdrant;
        assert!(open_store(cfg).is_ok());
    }
}
