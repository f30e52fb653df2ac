//! Embedding seam and the bounded-concurrency chunk embedder.

use std::{future::Future, pin::Pin, sync::Arc};

use ai_llm_service::LlmServiceProfiles;
use futures::stream::{self, StreamExt, TryStreamExt};
use tracing::debug;

use crate::{errors::RagError, record::ChunkRecord, store::StoreFuture};

/// Chunk texts sent per provider request by [`embed_chunks`].
pub const EMBED_BATCH: usize = 16;

/// Async embedding provider.
///
/// Implemented by [`LlmEmbedder`] for real providers and by deterministic
/// fakes in tests.
pub trait EmbeddingsProvider: Send + Sync {
    fn embed<'a>(
        &'a self,
        text: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<f32>, RagError>> + Send + 'a>>;

    /// Embed several texts, in input order. Defaults to one call per text.
    fn embed_batch<'a>(&'a self, texts: &'a [String]) -> StoreFuture<'a, Vec<Vec<f32>>> {
        Box::pin(async move {
            let mut out = Vec::with_capacity(texts.len());
            for t in texts {
                out.push(self.embed(t).await?);
            }
            Ok(out)
        })
    }

    /// Expected vector size, if known.
    fn dim(&self) -> Option<usize> {
        None
    }
}

/// Embeds through the shared [`LlmServiceProfiles`] embedding profile and
/// checks the dimensionality of every vector.
#[derive(Clone)]
pub struct LlmEmbedder {
    svc: Arc<LlmServiceProfiles>,
    dim: usize,
}

impl LlmEmbedder {
    pub fn new(svc: Arc<LlmServiceProfiles>, dim: usize) -> Self {
        Self { svc, dim }
    }
}

impl EmbeddingsProvider for LlmEmbedder {
    fn embed<'a>(
        &'a self,
        text: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<f32>, RagError>> + Send + 'a>> {
        Box::pin(async move {
            let v = self.svc.embed(text).await?;
            check_dim(&v, self.dim)?;
            Ok(v)
        })
    }

    fn embed_batch<'a>(&'a self, texts: &'a [String]) -> StoreFuture<'a, Vec<Vec<f32>>> {
        Box::pin(async move {
            let inputs: Vec<&str> = texts.iter().map(String::as_str).collect();
            let vectors = self.svc.embed_many(&inputs).await?;
            if vectors.len() != texts.len() {
                return Err(RagError::Config(format!(
                    "provider returned {} embeddings for {} texts",
                    vectors.len(),
                    texts.len()
                )));
            }
            for v in &vectors {
                check_dim(v, self.dim)?;
            }
            Ok(vectors)
        })
    }

    fn dim(&self) -> Option<usize> {
        Some(self.dim)
    }
}

pub(crate) fn check_dim(v: &[f32], want: usize) -> Result<(), RagError> {
    if v.len() != want {
        return Err(RagError::VectorSizeMismatch { got: v.len(), want });
    }
    Ok(())
}

/// Fills `embedding` on every chunk that lacks one. Texts go out in
/// batches of [`EMBED_BATCH`], with at most `concurrency` batches in flight.
/// Stops at the first failure.
pub async fn embed_chunks(
    chunks: &mut [ChunkRecord],
    provider: &dyn EmbeddingsProvider,
    concurrency: usize,
) -> Result<usize, RagError> {
    let todo: Vec<(usize, String)> = chunks
        .iter()
        .enumerate()
        .filter(|(_, c)| c.embedding.is_none())
        .map(|(i, c)| (i, c.text.clone()))
        .collect();

    if todo.is_empty() {
        return Ok(0);
    }
    debug!(total = todo.len(), batch = EMBED_BATCH, concurrency, "embedding chunks");

    let batches: Vec<Vec<(usize, String)>> = todo.chunks(EMBED_BATCH).map(<[_]>::to_vec).collect();
    let done: Vec<Vec<(usize, Vec<f32>)>> = stream::iter(batches)
        .map(|batch| async move {
            let (idx, texts): (Vec<usize>, Vec<String>) = batch.into_iter().unzip();
            let vectors = provider.embed_batch(&texts).await?;
            Ok::<_, RagError>(idx.into_iter().zip(vectors).collect())
        })
        .buffer_unordered(concurrency.max(1))
        .try_collect()
        .await?;

    let mut n = 0;
    for (i, v) in done.into_iter().flatten() {
        if let Some(want) = provider.dim() {
            check_dim(&v, want)?;
        }
        chunks[i].embedding = Some(v);
        n += 1;
    }
    Ok(n)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Deterministic bag-of-letters embedder.
    pub struct LetterEmbedder;

    impl EmbeddingsProvider for LetterEmbedder {
        fn embed<'a>(
            &'a self,
            text: &'a str,
        ) -> Pin<Box<dyn Future<Output = Result<Vec<f32>, RagError>> + Send + 'a>> {
            Box::pin(async move {
                let mut v = vec![0.0f32; 26];
                for b in text.bytes().filter(u8::is_ascii_alphabetic) {
                    v[(b.to_ascii_lowercase() - b'a') as usize] += 1.0;
                }
                Ok(v)
            })
        }

        fn dim(&self) -> Option<usize> {
            Some(26)
        }
    }

    fn chunk(i: usize, text: &str) -> ChunkRecord {
        ChunkRecord {
            doc_id: "d".into(),
            source: "a.pdf".into(),
            page_label: None,
            chunk_index: i,
            text: text.into(),
            embedding: None,
        }
    }

    #[tokio::test]
    async fn fills_only_missing_vectors() {
        let mut chunks = vec![chunk(0, "abc"), chunk(1, "zzz")];
        chunks[1].embedding = Some(vec![1.0; 26]);
        let n = embed_chunks(&mut chunks, &LetterEmbedder, 4).await.unwrap();
        assert_eq!(n, 1);
        assert_eq!(chunks[0].embedding.as_ref().map(|v| v[0]), Some(1.0));
        assert_eq!(chunks[1].embedding.as_ref().map(|v| v[25]), Some(1.0));
    }

    #[tokio::test]
    async fn large_documents_are_embedded_in_batches() {
        let mut chunks: Vec<ChunkRecord> = (0..EMBED_BATCH * 2 + 3)
            .map(|i| chunk(i, if i % 2 == 0 { "aaa" } else { "bbb" }))
            .collect();
        let n = embed_chunks(&mut chunks, &LetterEmbedder, 2).await.unwrap();
        assert_eq!(n, chunks.len());
        for (i, c) in chunks.iter().enumerate() {
            let v = c.embedding.as_ref().unwrap();
            let hot = if i % 2 == 0 { 0 } else { 1 };
            assert_eq!(v[hot], 3.0, "chunk {i} got the wrong vector");
        }
    }

    #[test]
    fn dimension_check_reports_both_sizes() {
        let err = check_dim(&[0.0; 3], 4).unwrap_err();
        assert!(matches!(err, RagError::VectorSizeMismatch { got: 3, want: 4 }));
    }
}
