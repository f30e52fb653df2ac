//! Retrieval: embed the question, then search the store.

use crate::embed::EmbeddingsProvider;
use crate::errors::RagError;
use crate::record::{RagHit, RagQuery};
use crate::store::VectorStore;

use tracing::{debug, trace};

/// Embeds the query text and returns the top-K hits under the query filter.
pub async fn rag_context(
    store: &dyn VectorStore,
    query: RagQuery<'_>,
    provider: &dyn EmbeddingsProvider,
) -> Result<Vec<RagHit>, RagError> {
    trace!(
        top_k = query.top_k,
        scoped = query.filter.is_some(),
        "retrieve::rag_context"
    );

    let qv = provider.embed(query.text).await?;
    let hits = store.search(qv, query.top_k, query.filter.as_ref()).await?;

    debug!(hits = hits.len(), collection = store.collection(), "retrieval done");
    Ok(hits)
}
