//! Typed error for the contextor crate.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ContextorError {
    /// Retrieval failures (embedding the question, vector search).
    #[error("RAG error: {0}")]
    Rag(#[from] rag_store::RagError),

    /// Chat / rerank provider failures.
    #[error("LLM error: {0}")]
    Llm(#[from] ai_llm_service::AiLlmError),

    /// Caller input rejected before any I/O (empty question, top_k out of range).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The rerank model answered with nothing we could use.
    #[error("rerank failed: {0}")]
    Rerank(String),

    #[error("invalid contextor config: {0}")]
    Config(String),
}

impl ContextorError {
    /// Whether the failure came from an upstream service (LLM provider, Qdrant) rather than the caller.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            ContextorError::Llm(_)
                | ContextorError::Rag(rag_store::RagError::Embedding(_))
                | ContextorError::Rag(rag_store::RagError::Qdrant(_))
        )
    }
}
