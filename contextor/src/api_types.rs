//! Public API types re-used by external crates (e.g., the HTTP API layer).

use serde::Serialize;

/// Answer returned when retrieval finds nothing. The LLM is not called.
pub const EMPTY_CONTEXT_ANSWER: &str =
    "No relevant information was found in the indexed documents.";

/// Per-question options.
///
/// # Example
/// ```
/// use contextor::AskOptions;
/// let opts = AskOptions { top_k: Some(5), source: Some("report.pdf".into()), ..Default::default() };
/// assert!(opts.doc_id.is_none());
/// ```
#[derive(Clone, Debug, Default)]
pub struct AskOptions {
    /// Hits to retrieve, `1..=20`. `None` uses the configured default.
    pub top_k: Option<u64>,
    /// Restrict retrieval to one document. Takes precedence over `source`.
    pub doc_id: Option<String>,
    /// Restrict retrieval to one filename.
    pub source: Option<String>,
}

/// A distinct `(filename, page)` attribution.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SourceRef {
    pub filename: String,
    pub page: Option<String>,
}

/// A compact record of a context chunk that was fed to the LLM.
#[derive(Clone, Debug, Serialize)]
pub struct UsedChunk {
    pub score: f32,
    pub doc_id: Option<String>,
    pub source: Option<String>,
    pub page_label: Option<String>,
    pub text: String,
}

/// Final answer together with the context passed to the model.
#[derive(Clone, Debug, Serialize)]
pub struct QaAnswer {
    pub answer: String,
    pub sources: Vec<SourceRef>,
    pub used: Vec<UsedChunk>,
    /// Top rerank relevance in `[0, 1]`; `None` when re-ranking did not run.
    pub confidence: Option<f32>,
}

impl QaAnswer {
    pub fn empty_context() -> Self {
        Self {
            answer: EMPTY_CONTEXT_ANSWER.to_string(),
            sources: Vec::new(),
            used: Vec::new(),
            confidence: None,
        }
    }
}
