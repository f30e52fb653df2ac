use contextor::SourceRef;
use serde::{Deserialize, Serialize};

/// Query string of `GET /query/`.
#[derive(Debug, Deserialize)]
pub struct QueryParams {
    /// The question.
    pub q: String,
    #[serde(default)]
    pub doc_id: Option<String>,
    /// Filename scope; ignored when `doc_id` is given.
    #[serde(default)]
    pub source: Option<String>,
    /// `1..=20`, default 3.
    #[serde(default)]
    pub top_k: Option<u64>,
}

/// Response payload for `GET /query/`.
#[derive(Debug, Serialize)]
pub struct QueryResponse {
    pub query: String,
    pub answer: String,
    pub doc_id: Option<String>,
    pub source: Option<String>,
    pub sources: Vec<SourceRef>,
    pub confidence: Option<f32>,
}
