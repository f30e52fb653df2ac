//! Core data models used by the library.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use services::uuid::chunk_point_id;

/// One chunk of a document, ready to be written to the store.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChunkRecord {
    /// Document the chunk was cut from.
    pub doc_id: String,
    /// Original filename of the document.
    pub source: String,
    /// Page label (1-based page number) when the document exposes pages.
    #[serde(default)]
    pub page_label: Option<String>,
    /// Position of the chunk within the document.
    pub chunk_index: usize,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

impl ChunkRecord {
    /// Deterministic point id: `(doc_id, chunk_index)` identifies a chunk.
    pub fn point_id(&self) -> String {
        chunk_point_id(&self.doc_id, self.chunk_index).to_string()
    }

    /// Payload stored next to the vector.
    pub fn payload(&self) -> Value {
        json!({
            "doc_id": self.doc_id,
            "source": self.source,
            "page_label": self.page_label,
            "chunk_index": self.chunk_index,
            "text": self.text,
        })
    }
}

/// Query parameters for RAG retrieval.
pub struct RagQuery<'a> {
    pub text: &'a str,
    pub top_k: u64,
    pub filter: Option<RagFilter>,
}

/// A single retrieval hit.
#[derive(Clone, Debug, Serialize)]
pub struct RagHit {
    pub score: f32,
    pub text: String,
    pub doc_id: Option<String>,
    pub source: Option<String>,
    pub page_label: Option<String>,
    pub chunk_index: Option<usize>,
}

impl RagHit {
    /// Build a hit from a stored payload. Missing fields stay `None`.
    pub fn from_payload(score: f32, payload: Value) -> Self {
        let str_field = |k: &str| payload.get(k).and_then(Value::as_str).map(str::to_string);
        Self {
            score,
            text: str_field("text").unwrap_or_default(),
            doc_id: str_field("doc_id"),
            source: str_field("source"),
            page_label: str_field("page_label"),
            chunk_index: payload
                .get("chunk_index")
                .and_then(Value::as_u64)
                .map(|i| i as usize),
        }
    }
}

/// Conjunction of exact-match conditions on payload fields.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RagFilter {
    /// Exact match on a field, e.g. `("source", "report.pdf")`.
    pub equals: Vec<(String, Value)>,
}

impl RagFilter {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            equals: vec![(field.into(), value.into())],
        }
    }

    /// Retrieval scope of a query: `doc_id` takes precedence and `source` is
    /// then ignored. Blank values count as absent. `None` means unscoped.
    pub fn scope(doc_id: Option<&str>, source: Option<&str>) -> Option<Self> {
        fn present(v: Option<&str>) -> Option<&str> {
            v.map(str::trim).filter(|v| !v.is_empty())
        }
        match (present(doc_id), present(source)) {
            (Some(id), _) => Some(Self::eq("doc_id", id)),
            (None, Some(src)) => Some(Self::eq("source", src)),
            (None, None) => None,
        }
    }

    /// Whether a payload satisfies every condition.
    pub fn matches(&self, payload: &Value) -> bool {
        self.equals
            .iter()
            .all(|(field, want)| payload.get(field) == Some(want))
    }
}
