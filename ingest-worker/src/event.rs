//! Event envelope for out-of-band ingestion.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Name of the only event the worker handles.
pub const INGEST_REQUESTED: &str = "doc/ingest.requested";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestRequest {
    /// Where the upload was saved.
    pub path: PathBuf,
    /// Original filename, stored as the chunk `source`.
    pub filename: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestEvent {
    pub name: String,
    pub data: IngestRequest,
}

impl IngestEvent {
    pub fn requested(path: impl Into<PathBuf>, filename: impl Into<String>) -> Self {
        Self {
            name: INGEST_REQUESTED.to_string(),
            data: IngestRequest {
                path: path.into(),
                filename: filename.into(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_shape_is_name_plus_data() {
        let ev = IngestEvent::requested("Data/uploads/a.pdf", "a.pdf");
        let v = serde_json::to_value(&ev).unwrap();
        assert_eq!(
            v,
            serde_json::json!({
                "name": "doc/ingest.requested",
                "data": {"path": "Data/uploads/a.pdf", "filename": "a.pdf"}
            })
        );
    }
}
