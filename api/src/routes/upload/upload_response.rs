use serde::Serialize;

/// Body of `POST /upload/`.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum UploadResponse {
    /// `INGEST_MODE=sync`: the document is queryable.
    Ingested {
        status: &'static str,
        filename: String,
        doc_id: String,
        pages: usize,
        chunks: usize,
    },
    /// `INGEST_MODE=background`: the worker will ingest it later.
    Queued { message: String },
}
