//! POST /upload/: save a file, then ingest it (sync) or enqueue it (background).

use std::sync::Arc;

use axum::{
    Json,
    extract::{Multipart, State},
};
use doc_ingest::{FileKind, sanitize_filename, save_upload};
use ingest_worker::IngestEvent;
use tracing::info;

use crate::{
    core::app_state::{AppState, IngestMode},
    error_handler::{AppError, AppResult},
    routes::upload::upload_response::UploadResponse,
};

/// Multipart field carrying the document.
const FILE_FIELD: &str = "file";

/// Handler: POST /upload/
///
/// # Example
/// ```bash
/// curl -F "file=@report.pdf" http://127.0.0.1:8000/upload/
/// ```
pub async fn upload(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> AppResult<Json<UploadResponse>> {
    let mut file: Option<(String, Vec<u8>)> = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let raw_name = field.file_name().unwrap_or_default().to_string();
        let filename = sanitize_filename(&raw_name)
            .ok_or_else(|| AppError::BadRequest(format!("invalid filename: {raw_name:?}")))?;
        let bytes = field.bytes().await?;
        file = Some((filename, bytes.to_vec()));
        break;
    }
    let (filename, bytes) =
        file.ok_or_else(|| AppError::BadRequest(format!("multipart field `{FILE_FIELD}` is required")))?;

    // Reject what we cannot extract before writing anything.
    let path = std::path::Path::new(&filename);
    FileKind::from_path(path)?;

    let saved = save_upload(&state.ingest.config().upload_dir, &filename, &bytes).await?;
    info!(file = %saved.display(), bytes = bytes.len(), "received file");

    match (state.cfg.ingest_mode, &state.bus) {
        (IngestMode::Background, Some(bus)) => {
            bus.send(IngestEvent::requested(&saved, &filename))?;
            Ok(Json(UploadResponse::Queued {
                message: format!("{filename} uploaded; ingestion queued"),
            }))
        }
        _ => {
            let report = state.ingest.ingest_file(&saved, &filename, None).await?;
            info!(filename = %report.filename, doc_id = %report.doc_id, "ingested successfully");
            Ok(Json(UploadResponse::Ingested {
                status: report.status,
                filename: report.filename,
                doc_id: report.doc_id,
                pages: report.pages,
                chunks: report.chunks,
            }))
        }
    }
}
