//! GET /query/: answer a question from the indexed documents.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State, rejection::QueryRejection},
};
use contextor::{AskOptions, QaAnswer};
use tracing::info;

use crate::{
    core::app_state::AppState,
    error_handler::AppResult,
    routes::query::query_request::{QueryParams, QueryResponse},
};

/// Handler: GET /query/
///
/// # Example
/// ```bash
/// curl 'http://127.0.0.1:8000/query/?q=What%20is%20this%20about&source=report.pdf&top_k=5'
/// ```
pub async fn query(
    State(state): State<Arc<AppState>>,
    params: Result<Query<QueryParams>, QueryRejection>,
) -> AppResult<Json<QueryResponse>> {
    let Query(params) = params?;
    info!(q = %params.q, doc_id = ?params.doc_id, source = ?params.source, "query received");

    let opts = AskOptions {
        top_k: params.top_k,
        doc_id: params.doc_id.clone(),
        source: params.source.clone(),
    };
    let QaAnswer {
        answer,
        sources,
        confidence,
        ..
    } = state.query.ask(&params.q, opts).await?;

    Ok(Json(QueryResponse {
        query: params.q,
        answer,
        doc_id: params.doc_id,
        source: params.source,
        sources,
        confidence,
    }))
}
