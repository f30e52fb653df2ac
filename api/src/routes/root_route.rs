//! GET /: service banner.

use axum::Json;
use serde_json::{Value, json};

pub async fn root() -> Json<Value> {
    Json(json!({ "message": "WiiDcos RAG API is running" }))
}
