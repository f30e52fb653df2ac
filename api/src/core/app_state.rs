use std::str::FromStr;
use std::sync::Arc;

use contextor::QueryEngine;
use doc_ingest::IngestPipeline;
use ingest_worker::EventBus;

use crate::error_handler::AppError;

/// How `/upload/` hands the saved file to the ingestion pipeline.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum IngestMode {
    /// Ingest inside the request and return the `doc_id`.
    #[default]
    Sync,
    /// Publish `doc/ingest.requested` and return immediately.
    Background,
}

impl FromStr for IngestMode {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sync" => Ok(IngestMode::Sync),
            "background" | "async" => Ok(IngestMode::Background),
            other => Err(AppError::Config(format!(
                "INGEST_MODE must be sync or background, got {other:?}"
            ))),
        }
    }
}

/// HTTP settings read from the environment.
#[derive(Clone, Debug, PartialEq)]
pub struct ApiConfig {
    /// `API_ADDRESS`, default `127.0.0.1:8000`.
    pub address: String,
    pub ingest_mode: IngestMode,
    /// `AUTH_TOKEN`: when set, `/upload/` and `/query/` require it as a bearer token.
    pub auth_token: Option<String>,
    /// Request body cap for uploads (`MAX_UPLOAD_MB`, default 50).
    pub max_upload_bytes: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:8000".into(),
            ingest_mode: IngestMode::Sync,
            auth_token: None,
            max_upload_bytes: 50 * 1024 * 1024,
        }
    }
}

impl ApiConfig {
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |k: &str| lookup(k).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let d = Self::default();
        Ok(Self {
            address: get("API_ADDRESS").unwrap_or(d.address),
            ingest_mode: match get("INGEST_MODE") {
                Some(m) => m.parse()?,
                None => d.ingest_mode,
            },
            auth_token: get("AUTH_TOKEN"),
            max_upload_bytes: match get("MAX_UPLOAD_MB") {
                Some(mb) => mb
                    .parse::<usize>()
                    .ok()
                    .filter(|&mb| mb > 0)
                    .map(|mb| mb * 1024 * 1024)
                    .ok_or_else(|| AppError::Config(format!("MAX_UPLOAD_MB is not valid: {mb:?}")))?,
                None => d.max_upload_bytes,
            },
        })
    }
}

/// Shared state for all HTTP handlers. Built once at startup, never mutated.
pub struct AppState {
    pub cfg: ApiConfig,
    pub ingest: Arc<IngestPipeline>,
    pub query: Arc<QueryEngine>,
    /// Present when `ingest_mode` is `Background`.
    pub bus: Option<EventBus>,
}

impl AppState {
    /// # Errors
    /// `AppError::Config` when background mode is requested without a bus.
    pub fn new(
        cfg: ApiConfig,
        ingest: Arc<IngestPipeline>,
        query: Arc<QueryEngine>,
        bus: Option<EventBus>,
    ) -> Result<Self, AppError> {
        if cfg.ingest_mode == IngestMode::Background && bus.is_none() {
            return Err(AppError::Config(
                "INGEST_MODE=background needs an ingest worker".into(),
            ));
        }
        Ok(Self {
            cfg,
            ingest,
            query,
            bus,
        })
    }
}
