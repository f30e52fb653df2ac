//! Runtime and collection configuration.

use crate::errors::RagError;

/// Distance function used for the vector space.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DistanceKind {
    /// Cosine distance (what the embedding models are trained for).
    Cosine,
    Dot,
    Euclid,
}

/// Which [`VectorStore`](crate::VectorStore) implementation to open.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreBackend {
    Qdrant,
    /// Process-local brute-force store, for development and tests.
    Memory,
}

/// Configuration for the chunk collection.
#[derive(Clone, Debug)]
pub struct RagConfig {
    /// Qdrant gRPC endpoint, e.g. `http://localhost:6334`.
    pub qdrant_url: String,
    /// Optional API key for Qdrant Cloud.
    pub qdrant_api_key: Option<String>,
    /// Target collection name.
    pub collection: String,
    /// Vector dimensionality of the collection.
    pub dim: usize,
    pub distance: DistanceKind,
    /// Upsert batch size.
    pub upsert_batch: usize,
    /// Exact search flag (false = HNSW ANN).
    pub exact_search: bool,
    pub backend: StoreBackend,
}

impl RagConfig {
    pub const DEFAULT_COLLECTION: &'static str = "wiidcos_docs";

    /// Defaults for a given endpoint, collection and dimensionality.
    pub fn new_default(url: impl Into<String>, collection: impl Into<String>, dim: usize) -> Self {
        Self {
            qdrant_url: url.into(),
            qdrant_api_key: None,
            collection: collection.into(),
            dim,
            distance: DistanceKind::Cosine,
            upsert_batch: 256,
            exact_search: false,
            backend: StoreBackend::Qdrant,
        }
    }

    /// Build from the process environment. `dim` comes from the embedding settings.
    pub fn from_env(dim: usize) -> Result<Self, RagError> {
        Self::from_lookup(dim, |k| std::env::var(k).ok())
    }

    /// `QDRANT_URL` wins over `QDRANT_HOST`/`QDRANT_PORT` (default `localhost:6334`).
    pub fn from_lookup<F>(dim: usize, lookup: F) -> Result<Self, RagError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |k: &str| lookup(k).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let url = match get("QDRANT_URL") {
            Some(url) => url,
            None => {
                let host = get("QDRANT_HOST").unwrap_or_else(|| "localhost".into());
                let port = match get("QDRANT_PORT") {
                    Some(p) => p
                        .parse::<u16>()
                        .map_err(|_| RagError::Config(format!("QDRANT_PORT is not a port: {p}")))?,
                    None => 6334,
                };
                format!("http://{host}:{port}")
            }
        };

        let collection = get("QDRANT_COLLECTION").unwrap_or_else(|| Self::DEFAULT_COLLECTION.into());
        let backend = match get("VECTOR_BACKEND").as_deref() {
            None | Some("qdrant") => StoreBackend::Qdrant,
            Some("memory") => StoreBackend::Memory,
            Some(other) => {
                return Err(RagError::Config(format!(
                    "VECTOR_BACKEND must be `qdrant` or `memory`, got `{other}`"
                )));
            }
        };

        let mut cfg = Self::new_default(url, collection, dim);
        cfg.qdrant_api_key = get("QDRANT_API_KEY");
        cfg.backend = backend;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Validates config values.
    pub fn validate(&self) -> Result<(), RagError> {
        if self.backend == StoreBackend::Qdrant && self.qdrant_url.trim().is_empty() {
            return Err(RagError::Config("qdrant_url is empty".into()));
        }
        if self.collection.trim().is_empty() {
            return Err(RagError::Config("collection is empty".into()));
        }
        if self.dim == 0 {
            return Err(RagError::Config("dim must be > 0".into()));
        }
        if self.upsert_batch == 0 {
            return Err(RagError::Config("upsert_batch must be > 0".into()));
        }
        Ok(())
    }
}
