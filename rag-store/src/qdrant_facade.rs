//! Thin adapter around `qdrant-client` to isolate API usage.
//!
//! All Qdrant interactions live behind this facade so the rest of the
//! workspace never touches the builder API directly.

use std::collections::HashMap;

use crate::config::{DistanceKind, RagConfig};
use crate::errors::RagError;

use qdrant_client::qdrant::{
    CreateCollectionBuilder, CreateFieldIndexCollectionBuilder, Distance, FieldType, Filter,
    PointStruct, SearchParamsBuilder, SearchPointsBuilder, UpsertPointsBuilder, Value as QValue,
    VectorParamsBuilder,
};
use qdrant_client::{Payload, Qdrant};
use tracing::{debug, info};

/// Payload fields that get a keyword index for filtered search.
pub const INDEXED_FIELDS: [&str; 2] = ["doc_id", "source"];

pub struct QdrantFacade {
    client: Qdrant,
    collection: String,
    dim: usize,
    distance: DistanceKind,
    exact: bool,
}

impl QdrantFacade {
    /// Builds the client. No network traffic happens here.
    pub fn new(cfg: &RagConfig) -> Result<Self, RagError> {
        cfg.validate()?;

        let mut builder = Qdrant::from_url(&cfg.qdrant_url);
        if let Some(key) = &cfg.qdrant_api_key {
            builder = builder.api_key(key.clone());
        }
        let client = builder.build()?;

        Ok(Self {
            client,
            collection: cfg.collection.clone(),
            dim: cfg.dim,
            distance: cfg.distance,
            exact: cfg.exact_search,
        })
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Create-if-absent. An existing collection is reused as is.
    pub async fn ensure_collection(&self) -> Result<bool, RagError> {
        if self.client.collection_exists(&self.collection).await? {
            debug!(collection = %self.collection, "collection already exists");
            return Ok(false);
        }
        self.create().await?;
        Ok(true)
    }

    /// Drop the collection (if any) and create it empty.
    pub async fn reset_collection(&self) -> Result<(), RagError> {
        if self.client.collection_exists(&self.collection).await? {
            self.client.delete_collection(&self.collection).await?;
            info!(collection = %self.collection, "collection dropped");
        }
        self.create().await
    }

    async fn create(&self) -> Result<(), RagError> {
        let distance = match self.distance {
            DistanceKind::Cosine => Distance::Cosine,
            DistanceKind::Dot => Distance::Dot,
            DistanceKind::Euclid => Distance::Euclid,
        };

        self.client
            .create_collection(
                CreateCollectionBuilder::new(&self.collection)
                    .vectors_config(VectorParamsBuilder::new(self.dim as u64, distance)),
            )
            .await?;

        for field in INDEXED_FIELDS {
            self.client
                .create_field_index(CreateFieldIndexCollectionBuilder::new(
                    &self.collection,
                    field,
                    FieldType::Keyword,
                ))
                .await?;
        }

        info!(
            collection = %self.collection,
            dim = self.dim,
            distance = ?self.distance,
            "collection created"
        );
        Ok(())
    }

    /// Upserts points and waits for the write to be applied.
    pub async fn upsert_points(&self, points: Vec<PointStruct>) -> Result<usize, RagError> {
        if points.is_empty() {
            return Ok(0);
        }
        let n = points.len();
        self.client
            .upsert_points(UpsertPointsBuilder::new(&self.collection, points).wait(true))
            .await?;
        debug!(collection = %self.collection, points = n, "upsert applied");
        Ok(n)
    }

    /// Top-K similarity search returning `(score, payload)` pairs sorted by score.
    pub async fn search(
        &self,
        vector: Vec<f32>,
        top_k: u64,
        filter: Option<Filter>,
    ) -> Result<Vec<(f32, serde_json::Value)>, RagError> {
        let mut builder =
            SearchPointsBuilder::new(&self.collection, vector, top_k).with_payload(true);
        if let Some(f) = filter {
            builder = builder.filter(f);
        }
        if self.exact {
            builder = builder.params(SearchParamsBuilder::default().exact(true));
        }

        let res = match self.client.search_points(builder).await {
            Ok(res) => res,
            // Nothing has been ingested yet: an empty result, not a failure.
            Err(e) => {
                if !self.client.collection_exists(&self.collection).await? {
                    debug!(collection = %self.collection, "search on missing collection");
                    return Ok(Vec::new());
                }
                return Err(e.into());
            }
        };
        Ok(res
            .result
            .into_iter()
            .map(|p| (p.score, qpayload_to_json(p.payload)))
            .collect())
    }
}

/// Build a point from its id, vector and JSON payload object.
pub fn make_point(
    id: String,
    vector: Vec<f32>,
    payload: serde_json::Value,
) -> Result<PointStruct, RagError> {
    let payload = Payload::try_from(payload).map_err(|e| RagError::Qdrant(e.to_string()))?;
    Ok(PointStruct::new(id, vector, payload))
}

/// Converts a Qdrant payload into a JSON object.
fn qpayload_to_json(p: HashMap<String, QValue>) -> serde_json::Value {
    serde_json::Value::Object(p.into_iter().map(|(k, v)| (k, qvalue_to_json(v))).collect())
}

fn qvalue_to_json(v: QValue) -> serde_json::Value {
    use qdrant_client::qdrant::value::Kind as K;
    match v.kind {
        Some(K::StringValue(s)) => serde_json::Value::String(s),
        Some(K::IntegerValue(i)) => serde_json::Value::Number(i.into()),
        Some(K::DoubleValue(f)) => serde_json::json!(f),
        Some(K::BoolValue(b)) => serde_json::Value::Bool(b),
        Some(K::ListValue(list)) => {
            serde_json::Value::Array(list.values.into_iter().map(qvalue_to_json).collect())
        }
        Some(K::StructValue(s)) => qpayload_to_json(s.fields),
        Some(K::NullValue(_)) | None => serde_json::Value::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qdrant_client::qdrant::{ListValue, Struct, value::Kind};

    fn s(v: &str) -> QValue {
        QValue {
            kind: Some(Kind::StringValue(v.into())),
        }
    }

    #[test]
    fn payload_conversion_keeps_nested_values() {
        let mut inner = HashMap::new();
        inner.insert("page".to_string(), s("3"));
        let mut p = HashMap::new();
        p.insert("source".to_string(), s("report.pdf"));
        p.insert(
            "chunk_index".to_string(),
            QValue {
                kind: Some(Kind::IntegerValue(7)),
            },
        );
        p.insert(
            "tags".to_string(),
            QValue {
                kind: Some(Kind::ListValue(ListValue {
                    values: vec![s("a"), s("b")],
                })),
            },
        );
        p.insert(
            "meta".to_string(),
            QValue {
                kind: Some(Kind::StructValue(Struct { fields: inner })),
            },
        );

        let json = qpayload_to_json(p);
        assert_eq!(json["source"], "report.pdf");
        assert_eq!(json["chunk_index"], 7);
        assert_eq!(json["tags"], serde_json::json!(["a", "b"]));
        assert_eq!(json["meta"]["page"], "3");
    }

    #[test]
    fn point_payload_must_be_an_object() {
        assert!(make_point("id".into(), vec![0.0], serde_json::json!({"a": 1})).is_ok());
        assert!(make_point("id".into(), vec![0.0], serde_json::json!([1, 2])).is_err());
    }

    #[test]
    fn building_the_client_does_not_connect() {
        let cfg = RagConfig::new_default("http://localhost:6334", "t", 8);
        let f = QdrantFacade::new(&cfg).unwrap();
        assert_eq!(f.collection(), "t");
        assert_eq!(f.dim(), 8);
    }
}
