use serde::Deserialize;

/// `POST /upload/` reply. Sync mode fills the report fields, background
/// mode only `message`.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct UploadReply {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub doc_id: Option<String>,
    #[serde(default)]
    pub pages: Option<usize>,
    #[serde(default)]
    pub chunks: Option<usize>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct SourceRef {
    pub filename: String,
    #[serde(default)]
    pub page: Option<String>,
}

/// `GET /query/` reply.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct QueryReply {
    pub query: String,
    #[serde(default)]
    pub answer: String,
    #[serde(default)]
    pub doc_id: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub sources: Vec<SourceRef>,
    #[serde(default)]
    pub confidence: Option<f32>,
}

impl QueryReply {
    /// Nothing usable came back: blank answer or no supporting sources.
    pub fn is_empty(&self) -> bool {
        self.answer.trim().is_empty() || self.sources.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn both_upload_shapes_parse() {
        let sync: UploadReply = serde_json::from_str(
            r#"{"status":"success","filename":"a.pdf","doc_id":"d1","pages":2,"chunks":5}"#,
        )
        .unwrap();
        assert_eq!(sync.doc_id.as_deref(), Some("d1"));

        let queued: UploadReply =
            serde_json::from_str(r#"{"message":"a.pdf uploaded; ingestion queued"}"#).unwrap();
        assert!(queued.doc_id.is_none());
        assert!(queued.message.unwrap().contains("queued"));
    }

    #[test]
    fn reply_without_sources_counts_as_empty() {
        let r: QueryReply = serde_json::from_str(
            r#"{"query":"q","answer":"No relevant information.","sources":[]}"#,
        )
        .unwrap();
        assert!(r.is_empty());

        let r: QueryReply = serde_json::from_str(
            r#"{"query":"q","answer":"42","sources":[{"filename":"a.pdf","page":"3"}],"confidence":0.9}"#,
        )
        .unwrap();
        assert!(!r.is_empty());
        assert_eq!(r.sources[0].page.as_deref(), Some("3"));
    }
}
