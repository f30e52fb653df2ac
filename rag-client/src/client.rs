//! Thin `reqwest` wrapper over the HTTP API.

use std::path::Path;
use std::time::Duration;

use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::api_types::{QueryReply, UploadReply};
use crate::error::ClientError;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";

/// Uploads ingest synchronously, so allow for slow embedding.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Clone, Debug)]
pub struct ApiClient {
    http: reqwest::Client,
    base: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(base: &str, token: Option<String>, timeout: Duration) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base: base.trim_end_matches('/').to_string(),
            token: token.filter(|t| !t.trim().is_empty()),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    fn authed(&self, rb: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(t) => rb.bearer_auth(t),
            None => rb,
        }
    }

    pub async fn health(&self) -> Result<serde_json::Value, ClientError> {
        let res = self.http.get(self.url("/healthz")).send().await?;
        decode(res).await
    }

    /// Send a local file as multipart field `file`.
    pub async fn upload(&self, path: &Path) -> Result<UploadReply, ClientError> {
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| ClientError::Usage(format!("not a file: {}", path.display())))?;
        let bytes = tokio::fs::read(path).await.map_err(|e| ClientError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        debug!(%filename, bytes = bytes.len(), "uploading");

        let part = Part::bytes(bytes)
            .file_name(filename.clone())
            .mime_str(mime_for(&filename))?;
        let form = Form::new().part("file", part);
        let res = self
            .authed(self.http.post(self.url("/upload/")))
            .multipart(form)
            .send()
            .await?;
        decode(res).await
    }

    /// `GET /query/?q=..[&source=..]`.
    pub async fn query(&self, question: &str, source: Option<&str>) -> Result<QueryReply, ClientError> {
        let mut params = vec![("q", question)];
        if let Some(s) = source {
            params.push(("source", s));
        }
        let res = self
            .authed(self.http.get(self.url("/query/")))
            .query(&params)
            .send()
            .await?;
        decode(res).await
    }
}

async fn decode<T: DeserializeOwned>(res: reqwest::Response) -> Result<T, ClientError> {
    let status = res.status();
    if !status.is_success() {
        let body = res.text().await.unwrap_or_default();
        return Err(ClientError::Api { status, body });
    }
    Ok(res.json::<T>().await?)
}

fn mime_for(filename: &str) -> &'static str {
    let lower = filename.to_ascii_lowercase();
    if lower.ends_with(".pdf") {
        "application/pdf"
    } else if lower.ends_with(".md") || lower.ends_with(".markdown") {
        "text/markdown"
    } else {
        "text/plain"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_is_normalized_and_blank_tokens_dropped() {
        let c = ApiClient::new("http://localhost:8000/", Some("  ".into()), DEFAULT_TIMEOUT).unwrap();
        assert_eq!(c.base_url(), "http://localhost:8000");
        assert_eq!(c.url("/query/"), "http://localhost:8000/query/");
        assert!(c.token.is_none());
    }

    #[test]
    fn mime_follows_extension() {
        assert_eq!(mime_for("Report.PDF"), "application/pdf");
        assert_eq!(mime_for("notes.md"), "text/markdown");
        assert_eq!(mime_for("notes.txt"), "text/plain");
    }
}
