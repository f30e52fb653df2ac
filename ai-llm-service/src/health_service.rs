//! Health probes for the configured LLM backends.
//!
//! - Ollama: `GET {endpoint}/api/tags`
//! - OpenAI: `GET {endpoint}/v1/models` with Bearer auth
//!
//! Both probes list the models the backend serves and check whether the
//! configured model is among them. [`HealthService::check`] never fails:
//! every error becomes a [`HealthStatus`] with `ok = false`. The app uses
//! this at startup to decide whether the re-ranking model is usable.

use std::time::{Duration, Instant};

use reqwest::header;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::llm_model_config::LlmModelConfig;
use crate::config::llm_provider::LlmProvider;
use crate::error_handler::{AiLlmError, HealthError, HttpError, make_snippet};

/// Serializable health snapshot for one profile.
#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    pub provider: String,
    pub endpoint: String,
    pub model: String,
    pub ok: bool,
    pub latency_ms: u128,
    pub message: String,
}

impl HealthStatus {
    fn new(cfg: &LlmModelConfig, ok: bool, latency_ms: u128, message: impl Into<String>) -> Self {
        Self {
            provider: format!("{:?}", cfg.provider),
            endpoint: cfg.endpoint.clone(),
            model: cfg.model.clone(),
            ok,
            latency_ms,
            message: message.into(),
        }
    }
}

/// Reuses one HTTP client across probes.
pub struct HealthService {
    client: reqwest::Client,
    default_timeout: Duration,
}

impl HealthService {
    pub fn new(timeout_secs: Option<u64>) -> Result<Self, AiLlmError> {
        let default_timeout = Duration::from_secs(timeout_secs.unwrap_or(10));
        let client = reqwest::Client::builder().timeout(default_timeout).build()?;
        Ok(Self {
            client,
            default_timeout,
        })
    }

    /// Probe one profile. Never returns an error.
    pub async fn check(&self, cfg: &LlmModelConfig) -> HealthStatus {
        let endpoint = cfg.endpoint.trim();
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            warn!(endpoint = %cfg.endpoint, "health probe skipped: invalid endpoint");
            return HealthStatus::new(cfg, false, 0, "endpoint is empty or missing http/https");
        }

        let started = Instant::now();
        let listed = match cfg.provider {
            LlmProvider::Ollama => self.list_ollama_models(cfg).await,
            LlmProvider::OpenAI => self.list_openai_models(cfg).await,
        };
        let latency = started.elapsed().as_millis();

        let status = match listed {
            Ok(models) if model_listed(&models, &cfg.model) => {
                HealthStatus::new(cfg, true, latency, "backend is healthy; model is available")
            }
            Ok(_) => HealthStatus::new(cfg, false, latency, "backend is up, but model is not listed"),
            Err(err) => HealthStatus::new(cfg, false, latency, err.to_string()),
        };

        if status.ok {
            info!(provider = %status.provider, model = %status.model, latency_ms = latency, "health probe ok");
        } else {
            warn!(provider = %status.provider, model = %status.model, message = %status.message, "health probe failed");
        }
        status
    }

    /// Probe several profiles in order.
    pub async fn check_many(&self, configs: &[LlmModelConfig]) -> Vec<HealthStatus> {
        let mut out = Vec::with_capacity(configs.len());
        for cfg in configs {
            out.push(self.check(cfg).await);
        }
        out
    }

    async fn list_ollama_models(&self, cfg: &LlmModelConfig) -> Result<Vec<String>, AiLlmError> {
        #[derive(Deserialize)]
        struct Tag {
            name: String,
        }
        #[derive(Deserialize)]
        struct Tags {
            #[serde(default)]
            models: Vec<Tag>,
        }

        let url = format!("{}/api/tags", cfg.endpoint.trim_end_matches('/'));
        let resp = self.get(cfg, &url, None).await?;
        let tags: Tags = resp
            .json()
            .await
            .map_err(|e| HealthError::Decode(e.to_string()))?;
        Ok(tags.models.into_iter().map(|t| t.name).collect())
    }

    async fn list_openai_models(&self, cfg: &LlmModelConfig) -> Result<Vec<String>, AiLlmError> {
        #[derive(Deserialize)]
        struct ModelItem {
            id: String,
        }
        #[derive(Deserialize)]
        struct Models {
            data: Vec<ModelItem>,
        }

        let key = cfg
            .api_key
            .as_deref()
            .ok_or_else(|| HealthError::Decode("missing OpenAI API key".into()))?;
        let auth = header::HeaderValue::from_str(&format!("Bearer {key}"))
            .map_err(|e| HealthError::Decode(format!("invalid API key header: {e}")))?;

        let url = format!("{}/v1/models", cfg.endpoint.trim_end_matches('/'));
        let resp = self.get(cfg, &url, Some(auth)).await?;
        let models: Models = resp
            .json()
            .await
            .map_err(|e| HealthError::Decode(e.to_string()))?;
        Ok(models.data.into_iter().map(|m| m.id).collect())
    }

    async fn get(
        &self,
        cfg: &LlmModelConfig,
        url: &str,
        auth: Option<header::HeaderValue>,
    ) -> Result<reqwest::Response, AiLlmError> {
        let timeout = cfg
            .timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(self.default_timeout);
        debug!(provider = ?cfg.provider, "GET {url}");

        let mut req = self.client.get(url).timeout(timeout);
        if let Some(auth) = auth {
            req = req.header(header::AUTHORIZATION, auth);
        }
        let resp = req.send().await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let snippet = make_snippet(&resp.text().await.unwrap_or_default());
            return Err(HealthError::HttpStatus(HttpError {
                status,
                url: url.to_string(),
                snippet,
            })
            .into());
        }
        Ok(resp)
    }
}

/// Ollama reports untagged models as `name:latest`.
fn model_listed(models: &[String], wanted: &str) -> bool {
    models.iter().any(|m| {
        m == wanted || (!wanted.contains(':') && m.strip_suffix(":latest") == Some(wanted))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(endpoint: &str) -> LlmModelConfig {
        LlmModelConfig {
            provider: LlmProvider::OpenAI,
            model: "gpt-4o-mini".into(),
            endpoint: endpoint.into(),
            api_key: None,
            max_tokens: None,
            temperature: None,
            top_p: None,
            timeout_secs: Some(1),
        }
    }

    #[test]
    fn latest_tag_matches_bare_model_name() {
        let models = vec!["bge-m3:latest".to_string(), "qwen3:14b".to_string()];
        assert!(model_listed(&models, "bge-m3"));
        assert!(model_listed(&models, "qwen3:14b"));
        assert!(!model_listed(&models, "qwen3"));
    }

    #[tokio::test]
    async fn invalid_endpoint_is_reported_not_raised() {
        let svc = HealthService::new(Some(1)).unwrap();
        let status = svc.check(&cfg("ftp://nowhere")).await;
        assert!(!status.ok);
        assert_eq!(status.latency_ms, 0);
    }

    #[tokio::test]
    async fn missing_openai_key_is_unhealthy() {
        let svc = HealthService::new(Some(1)).unwrap();
        let status = svc.check(&cfg("https://api.openai.com")).await;
        assert!(!status.ok);
        assert!(status.message.contains("missing OpenAI API key"));
    }
}
