//! Ollama client: chat completions for answer synthesis and re-ranking,
//! embeddings for chunks and questions.
//!
//! Endpoints used:
//! - `POST {endpoint}/api/generate` with `stream=false`
//! - `POST {endpoint}/api/embed`, which accepts one or many inputs
//!
//! ```no_run
//! use ai_llm_service::{LlmModelConfig, LlmProvider};
//! use ai_llm_service::services::ollama_service::OllamaService;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let cfg = LlmModelConfig {
//!     provider: LlmProvider::Ollama,
//!     model: "bge-m3".into(),
//!     endpoint: "http://localhost:11434".into(),
//!     api_key: None,
//!     max_tokens: None,
//!     temperature: None,
//!     top_p: None,
//!     timeout_secs: Some(30),
//! };
//! let svc = OllamaService::new(cfg)?;
//! let vectors = svc.embed_batch(&["first chunk", "second chunk"]).await?;
//! assert_eq!(vectors.len(), 2);
//! # Ok(()) }
//! ```

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tracing::{debug, error, instrument};

use crate::config::{llm_model_config::LlmModelConfig, llm_provider::LlmProvider};
use crate::error_handler::{
    AiLlmError, HttpError, Provider, ProviderError, ProviderErrorKind, make_snippet,
};

/// How long Ollama keeps the model loaded after a call. Ingestion issues
/// bursts of embedding calls, so avoid reloading between them.
const KEEP_ALIVE: &str = "5m";

#[derive(Debug)]
pub struct OllamaService {
    client: reqwest::Client,
    cfg: LlmModelConfig,
    url_generate: String,
    url_embed: String,
}

impl OllamaService {
    /// # Errors
    /// `InvalidProvider` for a non-Ollama profile, `InvalidEndpoint` for a
    /// non-http(s) endpoint, transport errors if the client cannot be built.
    pub fn new(cfg: LlmModelConfig) -> Result<Self, AiLlmError> {
        if cfg.provider != LlmProvider::Ollama {
            return Err(
                ProviderError::new(Provider::Ollama, ProviderErrorKind::InvalidProvider).into(),
            );
        }
        let base = cfg.endpoint.trim().trim_end_matches('/');
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(ProviderError::new(
                Provider::Ollama,
                ProviderErrorKind::InvalidEndpoint(cfg.endpoint.clone()),
            )
            .into());
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs.unwrap_or(60)))
            .gzip(true)
            .build()?;

        Ok(Self {
            url_generate: format!("{base}/api/generate"),
            url_embed: format!("{base}/api/embed"),
            client,
            cfg,
        })
    }

    /// Non-streaming completion. `max_tokens` maps to `num_predict`.
    #[instrument(skip_all, fields(model = %self.cfg.model))]
    pub async fn generate(&self, prompt: &str, system: Option<&str>) -> Result<String, AiLlmError> {
        let body = GenerateRequest::from_cfg(&self.cfg, prompt, system);
        let out: GenerateResponse = self.post(&self.url_generate, &body).await?;
        Ok(out.response)
    }

    /// One embedding.
    pub async fn embeddings(&self, input: &str) -> Result<Vec<f32>, AiLlmError> {
        self.embed_batch(&[input])
            .await?
            .pop()
            .ok_or_else(|| decode_error("empty `embeddings` array"))
    }

    /// Embeddings for several inputs in one request, in input order.
    #[instrument(skip_all, fields(model = %self.cfg.model, n = inputs.len()))]
    pub async fn embed_batch(&self, inputs: &[&str]) -> Result<Vec<Vec<f32>>, AiLlmError> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }
        let body = EmbedRequest {
            model: &self.cfg.model,
            input: inputs,
            keep_alive: KEEP_ALIVE,
        };
        let out: EmbedResponse = self.post(&self.url_embed, &body).await?;
        if out.embeddings.len() != inputs.len() {
            return Err(decode_error(&format!(
                "asked for {} embeddings, got {}",
                inputs.len(),
                out.embeddings.len()
            )));
        }
        Ok(out.embeddings)
    }

    async fn post<B, R>(&self, url: &str, body: &B) -> Result<R, AiLlmError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let started = Instant::now();
        debug!(%url, "POST");
        let resp = self.client.post(url).json(body).send().await?;

        let status = resp.status();
        if !status.is_success() {
            let snippet = make_snippet(&resp.text().await.unwrap_or_default());
            error!(%status, %url, %snippet, latency_ms = started.elapsed().as_millis(), "Ollama call failed");
            return Err(ProviderError::new(
                Provider::Ollama,
                ProviderErrorKind::HttpStatus(HttpError {
                    status,
                    url: url.to_string(),
                    snippet,
                }),
            )
            .into());
        }

        let out = resp
            .json::<R>()
            .await
            .map_err(|e| decode_error(&format!("serde error: {e}")))?;
        debug!(latency_ms = started.elapsed().as_millis(), "Ollama call done");
        Ok(out)
    }
}

fn decode_error(msg: &str) -> AiLlmError {
    ProviderError::new(Provider::Ollama, ProviderErrorKind::Decode(msg.to_string())).into()
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    stream: bool,
    keep_alive: &'static str,
    options: GenerateOptions,
}

impl<'a> GenerateRequest<'a> {
    fn from_cfg(cfg: &'a LlmModelConfig, prompt: &'a str, system: Option<&'a str>) -> Self {
        Self {
            model: &cfg.model,
            prompt,
            system,
            stream: false,
            keep_alive: KEEP_ALIVE,
            options: GenerateOptions {
                temperature: cfg.temperature,
                top_p: cfg.top_p,
                num_predict: cfg.max_tokens,
            },
        }
    }
}

#[derive(Debug, Default, Serialize)]
struct GenerateOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
    keep_alive: &'static str,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}
