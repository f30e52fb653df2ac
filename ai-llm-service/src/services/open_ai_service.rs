//! OpenAI client for chat completions and embeddings.
//!
//! Endpoints are derived from `LlmModelConfig::endpoint`:
//! - `POST {endpoint}/v1/chat/completions`
//! - `POST {endpoint}/v1/embeddings` (single input or a batch)
//!
//! The client can be built without an API key so the app starts with a
//! warning only. Each request then fails with `MissingApiKey`.

use std::time::{Duration, Instant};

use reqwest::header;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tracing::{debug, error, info};

use crate::{
    config::{llm_model_config::LlmModelConfig, llm_provider::LlmProvider},
    error_handler::{
        AiLlmError, HttpError, Provider, ProviderError, ProviderErrorKind, make_snippet,
    },
};

/// Thin OpenAI client holding a preconfigured `reqwest::Client`.
#[derive(Debug)]
pub struct OpenAiService {
    client: reqwest::Client,
    cfg: LlmModelConfig,
    bearer: Option<header::HeaderValue>,
    url_chat: String,
    url_embeddings: String,
}

impl OpenAiService {
    /// # Errors
    /// - `InvalidProvider` if `cfg.provider` is not OpenAI
    /// - `InvalidEndpoint` if `cfg.endpoint` is not http(s)
    /// - `Decode` if the API key cannot be used as a header value
    pub fn new(cfg: LlmModelConfig) -> Result<Self, AiLlmError> {
        if cfg.provider != LlmProvider::OpenAI {
            return Err(provider_err(ProviderErrorKind::InvalidProvider));
        }

        let endpoint = cfg.endpoint.trim();
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            return Err(provider_err(ProviderErrorKind::InvalidEndpoint(
                cfg.endpoint.clone(),
            )));
        }

        let bearer = match cfg.api_key.as_deref() {
            Some(key) => Some(
                header::HeaderValue::from_str(&format!("Bearer {key}")).map_err(|e| {
                    provider_err(ProviderErrorKind::Decode(format!(
                        "invalid API key header: {e}"
                    )))
                })?,
            ),
            None => None,
        };

        let timeout = Duration::from_secs(cfg.timeout_secs.unwrap_or(60));
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        let base = endpoint.trim_end_matches('/');
        let url_chat = format!("{base}/v1/chat/completions");
        let url_embeddings = format!("{base}/v1/embeddings");

        info!(
            model = %cfg.model,
            endpoint = %cfg.endpoint,
            has_key = bearer.is_some(),
            "OpenAiService initialized"
        );

        Ok(Self {
            client,
            cfg,
            bearer,
            url_chat,
            url_embeddings,
        })
    }

    /// Single non-streaming chat completion.
    ///
    /// Sends an optional system message followed by the user `prompt`.
    /// Mapped options: `temperature`, `top_p`, `max_tokens`.
    pub async fn generate(&self, prompt: &str, system: Option<&str>) -> Result<String, AiLlmError> {
        let body = ChatCompletionRequest::from_cfg(&self.cfg, prompt, system);
        let out: ChatCompletionResponse = self.post_json(&self.url_chat, &body).await?;

        out.choices
            .into_iter()
            .find_map(|c| c.message.content)
            .ok_or_else(|| provider_err(ProviderErrorKind::EmptyChoices))
    }

    /// Embedding vector for a single input.
    pub async fn embeddings(&self, input: &str) -> Result<Vec<f32>, AiLlmError> {
        let mut batch = self.embeddings_batch(&[input]).await?;
        batch
            .pop()
            .ok_or_else(|| provider_err(ProviderErrorKind::Decode("empty `data` in embeddings response".into())))
    }

    /// Embedding vectors for several inputs in one request, in input order.
    pub async fn embeddings_batch(&self, inputs: &[&str]) -> Result<Vec<Vec<f32>>, AiLlmError> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }
        let body = EmbeddingsRequest {
            model: &self.cfg.model,
            input: inputs,
        };
        let out: EmbeddingsResponse = self.post_json(&self.url_embeddings, &body).await?;
        if out.data.len() != inputs.len() {
            return Err(provider_err(ProviderErrorKind::Decode(format!(
                "expected {} embeddings, got {}",
                inputs.len(),
                out.data.len()
            ))));
        }

        let mut data = out.data;
        data.sort_by_key(|item| item.index);
        Ok(data.into_iter().map(|item| item.embedding).collect())
    }

    async fn post_json<B, R>(&self, url: &str, body: &B) -> Result<R, AiLlmError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let bearer = self
            .bearer
            .clone()
            .ok_or_else(|| provider_err(ProviderErrorKind::MissingApiKey))?;

        let started = Instant::now();
        debug!(model = %self.cfg.model, "POST {url}");

        let resp = self
            .client
            .post(url)
            .header(header::AUTHORIZATION, bearer)
            .json(body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let snippet = make_snippet(&resp.text().await.unwrap_or_default());
            error!(
                %status,
                %url,
                %snippet,
                model = %self.cfg.model,
                latency_ms = started.elapsed().as_millis(),
                "OpenAI returned non-success status"
            );
            return Err(provider_err(ProviderErrorKind::HttpStatus(HttpError {
                status,
                url: url.to_string(),
                snippet,
            })));
        }

        let out = resp
            .json::<R>()
            .await
            .map_err(|e| provider_err(ProviderErrorKind::Decode(format!("serde error: {e}"))))?;

        debug!(latency_ms = started.elapsed().as_millis(), %url, "OpenAI call completed");
        Ok(out)
    }
}

fn provider_err(kind: ProviderErrorKind) -> AiLlmError {
    ProviderError::new(Provider::OpenAI, kind).into()
}

/* ===========================================================================
HTTP payloads
======================================================================== */

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

impl<'a> ChatCompletionRequest<'a> {
    fn from_cfg(cfg: &'a LlmModelConfig, prompt: &'a str, system: Option<&'a str>) -> Self {
        let mut messages = Vec::with_capacity(2);
        if let Some(sys) = system {
            messages.push(ChatMessage {
                role: "system",
                content: sys,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: prompt,
        });

        Self {
            model: &cfg.model,
            messages,
            temperature: cfg.temperature,
            top_p: cfg.top_p,
            max_tokens: cfg.max_tokens,
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessageOut,
}

#[derive(Debug, Deserialize)]
struct ChatMessageOut {
    content: Option<String>,
}

#[derive(Debug, Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingItem {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}
