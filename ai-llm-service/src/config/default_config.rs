//! Provider settings built from environment variables.
//!
//! [`LlmSettings::configure`] is the single entry point: given a temperature it
//! returns the chat, rerank and embedding profiles plus the default chunking
//! budget. The result is an explicit value that callers pass into the
//! ingestion and query pipelines.
//!
//! # Environment variables
//!
//! Common:
//! - `LLM_PROVIDER`   = `openai` (default) or `ollama`
//! - `LLM_MODEL`      = chat model
//! - `LLM_MAX_TOKENS` = max output tokens (default 512)
//! - `EMBEDDING_MODEL`, `EMBEDDING_DIM`
//! - `CHUNK_SIZE`, `CHUNK_OVERLAP` (characters)
//!
//! OpenAI: `OPENAI_API_KEY`, `OPENAI_BASE_URL`.
//! Ollama: `OLLAMA_URL` or `OLLAMA_PORT`.

use tracing::warn;

use crate::{
    config::{llm_model_config::LlmModelConfig, llm_provider::LlmProvider},
    error_handler::{
        AiLlmError, ConfigError, opt_u32, opt_usize, validate_http_endpoint, validate_range_f32,
    },
};

const OPENAI_DEFAULT_ENDPOINT: &str = "https://api.openai.com";
const OLLAMA_DEFAULT_ENDPOINT: &str = "http://localhost:11434";

/// Everything the pipelines need to talk to the provider.
#[derive(Debug, Clone, PartialEq)]
pub struct LlmSettings {
    pub provider: LlmProvider,
    /// Answer synthesis profile.
    pub chat: LlmModelConfig,
    /// Re-ranking profile (deterministic sampling).
    pub rerank: LlmModelConfig,
    /// Embedding profile.
    pub embedding: LlmModelConfig,
    /// Embedding dimensionality expected by the collection.
    pub embedding_dim: usize,
    /// Default chunk size in characters.
    pub chunk_size: usize,
    /// Overlap between consecutive chunks in characters.
    pub chunk_overlap: usize,
}

impl LlmSettings {
    /// Build settings from the process environment.
    ///
    /// A missing `OPENAI_API_KEY` only logs a warning.
    pub fn configure(temperature: f32) -> Result<Self, AiLlmError> {
        Self::configure_with(temperature, |k| std::env::var(k).ok())
    }

    /// Same as [`configure`](Self::configure) over an arbitrary key lookup.
    pub fn configure_with<F>(temperature: f32, lookup: F) -> Result<Self, AiLlmError>
    where
        F: Fn(&str) -> Option<String>,
    {
        validate_range_f32("temperature", temperature, 0.0, 2.0)?;
        let get = |k: &str| lookup(k).filter(|v| !v.trim().is_empty());

        let provider = match get("LLM_PROVIDER") {
            Some(p) => p.parse::<LlmProvider>()?,
            None => LlmProvider::OpenAI,
        };

        let (endpoint, api_key, chat_model, embed_model, default_dim) = match provider {
            LlmProvider::OpenAI => {
                let api_key = get("OPENAI_API_KEY");
                if api_key.is_none() {
                    warn!("OPENAI_API_KEY is not set; provider calls will fail until it is");
                }
                (
                    get("OPENAI_BASE_URL").unwrap_or_else(|| OPENAI_DEFAULT_ENDPOINT.into()),
                    api_key,
                    get("LLM_MODEL").unwrap_or_else(|| "gpt-4o-mini".into()),
                    get("EMBEDDING_MODEL").unwrap_or_else(|| "text-embedding-3-small".into()),
                    1536,
                )
            }
            LlmProvider::Ollama => (
                ollama_endpoint(&get)?,
                None,
                get("LLM_MODEL").unwrap_or_else(|| "qwen3:14b".into()),
                get("EMBEDDING_MODEL").unwrap_or_else(|| "bge-m3".into()),
                1024,
            ),
        };
        validate_http_endpoint("endpoint", &endpoint)?;

        let max_tokens = opt_u32("LLM_MAX_TOKENS", get("LLM_MAX_TOKENS"))?.or(Some(512));
        let embedding_dim = opt_usize("EMBEDDING_DIM", get("EMBEDDING_DIM"))?.unwrap_or(default_dim);
        let chunk_size = opt_usize("CHUNK_SIZE", get("CHUNK_SIZE"))?.unwrap_or(1024);
        let chunk_overlap = opt_usize("CHUNK_OVERLAP", get("CHUNK_OVERLAP"))?.unwrap_or(200);

        if embedding_dim == 0 {
            return Err(ConfigError::OutOfRange {
                field: "EMBEDDING_DIM",
                detail: "must be > 0",
            }
            .into());
        }
        if chunk_size == 0 || chunk_overlap >= chunk_size {
            return Err(ConfigError::OutOfRange {
                field: "CHUNK_OVERLAP",
                detail: "must be smaller than CHUNK_SIZE (> 0)",
            }
            .into());
        }
        if chat_model.trim().is_empty() || embed_model.trim().is_empty() {
            return Err(ConfigError::EmptyModel.into());
        }

        let chat = LlmModelConfig {
            provider,
            model: chat_model,
            endpoint: endpoint.clone(),
            api_key: api_key.clone(),
            max_tokens,
            temperature: Some(temperature),
            top_p: None,
            timeout_secs: Some(60),
        };
        let rerank = LlmModelConfig {
            temperature: Some(0.0),
            ..chat.clone()
        };
        let embedding = LlmModelConfig {
            provider,
            model: embed_model,
            endpoint,
            api_key,
            max_tokens: None,
            temperature: None,
            top_p: None,
            timeout_secs: Some(30),
        };

        Ok(Self {
            provider,
            chat,
            rerank,
            embedding,
            embedding_dim,
            chunk_size,
            chunk_overlap,
        })
    }
}

/// Precedence: `OLLAMA_URL`, then `OLLAMA_PORT` on localhost, then the default port.
fn ollama_endpoint<F>(get: &F) -> Result<String, AiLlmError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = get("OLLAMA_URL") {
        return Ok(url);
    }
    if let Some(port) = get("OLLAMA_PORT") {
        port.trim()
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidNumber {
                var: "OLLAMA_PORT",
                reason: "expected u16 (1..=65535)",
            })?;
        return Ok(format!("http://localhost:{}", port.trim()));
    }
    Ok(OLLAMA_DEFAULT_ENDPOINT.to_string())
}
