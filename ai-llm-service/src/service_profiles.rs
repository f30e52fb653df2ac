//! Shared LLM service with three profiles: `chat`, `rerank` and `embedding`.
//!
//! Construct once, wrap in `Arc`, and pass clones to the pipelines. HTTP
//! clients are created lazily and cached per distinct config, so building
//! the service never touches the network. When no rerank profile is given
//! it falls back to `chat`.
//!
//! # Example
//! ```no_run
//! use std::sync::Arc;
//! use ai_llm_service::{LlmServiceProfiles, LlmSettings};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let settings = LlmSettings::configure(0.1)?;
//! let svc = Arc::new(LlmServiceProfiles::from_settings(&settings, Some(10))?);
//!
//! let answer = svc.generate_chat("What is Qdrant?", None).await?;
//! let vector = svc.embed("Ferris").await?;
//! println!("{answer} / dim = {}", vector.len());
//! # Ok(()) }
//! ```

use std::{collections::HashMap, sync::Arc};

use tokio::sync::RwLock;

use crate::{
    config::{
        default_config::LlmSettings, llm_model_config::LlmModelConfig, llm_provider::LlmProvider,
    },
    error_handler::AiLlmError,
    health_service::{HealthService, HealthStatus},
    services::{ollama_service::OllamaService, open_ai_service::OpenAiService},
};

/// Manages the chat, rerank and embedding profiles.
pub struct LlmServiceProfiles {
    chat: LlmModelConfig,
    rerank: LlmModelConfig,
    embedding: LlmModelConfig,

    ollama: RwLock<HashMap<ClientKey, Arc<OllamaService>>>,
    openai: RwLock<HashMap<ClientKey, Arc<OpenAiService>>>,

    health: HealthService,
}

impl LlmServiceProfiles {
    /// - `chat`: answer synthesis profile.
    /// - `rerank_opt`: re-ranking profile, defaults to `chat`.
    /// - `embedding`: embedding profile.
    /// - `health_timeout_secs`: timeout for health probes.
    pub fn new(
        chat: LlmModelConfig,
        rerank_opt: Option<LlmModelConfig>,
        embedding: LlmModelConfig,
        health_timeout_secs: Option<u64>,
    ) -> Result<Self, AiLlmError> {
        let rerank = rerank_opt.unwrap_or_else(|| chat.clone());
        Ok(Self {
            chat,
            rerank,
            embedding,
            ollama: RwLock::new(HashMap::new()),
            openai: RwLock::new(HashMap::new()),
            health: HealthService::new(health_timeout_secs)?,
        })
    }

    pub fn from_settings(
        settings: &LlmSettings,
        health_timeout_secs: Option<u64>,
    ) -> Result<Self, AiLlmError> {
        Self::new(
            settings.chat.clone(),
            Some(settings.rerank.clone()),
            settings.embedding.clone(),
            health_timeout_secs,
        )
    }

    /// Generate with the chat profile.
    pub async fn generate_chat(
        &self,
        prompt: &str,
        system: Option<&str>,
    ) -> Result<String, AiLlmError> {
        self.generate_with(&self.chat, prompt, system).await
    }

    /// Generate with the rerank profile.
    pub async fn generate_rerank(
        &self,
        prompt: &str,
        system: Option<&str>,
    ) -> Result<String, AiLlmError> {
        self.generate_with(&self.rerank, prompt, system).await
    }

    /// Embed one text with the embedding profile.
    pub async fn embed(&self, input: &str) -> Result<Vec<f32>, AiLlmError> {
        match self.embedding.provider {
            LlmProvider::Ollama => self.ollama_client(&self.embedding).await?.embeddings(input).await,
            LlmProvider::OpenAI => self.openai_client(&self.embedding).await?.embeddings(input).await,
        }
    }

    /// Embed several texts in one provider request, in input order.
    pub async fn embed_many(&self, inputs: &[&str]) -> Result<Vec<Vec<f32>>, AiLlmError> {
        match self.embedding.provider {
            LlmProvider::OpenAI => {
                self.openai_client(&self.embedding)
                    .await?
                    .embeddings_batch(inputs)
                    .await
            }
            LlmProvider::Ollama => self.ollama_client(&self.embedding).await?.embed_batch(inputs).await,
        }
    }

    /// Health of every distinct profile; duplicates are probed once.
    pub async fn health_all(&self) -> Vec<HealthStatus> {
        let mut list: Vec<LlmModelConfig> = Vec::with_capacity(3);
        for cfg in [&self.chat, &self.rerank, &self.embedding] {
            if !list.iter().any(|c| ClientKey::from(c) == ClientKey::from(cfg)) {
                list.push(cfg.clone());
            }
        }
        self.health.check_many(&list).await
    }

    /// Whether the rerank model is reachable and served by the backend.
    pub async fn rerank_available(&self) -> bool {
        self.health.check(&self.rerank).await.ok
    }

    /// `(chat, rerank, embedding)`.
    pub fn profiles(&self) -> (&LlmModelConfig, &LlmModelConfig, &LlmModelConfig) {
        (&self.chat, &self.rerank, &self.embedding)
    }

    /* --------------------- Internals --------------------- */

    async fn generate_with(
        &self,
        cfg: &LlmModelConfig,
        prompt: &str,
        system: Option<&str>,
    ) -> Result<String, AiLlmError> {
        match cfg.provider {
            LlmProvider::Ollama => self.ollama_client(cfg).await?.generate(prompt, system).await,
            LlmProvider::OpenAI => self.openai_client(cfg).await?.generate(prompt, system).await,
        }
    }

    async fn ollama_client(&self, cfg: &LlmModelConfig) -> Result<Arc<OllamaService>, AiLlmError> {
        let key = ClientKey::from(cfg);
        if let Some(cli) = self.ollama.read().await.get(&key).cloned() {
            return Ok(cli);
        }
        let mut w = self.ollama.write().await;
        if let Some(cli) = w.get(&key) {
            return Ok(cli.clone());
        }
        let cli = Arc::new(OllamaService::new(cfg.clone())?);
        w.insert(key, cli.clone());
        Ok(cli)
    }

    async fn openai_client(&self, cfg: &LlmModelConfig) -> Result<Arc<OpenAiService>, AiLlmError> {
        let key = ClientKey::from(cfg);
        if let Some(cli) = self.openai.read().await.get(&key).cloned() {
            return Ok(cli);
        }
        let mut w = self.openai.write().await;
        if let Some(cli) = w.get(&key) {
            return Ok(cli.clone());
        }
        let cli = Arc::new(OpenAiService::new(cfg.clone())?);
        w.insert(key, cli.clone());
        Ok(cli)
    }
}

/// Identifies a distinct client configuration.
///
/// Sampling parameters are part of the key because they are baked into the
/// request body built by each client.
#[derive(Clone, PartialEq, Eq, Hash)]
struct ClientKey {
    provider: LlmProvider,
    endpoint: String,
    model: String,
    api_key: Option<String>,
    timeout: Option<u64>,
    max_tokens: Option<u32>,
    temperature_bits: Option<u32>,
    top_p_bits: Option<u32>,
}

impl From<&LlmModelConfig> for ClientKey {
    fn from(cfg: &LlmModelConfig) -> Self {
        Self {
            provider: cfg.provider,
            endpoint: cfg.endpoint.clone(),
            model: cfg.model.clone(),
            api_key: cfg.api_key.clone(),
            timeout: cfg.timeout_secs,
            max_tokens: cfg.max_tokens,
            temperature_bits: cfg.temperature.map(f32::to_bits),
            top_p_bits: cfg.top_p.map(f32::to_bits),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ollama(model: &str, temperature: Option<f32>) -> LlmModelConfig {
        LlmModelConfig {
            provider: LlmProvider::Ollama,
            model: model.into(),
            endpoint: "http://localhost:11434".into(),
            api_key: None,
            max_tokens: Some(128),
            temperature,
            top_p: None,
            timeout_secs: Some(5),
        }
    }

    #[test]
    fn rerank_falls_back_to_chat() {
        let svc = LlmServiceProfiles::new(
            ollama("qwen3:14b", Some(0.1)),
            None,
            ollama("bge-m3", None),
            Some(1),
        )
        .unwrap();
        let (chat, rerank, embedding) = svc.profiles();
        assert_eq!(chat, rerank);
        assert_eq!(embedding.model, "bge-m3");
    }

    #[test]
    fn sampling_params_distinguish_clients() {
        let a = ClientKey::from(&ollama("qwen3:14b", Some(0.1)));
        let b = ClientKey::from(&ollama("qwen3:14b", Some(0.0)));
        assert!(a != b);
        assert!(a == ClientKey::from(&ollama("qwen3:14b", Some(0.1))));
    }

    #[tokio::test]
    async fn clients_are_cached_per_config() {
        let svc = LlmServiceProfiles::new(
            ollama("qwen3:14b", Some(0.1)),
            Some(ollama("qwen3:14b", Some(0.0))),
            ollama("bge-m3", None),
            Some(1),
        )
        .unwrap();
        let first = svc.ollama_client(&svc.chat).await.unwrap();
        let again = svc.ollama_client(&svc.chat).await.unwrap();
        assert!(Arc::ptr_eq(&first, &again));
        svc.ollama_client(&svc.rerank).await.unwrap();
        assert_eq!(svc.ollama.read().await.len(), 2);
    }

    #[tokio::test]
    async fn invalid_client_config_is_an_error_not_a_panic() {
        let mut bad = ollama("qwen3:14b", None);
        bad.endpoint = "localhost".into();
        let svc = LlmServiceProfiles::new(bad, None, ollama("bge-m3", None), Some(1)).unwrap();
        assert!(svc.generate_chat("hi", None).await.is_err());
    }
}
