//! Shared LLM layer for the RAG app.
//!
//! - [`config`]: provider/model settings built explicitly from the environment
//!   (no process-wide state), plus the API key report.
//! - [`services`]: thin HTTP clients for OpenAI and Ollama.
//! - [`service_profiles`]: one shared service exposing chat, rerank and
//!   embedding profiles over those clients.
//! - [`health_service`]: best-effort provider probes.

pub mod config;
pub mod error_handler;
pub mod health_service;
pub mod service_profiles;
pub mod services;

pub use config::api_keys::ApiKeys;
pub use config::default_config::LlmSettings;
pub use config::llm_model_config::LlmModelConfig;
pub use config::llm_provider::LlmProvider;
pub use error_handler::AiLlmError;
pub use service_profiles::LlmServiceProfiles;
