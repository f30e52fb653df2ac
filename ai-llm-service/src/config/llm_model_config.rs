use crate::config::llm_provider::LlmProvider;

/// Configuration for one LLM model invocation profile.
///
/// # Fields
///
/// - `provider`: which backend to call (Ollama, OpenAI).
/// - `model`: model identifier (e.g., `"gpt-4o-mini"`, `"text-embedding-3-small"`).
/// - `endpoint`: base URL of the backend, without the API path.
/// - `api_key`: optional API key; OpenAI calls fail without it.
/// - `max_tokens`: maximum number of tokens to generate.
/// - `temperature`: sampling temperature.
/// - `top_p`: nucleus sampling cutoff.
/// - `timeout_secs`: request timeout in seconds.
///
/// ```
/// use ai_llm_service::{LlmModelConfig, LlmProvider};
///
/// let cfg = LlmModelConfig {
///     provider: LlmProvider::OpenAI,
///     model: "gpt-4o-mini".to_string(),
///     endpoint: "https://api.openai.com".to_string(),
///     api_key: Some("sk-...".to_string()),
///     max_tokens: Some(512),
///     temperature: Some(0.1),
///     top_p: None,
///     timeout_secs: Some(60),
/// };
/// assert_eq!(cfg.provider, LlmProvider::OpenAI);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct LlmModelConfig {
    /// The LLM provider/backend.
    pub provider: LlmProvider,

    /// Model identifier string.
    pub model: String,

    /// Base URL of the provider API.
    pub endpoint: String,

    /// Optional API key for authentication (e.g., OpenAI).
    pub api_key: Option<String>,

    /// Maximum number of tokens to generate.
    pub max_tokens: Option<u32>,

    /// Sampling temperature.
    pub temperature: Option<f32>,

    /// Nucleus sampling parameter.
    pub top_p: Option<f32>,

    /// Optional request timeout (in seconds).
    pub timeout_secs: Option<u64>,
}
