pub mod api_keys;
pub mod default_config;
pub mod llm_model_config;
pub mod llm_provider;
