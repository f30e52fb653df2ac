//! Credentials read once at startup.
//!
//! A missing key is never fatal: it is reported as a warning and the provider
//! call that needs it fails later with
//! [`ProviderErrorKind::MissingApiKey`](crate::error_handler::ProviderErrorKind::MissingApiKey).

use tracing::{info, warn};

/// API keys and tokens consumed by the app.
#[derive(Clone, Default)]
pub struct ApiKeys {
    /// `OPENAI_API_KEY`: LLM and embedding provider key.
    pub openai: Option<String>,
    /// `SERPER_API_KEY`: web search key.
    pub serper: Option<String>,
    /// `AUTH_TOKEN`: bearer token guarding the upload/query routes.
    pub auth_token: Option<String>,
}

impl std::fmt::Debug for ApiKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiKeys")
            .field("openai", &presence(&self.openai))
            .field("serper", &presence(&self.serper))
            .field("auth_token", &presence(&self.auth_token))
            .finish()
    }
}

impl ApiKeys {
    pub fn from_env() -> Self {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |k: &str| lookup(k).filter(|v| !v.trim().is_empty());
        Self {
            openai: read("OPENAI_API_KEY"),
            serper: read("SERPER_API_KEY"),
            auth_token: read("AUTH_TOKEN"),
        }
    }

    /// `(name, found)` pairs in a stable order.
    pub fn status(&self) -> [(&'static str, bool); 3] {
        [
            ("OPENAI_API_KEY", self.openai.is_some()),
            ("SERPER_API_KEY", self.serper.is_some()),
            ("AUTH_TOKEN", self.auth_token.is_some()),
        ]
    }

    /// Log which keys were found. Missing keys are warnings only.
    pub fn report(&self) {
        for (name, found) in self.status() {
            if found {
                info!(key = name, "environment key found");
            } else {
                warn!(key = name, "environment key missing");
            }
        }
    }
}

fn presence(v: &Option<String>) -> &'static str {
    if v.is_some() { "Found" } else { "Missing" }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_values_count_as_missing() {
        let keys = ApiKeys::from_lookup(|k| match k {
            "OPENAI_API_KEY" => Some("sk-test".into()),
            "SERPER_API_KEY" => Some("   ".into()),
            _ => None,
        });
        assert_eq!(
            keys.status(),
            [
                ("OPENAI_API_KEY", true),
                ("SERPER_API_KEY", false),
                ("AUTH_TOKEN", false)
            ]
        );
    }

    #[test]
    fn debug_never_prints_secrets() {
        let keys = ApiKeys {
            openai: Some("sk-secret".into()),
            ..Default::default()
        };
        let dbg = format!("{keys:?}");
        assert!(!dbg.contains("sk-secret"));
        assert!(dbg.contains("Found"));
    }
}
