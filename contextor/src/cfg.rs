//! Runtime configuration loaded from environment variables.

use std::str::FromStr;

use crate::error::ContextorError;

/// How retrieved chunks are combined into one answer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ResponseMode {
    /// Pack chunks into as few prompts as fit the budget; refine the answer pack by pack.
    #[default]
    Compact,
    /// Answer every pack, then summarize the partial answers until one remains.
    TreeSummarize,
}

impl FromStr for ResponseMode {
    type Err = ContextorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(ResponseMode::Compact),
            "tree_summarize" | "tree-summarize" | "tree" => Ok(ResponseMode::TreeSummarize),
            other => Err(ContextorError::Config(format!(
                "RESPONSE_MODE must be compact or tree_summarize, got {other:?}"
            ))),
        }
    }
}

/// Config bag for the query pipeline. All fields have defaults via `from_env`.
#[derive(Clone, Debug, PartialEq)]
pub struct ContextorConfig {
    /// `top_k` used when the caller gives none.
    pub default_top_k: u64,
    /// Inclusive upper bound for `top_k`.
    pub max_top_k: u64,

    pub rerank_enabled: bool,
    /// Hits kept after re-ranking.
    pub rerank_top_n: usize,

    pub response_mode: ResponseMode,
    /// Character budget of the context block of a single prompt.
    pub max_ctx_chars: usize,
}

impl Default for ContextorConfig {
    fn default() -> Self {
        Self {
            default_top_k: 3,
            max_top_k: 20,
            rerank_enabled: false,
            rerank_top_n: 3,
            response_mode: ResponseMode::Compact,
            max_ctx_chars: 8500,
        }
    }
}

impl ContextorConfig {
    /// Build from environment variables with sensible defaults.
    ///
    /// - `RERANK_ENABLED` (`true`/`1`), `RERANK_TOP_N`
    /// - `RESPONSE_MODE` (`compact` | `tree_summarize`)
    /// - `MAX_CTX_CHARS`, `RAG_TOP_K`
    pub fn from_env() -> Result<Self, ContextorError> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ContextorError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |k: &str| lookup(k).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let d = Self::default();

        let cfg = Self {
            default_top_k: parse(&get, "RAG_TOP_K", d.default_top_k)?,
            max_top_k: d.max_top_k,
            rerank_enabled: get("RERANK_ENABLED")
                .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
                .unwrap_or(d.rerank_enabled),
            rerank_top_n: parse(&get, "RERANK_TOP_N", d.rerank_top_n)?,
            response_mode: match get("RESPONSE_MODE") {
                Some(m) => m.parse()?,
                None => d.response_mode,
            },
            max_ctx_chars: parse(&get, "MAX_CTX_CHARS", d.max_ctx_chars)?,
        };
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ContextorError> {
        if !(1..=self.max_top_k).contains(&self.default_top_k) {
            return Err(ContextorError::Config(format!(
                "RAG_TOP_K must be in [1, {}]",
                self.max_top_k
            )));
        }
        if self.rerank_top_n == 0 {
            return Err(ContextorError::Config("RERANK_TOP_N must be > 0".into()));
        }
        if self.max_ctx_chars < 256 {
            return Err(ContextorError::Config("MAX_CTX_CHARS must be >= 256".into()));
        }
        Ok(())
    }

    /// Resolve the caller's `top_k`, rejecting values outside `[1, max_top_k]`.
    pub fn top_k(&self, requested: Option<u64>) -> Result<u64, ContextorError> {
        let k = requested.unwrap_or(self.default_top_k);
        if !(1..=self.max_top_k).contains(&k) {
            return Err(ContextorError::InvalidRequest(format!(
                "top_k must be between 1 and {}, got {k}",
                self.max_top_k
            )));
        }
        Ok(k)
    }
}

fn parse<T: FromStr>(
    get: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    dflt: T,
) -> Result<T, ContextorError> {
    match get(key) {
        Some(v) => v
            .parse()
            .map_err(|_| ContextorError::Config(format!("{key} is not valid: {v:?}"))),
        None => Ok(dflt),
    }
}
