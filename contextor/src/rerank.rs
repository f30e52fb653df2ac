//! LLM re-ranking of retrieved hits.
//!
//! The rerank profile is shown the numbered excerpts and answers with
//! `Doc: <n>, Relevance: <score>` lines. Hits it mentions are returned in
//! that order with the relevance normalized to `[0, 1]`; the rest are dropped.

use std::sync::Arc;

use ai_llm_service::LlmServiceProfiles;
use rag_store::RagHit;
use tracing::{debug, info, warn};

use crate::cfg::ContextorConfig;
use crate::error::ContextorError;
use crate::llm::{ChatModel, ProfileChat};
use crate::prompt::{RERANK_SYSTEM, rerank_prompt};

/// Characters of each excerpt shown to the rerank model.
const PER_DOC_CHARS: usize = 1200;
const MAX_RELEVANCE: f32 = 10.0;

/// A hit together with its normalized rerank relevance.
#[derive(Clone, Debug)]
pub struct RankedHit {
    pub hit: RagHit,
    pub relevance: f32,
}

pub struct Reranker {
    model: Arc<dyn ChatModel>,
    top_n: usize,
}

impl Reranker {
    pub fn new(model: Arc<dyn ChatModel>, top_n: usize) -> Self {
        Self {
            model,
            top_n: top_n.max(1),
        }
    }

    pub fn top_n(&self) -> usize {
        self.top_n
    }

    /// Reorder `hits` by LLM relevance and keep at most `top_n`.
    ///
    /// # Errors
    /// Provider failures, or a reply without a single usable `Doc:` line.
    pub async fn rerank(
        &self,
        question: &str,
        hits: &[RagHit],
    ) -> Result<Vec<RankedHit>, ContextorError> {
        if hits.is_empty() {
            return Ok(Vec::new());
        }
        let prompt = rerank_prompt(question, hits, PER_DOC_CHARS);
        let reply = self.model.complete(RERANK_SYSTEM, &prompt).await?;

        let choices = parse_choices(&reply, hits.len());
        if choices.is_empty() {
            return Err(ContextorError::Rerank(format!(
                "no ranking in reply: {}",
                crate::prompt::safe_truncate(reply.trim(), 200)
            )));
        }
        debug!(candidates = hits.len(), ranked = choices.len(), "rerank parsed");

        Ok(choices
            .into_iter()
            .take(self.top_n)
            .map(|(idx, score)| RankedHit {
                hit: hits[idx].clone(),
                relevance: (score / MAX_RELEVANCE).clamp(0.0, 1.0),
            })
            .collect())
    }
}

/// Parse `Doc: <n>, Relevance: <score>` lines into `(0-based index, score)`.
///
/// Out-of-range or repeated documents are skipped. The result is sorted by
/// score (descending); ties keep the order of the reply.
pub fn parse_choices(reply: &str, n_docs: usize) -> Vec<(usize, f32)> {
    let mut out: Vec<(usize, f32)> = Vec::new();
    for line in reply.lines() {
        let lower = line.to_ascii_lowercase();
        let Some(doc_at) = lower.find("doc") else {
            continue;
        };
        let Some(doc_no) = first_number(&lower[doc_at..]) else {
            continue;
        };
        let relevance = lower
            .find("relevance")
            .and_then(|at| first_number(&lower[at..]))
            .unwrap_or(1.0);

        let doc_no = doc_no as usize;
        if doc_no == 0 || doc_no > n_docs || out.iter().any(|(i, _)| *i == doc_no - 1) {
            continue;
        }
        out.push((doc_no - 1, relevance));
    }
    out.sort_by(|a, b| b.1.total_cmp(&a.1));
    out
}

fn first_number(s: &str) -> Option<f32> {
    let start = s.find(|c: char| c.is_ascii_digit())?;
    let rest = &s[start..];
    let end = rest
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(rest.len());
    rest[..end].trim_end_matches('.').parse().ok()
}

/// Resolve the rerank capability once at startup.
///
/// Disabled by config → `None`. Enabled but the rerank model is not reachable
/// → `None` with a warning; queries then use the retrieval order.
pub async fn resolve_reranker(
    cfg: &ContextorConfig,
    svc: &Arc<LlmServiceProfiles>,
) -> Option<Reranker> {
    if !cfg.rerank_enabled {
        debug!("re-ranking disabled");
        return None;
    }
    if !svc.rerank_available().await {
        let (_, rerank, _) = svc.profiles();
        warn!(
            model = %rerank.model,
            endpoint = %rerank.endpoint,
            "rerank model unavailable; answering without re-ranking"
        );
        return None;
    }
    info!(top_n = cfg.rerank_top_n, "re-ranking enabled");
    Some(Reranker::new(
        Arc::new(ProfileChat::rerank(svc.clone())),
        cfg.rerank_top_n,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::{ScriptedChat, hit};

    #[test]
    fn parses_llm_rerank_lines() {
        let reply = "Doc: 3, Relevance: 9\nDoc: 1, Relevance: 4\nnoise\nDoc: 7, Relevance: 10\n";
        assert_eq!(parse_choices(reply, 3), vec![(2, 9.0), (0, 4.0)]);
    }

    #[test]
    fn tolerant_of_case_and_missing_relevance() {
        let reply = "doc 2 relevance: 6.5\nDOC: 1\ndoc: 2, relevance: 10";
        assert_eq!(parse_choices(reply, 2), vec![(1, 6.5), (0, 1.0)]);
        assert!(parse_choices("I cannot rank these.", 3).is_empty());
    }

    #[tokio::test]
    async fn reorders_and_truncates_to_top_n() {
        let chat = Arc::new(ScriptedChat::new(["Doc: 2, Relevance: 8\nDoc: 3, Relevance: 5\nDoc: 1, Relevance: 2"]));
        let rr = Reranker::new(chat.clone(), 2);
        let hits = vec![hit("a.pdf", "1", "one"), hit("a.pdf", "2", "two"), hit("b.pdf", "1", "three")];

        let ranked = rr.rerank("q", &hits).await.unwrap();
        let texts: Vec<&str> = ranked.iter().map(|r| r.hit.text.as_str()).collect();
        assert_eq!(texts, vec!["two", "three"]);
        assert!((ranked[0].relevance - 0.8).abs() < 1e-6);
        assert!(chat.prompts()[0].contains("Document 3:\nthree"));
    }

    #[tokio::test]
    async fn unusable_reply_is_an_error() {
        let rr = Reranker::new(Arc::new(ScriptedChat::new(["no idea"])), 3);
        let res = rr.rerank("q", &[hit("a.pdf", "1", "one")]).await;
        assert!(matches!(res, Err(ContextorError::Rerank(_))));
    }

    fn unreachable_profiles() -> Arc<LlmServiceProfiles> {
        use ai_llm_service::{LlmModelConfig, LlmProvider};
        let cfg = |model: &str| LlmModelConfig {
            provider: LlmProvider::Ollama,
            model: model.into(),
            endpoint: "http://127.0.0.1:9".into(),
            api_key: None,
            max_tokens: None,
            temperature: None,
            top_p: None,
            timeout_secs: Some(1),
        };
        Arc::new(
            LlmServiceProfiles::new(cfg("qwen3:14b"), Some(cfg("qwen3:14b")), cfg("bge-m3"), Some(1))
                .unwrap(),
        )
    }

    #[tokio::test]
    async fn unreachable_rerank_model_disables_reranking() {
        let cfg = ContextorConfig {
            rerank_enabled: true,
            ..ContextorConfig::default()
        };
        assert!(resolve_reranker(&cfg, &unreachable_profiles()).await.is_none());
    }

    #[tokio::test]
    async fn disabled_reranking_never_calls_the_model() {
        let cfg = ContextorConfig {
            rerank_enabled: false,
            ..ContextorConfig::default()
        };
        assert!(resolve_reranker(&cfg, &unreachable_profiles()).await.is_none());
    }
}
