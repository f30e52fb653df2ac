//! Query pipeline: retrieval + optional re-ranking + LLM synthesis.
//!
//! [`QueryEngine::ask`] scopes the question (`doc_id` over `source`), embeds
//! it, retrieves top-K hits from the [`VectorStore`], optionally re-ranks them
//! with the rerank profile, synthesizes an answer (`compact` or
//! `tree_summarize`) and reports the distinct `(filename, page)` sources of
//! the chunks it used.

mod api_types;
pub mod cfg;
mod error;
mod llm;
pub mod prompt;
pub mod rerank;
pub mod synth;

#[cfg(test)]
mod testkit;

pub use api_types::{AskOptions, EMPTY_CONTEXT_ANSWER, QaAnswer, SourceRef, UsedChunk};
pub use cfg::{ContextorConfig, ResponseMode};
pub use error::ContextorError;
pub use llm::{ChatFuture, ChatModel, ProfileChat};
pub use rerank::{RankedHit, Reranker, resolve_reranker};

use std::sync::Arc;

use ai_llm_service::LlmServiceProfiles;
use rag_store::{EmbeddingsProvider, RagFilter, RagHit, RagQuery, VectorStore, rag_context};
use tracing::{debug, info, instrument, warn};

/// Characters of each used chunk echoed back to callers.
const USED_TEXT_CHARS: usize = 800;

/// Shared, immutable query pipeline.
pub struct QueryEngine {
    cfg: ContextorConfig,
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn EmbeddingsProvider>,
    chat: Arc<dyn ChatModel>,
    reranker: Option<Reranker>,
}

impl QueryEngine {
    pub fn new(
        cfg: ContextorConfig,
        store: Arc<dyn VectorStore>,
        embedder: Arc<dyn EmbeddingsProvider>,
        chat: Arc<dyn ChatModel>,
        reranker: Option<Reranker>,
    ) -> Self {
        Self {
            cfg,
            store,
            embedder,
            chat,
            reranker,
        }
    }

    /// Wire the engine over the shared LLM service; the rerank capability is
    /// resolved here, once.
    pub async fn from_profiles(
        cfg: ContextorConfig,
        store: Arc<dyn VectorStore>,
        embedder: Arc<dyn EmbeddingsProvider>,
        svc: Arc<LlmServiceProfiles>,
    ) -> Self {
        let reranker = resolve_reranker(&cfg, &svc).await;
        let chat = Arc::new(ProfileChat::chat(svc));
        Self::new(cfg, store, embedder, chat, reranker)
    }

    pub fn config(&self) -> &ContextorConfig {
        &self.cfg
    }

    pub fn reranking(&self) -> bool {
        self.reranker.is_some()
    }

    /// Retrieval only: scoped top-K hits, no re-ranking, no chat.
    ///
    /// # Errors
    /// `InvalidRequest` for an empty question or `top_k` outside `[1, 20]`;
    /// otherwise embedding / vector-store failures.
    pub async fn retrieve(
        &self,
        question: &str,
        opts: &AskOptions,
    ) -> Result<Vec<RagHit>, ContextorError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(ContextorError::InvalidRequest("question is empty".into()));
        }
        let top_k = self.cfg.top_k(opts.top_k)?;

        let given = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
        if given(&opts.doc_id) && given(&opts.source) {
            debug!(source = ?opts.source, "doc_id given; source filter ignored");
        }
        let filter = RagFilter::scope(opts.doc_id.as_deref(), opts.source.as_deref());

        let query = RagQuery {
            text: question,
            top_k,
            filter,
        };
        Ok(rag_context(self.store.as_ref(), query, self.embedder.as_ref()).await?)
    }

    /// Answer a question from the indexed documents.
    ///
    /// No hits → [`QaAnswer::empty_context`] without calling the LLM.
    /// A failing re-ranker degrades to the retrieval order with a warning.
    #[instrument(skip_all, fields(top_k = ?opts.top_k, doc_id = ?opts.doc_id, source = ?opts.source))]
    pub async fn ask(&self, question: &str, opts: AskOptions) -> Result<QaAnswer, ContextorError> {
        let hits = self.retrieve(question, &opts).await?;
        if hits.is_empty() {
            info!("no context retrieved");
            return Ok(QaAnswer::empty_context());
        }

        let (hits, confidence) = match &self.reranker {
            Some(rr) => match rr.rerank(question, &hits).await {
                Ok(ranked) if !ranked.is_empty() => {
                    let top = ranked.first().map(|r| r.relevance);
                    (ranked.into_iter().map(|r| r.hit).collect(), top)
                }
                Ok(_) => (hits, None),
                Err(e) => {
                    warn!(error = %e, "re-ranking failed; using retrieval order");
                    (hits, None)
                }
            },
            None => (hits, None),
        };

        let answer = synth::synthesize(
            self.chat.as_ref(),
            self.cfg.response_mode,
            question.trim(),
            &hits,
            self.cfg.max_ctx_chars,
        )
        .await?;

        let sources = distinct_sources(&hits);
        info!(
            used = hits.len(),
            sources = sources.len(),
            reranked = confidence.is_some(),
            "answer synthesized"
        );

        let used = hits
            .into_iter()
            .map(|h| UsedChunk {
                score: h.score,
                text: prompt::safe_truncate(h.text.trim(), USED_TEXT_CHARS).to_string(),
                doc_id: h.doc_id,
                source: h.source,
                page_label: h.page_label,
            })
            .collect();

        Ok(QaAnswer {
            answer,
            sources,
            used,
            confidence,
        })
    }
}

/// Distinct `(filename, page)` pairs in rank order.
pub fn distinct_sources(hits: &[RagHit]) -> Vec<SourceRef> {
    let mut out: Vec<SourceRef> = Vec::new();
    for h in hits {
        let Some(filename) = h.source.clone() else {
            continue;
        };
        let r = SourceRef {
            filename,
            page: h.page_label.clone(),
        };
        if !out.contains(&r) {
            out.push(r);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::{LetterEmbedder, ScriptedChat, hit};
    use rag_store::{ChunkRecord, MemoryStore, embed_chunks};

    async fn seeded() -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new("docs", 26));
        store.ensure_collection().await.unwrap();
        let mut chunks: Vec<ChunkRecord> = [
            ("d-report", "report.pdf", "1", "revenue grew in every region"),
            ("d-report", "report.pdf", "2", "revenue forecast for next year"),
            ("d-zoo", "zoo.pdf", "1", "zebras sleep standing up"),
        ]
        .iter()
        .enumerate()
        .map(|(i, (doc, src, page, text))| ChunkRecord {
            doc_id: doc.to_string(),
            source: src.to_string(),
            page_label: Some(page.to_string()),
            chunk_index: i,
            text: text.to_string(),
            embedding: None,
        })
        .collect();
        embed_chunks(&mut chunks, &LetterEmbedder, 2).await.unwrap();
        store.upsert_chunks(&chunks).await.unwrap();
        store
    }

    fn engine(
        store: Arc<MemoryStore>,
        chat: Arc<ScriptedChat>,
        reranker: Option<Reranker>,
    ) -> QueryEngine {
        QueryEngine::new(
            ContextorConfig::default(),
            store,
            Arc::new(LetterEmbedder),
            chat,
            reranker,
        )
    }

    #[tokio::test]
    async fn doc_id_scope_only_returns_that_document() {
        let chat = Arc::new(ScriptedChat::new(["about zebras"]));
        let qe = engine(seeded().await, chat, None);
        let opts = AskOptions {
            top_k: Some(5),
            doc_id: Some("d-zoo".into()),
            source: Some("report.pdf".into()),
        };
        let qa = qe.ask("revenue?", opts).await.unwrap();
        assert_eq!(qa.answer, "about zebras");
        assert_eq!(
            qa.sources,
            vec![SourceRef {
                filename: "zoo.pdf".into(),
                page: Some("1".into())
            }]
        );
        assert!(qa.confidence.is_none());
    }

    #[tokio::test]
    async fn source_scope_and_unknown_doc_id() {
        let qe = engine(seeded().await, Arc::new(ScriptedChat::new([])), None);
        let qa = qe
            .ask(
                "what about revenue",
                AskOptions {
                    source: Some("report.pdf".into()),
                    top_k: Some(20),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(qa.sources.len(), 2);
        assert!(qa.sources.iter().all(|s| s.filename == "report.pdf"));

        let none = qe
            .ask(
                "revenue",
                AskOptions {
                    doc_id: Some("missing".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(none.answer, EMPTY_CONTEXT_ANSWER);
        assert!(none.sources.is_empty());
    }

    #[tokio::test]
    async fn empty_store_answers_without_calling_the_llm() {
        let chat = Arc::new(ScriptedChat::new([]));
        let qe = engine(
            Arc::new(MemoryStore::new("docs", 26)),
            chat.clone(),
            None,
        );
        let qa = qe.ask("anything?", AskOptions::default()).await.unwrap();
        assert_eq!(qa.answer, EMPTY_CONTEXT_ANSWER);
        assert!(chat.prompts().is_empty());
    }

    #[tokio::test]
    async fn top_k_and_question_are_validated() {
        let qe = engine(seeded().await, Arc::new(ScriptedChat::new([])), None);
        for k in [0, 21] {
            let res = qe
                .ask("q", AskOptions { top_k: Some(k), ..Default::default() })
                .await;
            assert!(matches!(res, Err(ContextorError::InvalidRequest(_))));
        }
        assert!(matches!(
            qe.ask("   ", AskOptions::default()).await,
            Err(ContextorError::InvalidRequest(_))
        ));
    }

    #[tokio::test]
    async fn rerank_orders_sources_and_sets_confidence() {
        let rr_chat = Arc::new(ScriptedChat::new(["Doc: 2, Relevance: 9\nDoc: 1, Relevance: 3"]));
        let qe = engine(
            seeded().await,
            Arc::new(ScriptedChat::new(["answer"])),
            Some(Reranker::new(rr_chat, 3)),
        );
        let qa = qe
            .ask("revenue grew", AskOptions { top_k: Some(2), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(qa.confidence, Some(0.9));
        assert_eq!(qa.used.len(), 2);
        assert_eq!(qa.sources.len(), 2);
    }

    #[tokio::test]
    async fn failing_reranker_degrades_to_retrieval_order() {
        let qe = engine(
            seeded().await,
            Arc::new(ScriptedChat::new(["still answered"])),
            Some(Reranker::new(Arc::new(ScriptedChat::failing()), 3)),
        );
        let qa = qe.ask("revenue", AskOptions::default()).await.unwrap();
        assert_eq!(qa.answer, "still answered");
        assert!(qa.confidence.is_none());
        assert_eq!(qa.used.len(), 3);
    }

    #[test]
    fn sources_are_distinct_in_rank_order() {
        let hits = vec![
            hit("b.pdf", "2", "x"),
            hit("a.pdf", "1", "y"),
            hit("b.pdf", "2", "z"),
            hit("b.pdf", "3", "w"),
        ];
        let names: Vec<(String, Option<String>)> = distinct_sources(&hits)
            .into_iter()
            .map(|s| (s.filename, s.page))
            .collect();
        assert_eq!(
            names,
            vec![
                ("b.pdf".into(), Some("2".into())),
                ("a.pdf".into(), Some("1".into())),
                ("b.pdf".into(), Some("3".into())),
            ]
        );
    }
}
