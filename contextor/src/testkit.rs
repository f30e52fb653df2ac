//! Deterministic doubles for the query pipeline tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::{future::Future, pin::Pin};

use rag_store::{EmbeddingsProvider, RagError, RagHit};
use serde_json::json;

use crate::error::ContextorError;
use crate::llm::{ChatFuture, ChatModel};

/// Replies with the scripted answers in order, then "ok". Records every user prompt.
pub struct ScriptedChat {
    replies: Mutex<VecDeque<Result<String, String>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedChat {
    pub fn new<const N: usize>(replies: [&str; N]) -> Self {
        Self {
            replies: Mutex::new(replies.iter().map(|r| Ok(r.to_string())).collect()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Every call fails with a provider-like error.
    pub fn failing() -> Self {
        let s = Self::new([]);
        s.replies.lock().unwrap().push_back(Err("provider down".into()));
        s
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

impl ChatModel for ScriptedChat {
    fn complete<'a>(&'a self, _system: &'a str, user: &'a str) -> ChatFuture<'a> {
        Box::pin(async move {
            self.prompts.lock().unwrap().push(user.to_string());
            let mut replies = self.replies.lock().unwrap();
            match replies.front() {
                Some(Err(e)) => Err(ContextorError::Rerank(e.clone())),
                Some(Ok(_)) => Ok(replies.pop_front().and_then(Result::ok).unwrap_or_default()),
                None => Ok("ok".to_string()),
            }
        })
    }
}

/// Bag-of-letters embedder (26 dims).
pub struct LetterEmbedder;

impl EmbeddingsProvider for LetterEmbedder {
    fn embed<'a>(
        &'a self,
        text: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<f32>, RagError>> + Send + 'a>> {
        Box::pin(async move {
            let mut v = vec![0.0f32; 26];
            for b in text.bytes().filter(u8::is_ascii_alphabetic) {
                v[(b.to_ascii_lowercase() - b'a') as usize] += 1.0;
            }
            Ok(v)
        })
    }

    fn dim(&self) -> Option<usize> {
        Some(26)
    }
}

pub fn hit(source: &str, page: &str, text: &str) -> RagHit {
    RagHit::from_payload(
        0.5,
        json!({"doc_id": "d", "source": source, "page_label": page, "chunk_index": 0, "text": text}),
    )
}
