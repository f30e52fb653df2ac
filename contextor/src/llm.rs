//! Chat seam over the shared LLM service.

use std::{future::Future, pin::Pin, sync::Arc};

use ai_llm_service::LlmServiceProfiles;

use crate::error::ContextorError;

/// Boxed future returned by [`ChatModel::complete`].
pub type ChatFuture<'a> = Pin<Box<dyn Future<Output = Result<String, ContextorError>> + Send + 'a>>;

/// Non-streaming completion: `(system, user)` in, assistant text out.
pub trait ChatModel: Send + Sync {
    fn complete<'a>(&'a self, system: &'a str, user: &'a str) -> ChatFuture<'a>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Profile {
    Chat,
    Rerank,
}

/// [`ChatModel`] backed by one profile of [`LlmServiceProfiles`].
///
/// # Example
/// ```no_run
/// # use std::sync::Arc;
/// # use ai_llm_service::{LlmServiceProfiles, LlmSettings};
/// # use contextor::{ChatModel, ProfileChat};
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let settings = LlmSettings::configure(0.1)?;
/// let svc = Arc::new(LlmServiceProfiles::from_settings(&settings, None)?);
/// let chat = ProfileChat::chat(svc);
/// let out = chat.complete("Be brief.", "2+2=").await?;
/// println!("{out}");
/// # Ok(()) }
/// ```
#[derive(Clone)]
pub struct ProfileChat {
    svc: Arc<LlmServiceProfiles>,
    profile: Profile,
}

impl ProfileChat {
    /// Answer synthesis.
    pub fn chat(svc: Arc<LlmServiceProfiles>) -> Self {
        Self {
            svc,
            profile: Profile::Chat,
        }
    }

    /// Re-ranking (deterministic sampling).
    pub fn rerank(svc: Arc<LlmServiceProfiles>) -> Self {
        Self {
            svc,
            profile: Profile::Rerank,
        }
    }
}

impl ChatModel for ProfileChat {
    fn complete<'a>(&'a self, system: &'a str, user: &'a str) -> ChatFuture<'a> {
        Box::pin(async move {
            let out = match self.profile {
                Profile::Chat => self.svc.generate_chat(user, Some(system)).await?,
                Profile::Rerank => self.svc.generate_rerank(user, Some(system)).await?,
            };
            Ok(out)
        })
    }
}
