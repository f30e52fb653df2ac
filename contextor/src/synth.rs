//! Answer synthesis over retrieved hits.

use futures::future::try_join_all;
use rag_store::RagHit;
use tracing::debug;

use crate::cfg::ResponseMode;
use crate::error::ContextorError;
use crate::llm::ChatModel;
use crate::prompt::{
    DEFAULT_SYSTEM, build_user_prompt, hit_header, refine_prompt, summarize_prompt,
};

/// Greedy packing in ranking order: a new pack starts when the next hit would
/// push the context block over `max_chars`. An oversize hit gets a pack of
/// its own and is truncated when the prompt is built.
pub fn pack_hits(hits: &[RagHit], max_chars: usize) -> Vec<Vec<&RagHit>> {
    let mut packs: Vec<Vec<&RagHit>> = Vec::new();
    let mut current: Vec<&RagHit> = Vec::new();
    let mut used = 0usize;

    for h in hits {
        let cost = hit_header(current.len() + 1, h).len() + h.text.trim().len() + 1;
        if !current.is_empty() && used + cost > max_chars {
            packs.push(std::mem::take(&mut current));
            used = 0;
        }
        used += cost;
        current.push(h);
    }
    if !current.is_empty() {
        packs.push(current);
    }
    packs
}

/// Combine `hits` into one answer with `mode`. `hits` must not be empty.
pub async fn synthesize(
    model: &dyn ChatModel,
    mode: ResponseMode,
    question: &str,
    hits: &[RagHit],
    max_chars: usize,
) -> Result<String, ContextorError> {
    let packs = pack_hits(hits, max_chars);
    debug!(?mode, hits = hits.len(), packs = packs.len(), "synthesizing");
    match mode {
        ResponseMode::Compact => compact(model, question, &packs, max_chars).await,
        ResponseMode::TreeSummarize => tree_summarize(model, question, &packs, max_chars).await,
    }
}

async fn compact(
    model: &dyn ChatModel,
    question: &str,
    packs: &[Vec<&RagHit>],
    max_chars: usize,
) -> Result<String, ContextorError> {
    let Some((first, rest)) = packs.split_first() else {
        return Ok(String::new());
    };
    let mut answer = model
        .complete(DEFAULT_SYSTEM, &build_user_prompt(question, first, max_chars))
        .await?;
    for pack in rest {
        let prompt = refine_prompt(question, &answer, pack, max_chars);
        answer = model.complete(DEFAULT_SYSTEM, &prompt).await?;
    }
    Ok(answer.trim().to_string())
}

async fn tree_summarize(
    model: &dyn ChatModel,
    question: &str,
    packs: &[Vec<&RagHit>],
    max_chars: usize,
) -> Result<String, ContextorError> {
    let prompts: Vec<String> = packs
        .iter()
        .map(|p| build_user_prompt(question, p, max_chars))
        .collect();
    let mut level: Vec<String> = try_join_all(
        prompts
            .iter()
            .map(|p| model.complete(DEFAULT_SYSTEM, p)),
    )
    .await?;

    while level.len() > 1 {
        let groups = group_partials(&level, max_chars);
        debug!(partials = level.len(), groups = groups.len(), "summarizing level");
        let prompts: Vec<String> = groups
            .iter()
            .map(|g| summarize_prompt(question, g))
            .collect();
        level = try_join_all(prompts.iter().map(|p| model.complete(DEFAULT_SYSTEM, p))).await?;
    }
    Ok(level.pop().unwrap_or_default().trim().to_string())
}

/// Group partial answers under the budget, at least two per group so every
/// level shrinks.
fn group_partials(partials: &[String], max_chars: usize) -> Vec<Vec<&str>> {
    let mut groups: Vec<Vec<&str>> = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut used = 0usize;
    for p in partials {
        if current.len() >= 2 && used + p.len() > max_chars {
            groups.push(std::mem::take(&mut current));
            used = 0;
        }
        used += p.len();
        current.push(p);
    }
    if current.len() == 1 {
        if let Some(last) = groups.last_mut() {
            last.extend(current.drain(..));
        }
    }
    if !current.is_empty() {
        groups.push(current);
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::{ScriptedChat, hit};

    fn hits(n: usize, len: usize) -> Vec<RagHit> {
        (0..n)
            .map(|i| hit("a.pdf", &(i + 1).to_string(), &"x".repeat(len)))
            .collect()
    }

    #[test]
    fn packs_follow_the_budget() {
        let hs = hits(5, 100);
        // each hit costs ~30 header + 101
        let packs = pack_hits(&hs, 300);
        assert_eq!(packs.iter().map(Vec::len).collect::<Vec<_>>(), vec![2, 2, 1]);

        let one = pack_hits(&hs, 100_000);
        assert_eq!(one.len(), 1);

        let big = hits(2, 1000);
        let oversize = pack_hits(&big, 300);
        assert_eq!(oversize.len(), 2);
    }

    #[test]
    fn every_level_shrinks() {
        let partials: Vec<String> = (0..5).map(|i| format!("{i}").repeat(200)).collect();
        let groups = group_partials(&partials, 100);
        assert_eq!(groups.iter().map(Vec::len).collect::<Vec<_>>(), vec![2, 3]);
        assert!(group_partials(&partials[..2], 10).len() == 1);
    }

    #[tokio::test]
    async fn compact_refines_across_packs() {
        let chat = ScriptedChat::new(["first", "refined"]);
        let out = synthesize(&chat, ResponseMode::Compact, "q", &hits(3, 100), 300)
            .await
            .unwrap();
        assert_eq!(out, "refined");
        let prompts = chat.prompts();
        assert_eq!(prompts.len(), 2);
        assert!(prompts[1].contains("Existing answer:\nfirst"));
    }

    #[tokio::test]
    async fn tree_summarize_merges_partials() {
        let chat = ScriptedChat::new(["p1", "p2", "p3", "merged"]);
        let out = synthesize(&chat, ResponseMode::TreeSummarize, "q", &hits(5, 100), 300)
            .await
            .unwrap();
        assert_eq!(out, "merged");
        let prompts = chat.prompts();
        assert_eq!(prompts.len(), 4);
        assert!(prompts[3].contains("Partial answers:"));
    }

    #[tokio::test]
    async fn single_pack_is_a_single_call() {
        let chat = ScriptedChat::new(["only"]);
        let out = synthesize(&chat, ResponseMode::TreeSummarize, "q", &hits(1, 10), 1000)
            .await
            .unwrap();
        assert_eq!(out, "only");
        assert_eq!(chat.prompts().len(), 1);
    }
}
