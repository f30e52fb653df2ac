//! Prompt builders: short system message + compact context blocks.

use rag_store::RagHit;

/// Default system instructions for document answers.
pub const DEFAULT_SYSTEM: &str = r#"
You are a precise document assistant. Answer the question using the numbered excerpts.
Mention the file name and page when it helps. If the excerpts do not contain the answer, say so plainly.
"#;

pub const RERANK_SYSTEM: &str = "You rank document excerpts by relevance. Follow the output format exactly.";

/// Header line shown above each excerpt.
pub fn hit_header(n: usize, h: &RagHit) -> String {
    let src = h.source.as_deref().unwrap_or("unknown");
    match h.page_label.as_deref() {
        Some(page) => format!("==[{n}]== {src} p.{page} (score {:.3})\n", h.score),
        None => format!("==[{n}]== {src} (score {:.3})\n", h.score),
    }
}

/// Labeled context section of at most `max_chars` bytes, in ranking order.
///
/// A hit whose text does not fit is truncated on a char boundary and ends the block.
pub fn context_block(hits: &[&RagHit], max_chars: usize) -> String {
    let mut out = String::new();
    let mut budget = max_chars;

    for (i, h) in hits.iter().enumerate() {
        let header = hit_header(i + 1, h);
        let text = h.text.trim();

        if header.len() >= budget {
            break;
        }
        out.push_str(&header);
        budget -= header.len();

        let take = budget.saturating_sub(2);
        if text.len() > take {
            out.push_str(safe_truncate(text, take));
            out.push_str("\n…\n");
            break;
        }
        out.push_str(text);
        out.push('\n');
        budget -= text.len() + 1;
    }
    out
}

/// First-pass question prompt over one pack of hits.
///
/// # Example
/// ```
/// # use contextor::prompt::build_user_prompt;
/// let prompt = build_user_prompt("What is this about?", &[], 2000);
/// assert!(prompt.contains("Question:"));
/// ```
pub fn build_user_prompt(question: &str, hits: &[&RagHit], max_chars: usize) -> String {
    let mut out = String::new();
    out.push_str("Question:\n");
    out.push_str(question.trim());
    out.push_str("\n\n");

    if !hits.is_empty() {
        out.push_str("Context (top-ranked):\n");
        out.push_str(&context_block(hits, max_chars));
        out.push('\n');
        out.push_str("Answer using only the context above when possible.\n");
    }
    out
}

/// Refine an existing answer with another pack of hits.
pub fn refine_prompt(question: &str, existing: &str, hits: &[&RagHit], max_chars: usize) -> String {
    format!(
        "Question:\n{}\n\nExisting answer:\n{}\n\nMore context:\n{}\n\
         Refine the existing answer with the new context if it is useful. \
         If it is not, repeat the existing answer unchanged.\n",
        question.trim(),
        existing.trim(),
        context_block(hits, max_chars),
    )
}

/// Merge partial answers (tree_summarize inner nodes).
pub fn summarize_prompt(question: &str, partials: &[&str]) -> String {
    let mut out = format!("Question:\n{}\n\nPartial answers:\n", question.trim());
    for (i, p) in partials.iter().enumerate() {
        out.push_str(&format!("--[{}]--\n{}\n", i + 1, p.trim()));
    }
    out.push_str("\nCombine the partial answers into one answer to the question. Drop repetitions.\n");
    out
}

/// Ask the rerank model for `Doc: <n>, Relevance: <1-10>` lines.
pub fn rerank_prompt(question: &str, hits: &[RagHit], per_doc_chars: usize) -> String {
    let mut out = String::from(
        "A list of documents is shown below. Each document has a number next to it. \
         A question is also provided. Respond with the numbers of the documents you \
         should consult to answer the question, in order of relevance, as well as the \
         relevance score from 1 to 10. Do not include documents that are not relevant.\n\
         Use exactly this format, one line per document:\nDoc: 2, Relevance: 7\n\n",
    );
    for (i, h) in hits.iter().enumerate() {
        out.push_str(&format!(
            "Document {}:\n{}\n\n",
            i + 1,
            safe_truncate(h.text.trim(), per_doc_chars)
        ));
    }
    out.push_str(&format!("Question: {}\nAnswer:\n", question.trim()));
    out
}

/// Longest prefix of `s` that is at most `max` bytes and ends on a char boundary.
pub fn safe_truncate(s: &str, max: usize) -> &str {
    if s.len() <= max {
        s
    } else {
        let mut end = max;
        while end > 0 && !s.is_char_boundary(end) {
            end -= 1;
        }
        &s[..end]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn hit(text: &str, page: Option<&str>) -> RagHit {
        RagHit::from_payload(
            0.5,
            json!({"text": text, "source": "report.pdf", "page_label": page, "doc_id": "d"}),
        )
    }

    #[test]
    fn headers_carry_source_and_page() {
        assert_eq!(
            hit_header(2, &hit("x", Some("4"))),
            "==[2]== report.pdf p.4 (score 0.500)\n"
        );
        assert_eq!(hit_header(1, &hit("x", None)), "==[1]== report.pdf (score 0.500)\n");
    }

    #[test]
    fn context_respects_budget_and_char_boundaries() {
        let long = hit(&"é".repeat(500), None);
        let block = context_block(&[&long], 120);
        assert!(block.len() <= 120 + "\n…\n".len());
        assert!(block.ends_with("…\n"));
    }

    #[test]
    fn empty_hits_give_question_only() {
        let p = build_user_prompt("  why? ", &[], 100);
        assert_eq!(p, "Question:\nwhy?\n\n");
    }

    #[test]
    fn rerank_prompt_numbers_documents_from_one() {
        let hits = vec![hit("alpha", None), hit("beta", None)];
        let p = rerank_prompt("q", &hits, 100);
        assert!(p.contains("Document 1:\nalpha"));
        assert!(p.contains("Document 2:\nbeta"));
    }

    #[test]
    fn truncate_never_splits_a_char() {
        assert_eq!(safe_truncate("aé", 2), "a");
        assert_eq!(safe_truncate("abc", 10), "abc");
    }
}
