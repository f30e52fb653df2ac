//! Page-aware chunking with overlapping character windows.
//!
//! Windows are at most `chunk_size` characters. A window that would cut a
//! word in half is shortened to the last whitespace in its second half, and
//! the next window starts `chunk_overlap` characters earlier, moved forward
//! to the next word start. Chunk indexes run across pages so
//! `(doc_id, chunk_index)` is unique within a document.

use rag_store::ChunkRecord;
use tracing::debug;

use crate::extract::PageText;

/// Split `text` into overlapping windows. Invalid sizes yield no windows.
pub fn split_text(text: &str, chunk_size: usize, chunk_overlap: usize) -> Vec<String> {
    if chunk_size == 0 || chunk_overlap >= chunk_size {
        return Vec::new();
    }
    let chars: Vec<char> = text.chars().collect();
    let len = chars.len();

    let mut out = Vec::new();
    let mut start = 0usize;
    while start < len {
        let hard_end = (start + chunk_size).min(len);
        let end = if hard_end < len {
            soft_end(&chars, start, hard_end)
        } else {
            hard_end
        };

        let piece: String = chars[start..end].iter().collect();
        let piece = piece.trim();
        if !piece.is_empty() {
            out.push(piece.to_string());
        }
        if end == len {
            break;
        }

        let raw = end.saturating_sub(chunk_overlap).max(start + 1);
        start = (raw..end)
            .find(|&i| chars[i - 1].is_whitespace())
            .unwrap_or(raw);
    }
    out
}

/// Last whitespace position in the second half of the window, else the hard end.
fn soft_end(chars: &[char], start: usize, hard_end: usize) -> usize {
    let floor = start + (hard_end - start) / 2;
    (floor + 1..=hard_end)
        .rev()
        .find(|&i| chars[i - 1].is_whitespace())
        .unwrap_or(hard_end)
}

/// Cut every page into chunks carrying the document metadata.
pub fn chunk_pages(
    doc_id: &str,
    source: &str,
    pages: &[PageText],
    chunk_size: usize,
    chunk_overlap: usize,
) -> Vec<ChunkRecord> {
    let mut out = Vec::new();
    for page in pages {
        for text in split_text(&page.text, chunk_size, chunk_overlap) {
            out.push(ChunkRecord {
                doc_id: doc_id.to_string(),
                source: source.to_string(),
                page_label: page.label.clone(),
                chunk_index: out.len(),
                text,
                embedding: None,
            });
        }
    }
    debug!(
        doc_id,
        source,
        pages = pages.len(),
        chunks = out.len(),
        chunk_size,
        chunk_overlap,
        "document chunked"
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(n: usize) -> String {
        (0..n).map(|i| format!("w{i:03}")).collect::<Vec<_>>().join(" ")
    }

    #[test]
    fn short_text_is_a_single_chunk() {
        assert_eq!(split_text("  hello world ", 100, 10), vec!["hello world"]);
        assert!(split_text("   ", 100, 10).is_empty());
    }

    #[test]
    fn windows_overlap_and_respect_the_size() {
        let text = words(60); // "w000 w001 ..." 5 chars per word incl. space
        let chunks = split_text(&text, 50, 15);
        assert!(chunks.len() > 1);
        for c in &chunks {
            assert!(c.chars().count() <= 50, "chunk too long: {c:?}");
            assert!(!c.starts_with(' ') && !c.ends_with(' '));
        }
        for pair in chunks.windows(2) {
            let last_word = pair[0].split(' ').last().unwrap();
            assert!(pair[1].contains(last_word), "no overlap between {pair:?}");
        }
        let all: String = chunks.join(" ");
        for i in 0..60 {
            assert!(all.contains(&format!("w{i:03}")));
        }
    }

    #[test]
    fn words_are_not_cut() {
        let chunks = split_text(&words(40), 23, 5);
        for c in chunks {
            for w in c.split(' ') {
                assert_eq!(w.len(), 4, "cut word {w:?}");
            }
        }
    }

    #[test]
    fn unbroken_text_is_cut_hard() {
        let chunks = split_text(&"x".repeat(25), 10, 2);
        assert_eq!(chunks[0].len(), 10);
        assert_eq!(chunks.concat().len(), 25 + 2 * (chunks.len() - 1));
    }

    #[test]
    fn invalid_sizes_yield_nothing() {
        assert!(split_text("abc", 0, 0).is_empty());
        assert!(split_text("abc", 10, 10).is_empty());
    }

    #[test]
    fn pages_keep_labels_and_indexes_run_across_pages() {
        let pages = vec![
            PageText {
                label: Some("1".into()),
                text: words(30),
            },
            PageText {
                label: Some("2".into()),
                text: "tail".into(),
            },
        ];
        let chunks = chunk_pages("doc-1", "report.pdf", &pages, 60, 10);
        let last = chunks.last().unwrap();
        assert_eq!(last.page_label.as_deref(), Some("2"));
        assert_eq!(last.text, "tail");
        for (i, c) in chunks.iter().enumerate() {
            assert_eq!(c.chunk_index, i);
            assert_eq!(c.doc_id, "doc-1");
            assert_eq!(c.source, "report.pdf");
        }
    }
}
