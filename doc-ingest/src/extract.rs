//! Text extraction.
//!
//! PDFs go through `pdf-extract`; its output separates pages with form
//! feeds. When that yields a single block for a multi-page file, or fails
//! outright, pages are read one by one with `lopdf`. Plain text and
//! markdown are read as UTF-8 (lossy).

use std::path::Path;

use tracing::{debug, warn};

use crate::errors::IngestError;

/// Text of one page. `label` is the 1-based page number for paged documents.
#[derive(Clone, Debug, PartialEq)]
pub struct PageText {
    pub label: Option<String>,
    pub text: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FileKind {
    Pdf,
    Text,
}

impl FileKind {
    pub fn from_path(path: &Path) -> Result<Self, IngestError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        match ext.as_str() {
            "pdf" => Ok(FileKind::Pdf),
            "txt" | "md" | "markdown" => Ok(FileKind::Text),
            _ => Err(IngestError::Unsupported(path.display().to_string())),
        }
    }
}

/// Read a file and return its non-empty pages.
pub async fn extract_file(path: &Path) -> Result<Vec<PageText>, IngestError> {
    let kind = FileKind::from_path(path)?;
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| IngestError::io(path, e))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let pages = match kind {
        FileKind::Text => vec![PageText {
            label: None,
            text: String::from_utf8_lossy(&bytes).into_owned(),
        }],
        FileKind::Pdf => {
            let file = name.clone();
            tokio::task::spawn_blocking(move || extract_pdf(&file, &bytes))
                .await
                .map_err(|e| IngestError::Pdf {
                    file: name.clone(),
                    reason: format!("extraction task failed: {e}"),
                })??
        }
    };

    let pages: Vec<PageText> = pages
        .into_iter()
        .map(|p| PageText {
            text: clean_text(&p.text),
            ..p
        })
        .filter(|p| !p.text.is_empty())
        .collect();

    if pages.is_empty() {
        return Err(IngestError::EmptyDocument(name));
    }
    debug!(file = %name, pages = pages.len(), "text extracted");
    Ok(pages)
}

/// Blocking PDF extraction with the lopdf fallback.
pub fn extract_pdf(file: &str, bytes: &[u8]) -> Result<Vec<PageText>, IngestError> {
    let primary = std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem(bytes));

    match primary {
        Ok(Ok(text)) => {
            let pages = split_form_feeds(&text);
            if pages.len() > 1 {
                return Ok(pages);
            }
            match lopdf_pages(bytes) {
                Ok(by_page) if by_page.len() > 1 => Ok(by_page),
                _ => Ok(pages),
            }
        }
        Ok(Err(e)) => {
            warn!(file, error = %e, "pdf-extract failed, trying lopdf");
            lopdf_pages(bytes)
                .map_err(|reason| IngestError::Pdf { file: file.to_string(), reason })
        }
        Err(_) => {
            warn!(file, "pdf-extract panicked, trying lopdf");
            lopdf_pages(bytes)
                .map_err(|reason| IngestError::Pdf { file: file.to_string(), reason })
        }
    }
}

/// Split extractor output on form feeds. A document without form feeds is one page.
pub fn split_form_feeds(text: &str) -> Vec<PageText> {
    let parts: Vec<&str> = text.split('\x0c').collect();
    if parts.len() <= 1 {
        return vec![PageText {
            label: Some("1".into()),
            text: text.to_string(),
        }];
    }
    parts
        .into_iter()
        .enumerate()
        .filter(|(_, t)| !t.trim().is_empty())
        .map(|(i, t)| PageText {
            label: Some((i + 1).to_string()),
            text: t.to_string(),
        })
        .collect()
}

fn lopdf_pages(bytes: &[u8]) -> Result<Vec<PageText>, String> {
    let doc = lopdf::Document::load_mem(bytes).map_err(|e| format!("failed to load PDF: {e}"))?;
    let mut out = Vec::new();
    for page_no in doc.get_pages().keys() {
        match doc.extract_text(&[*page_no]) {
            Ok(text) if !text.trim().is_empty() => out.push(PageText {
                label: Some(page_no.to_string()),
                text,
            }),
            Ok(_) => {}
            Err(e) => debug!(page = page_no, error = %e, "lopdf could not read page"),
        }
    }
    if out.is_empty() {
        return Err("no extractable text; the PDF may be image-based or encrypted".into());
    }
    Ok(out)
}

/// Drop NULs, trim lines and collapse runs of blank lines.
pub fn clean_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut blank_run = 0usize;
    for line in s.replace('\0', "").lines() {
        let line = line.trim();
        if line.is_empty() {
            blank_run += 1;
            if blank_run > 1 {
                continue;
            }
        } else {
            blank_run = 0;
        }
        out.push_str(line);
        out.push('\n');
    }
    out.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn form_feeds_become_numbered_pages() {
        let pages = split_form_feeds("intro\x0c\x0cresults\x0c");
        assert_eq!(
            pages,
            vec![
                PageText {
                    label: Some("1".into()),
                    text: "intro".into()
                },
                PageText {
                    label: Some("3".into()),
                    text: "results".into()
                },
            ]
        );
        assert_eq!(split_form_feeds("single").len(), 1);
    }

    #[test]
    fn cleaning_collapses_blank_runs() {
        assert_eq!(clean_text("  a \n\n\n\n b\0 \n"), "a\n\nb");
    }

    #[test]
    fn kind_is_chosen_by_extension() {
        assert_eq!(FileKind::from_path(Path::new("x/Report.PDF")).unwrap(), FileKind::Pdf);
        assert_eq!(FileKind::from_path(Path::new("notes.md")).unwrap(), FileKind::Text);
        assert!(matches!(
            FileKind::from_path(Path::new("sheet.xlsx")),
            Err(IngestError::Unsupported(_))
        ));
    }

    #[tokio::test]
    async fn text_files_are_one_unlabelled_page() {
        let mut f = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
        writeln!(f, "hello\n\n\nworld").unwrap();
        let pages = extract_file(f.path()).await.unwrap();
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].label, None);
        assert_eq!(pages[0].text, "hello\n\nworld");
    }

    #[tokio::test]
    async fn blank_file_is_an_empty_document() {
        let f = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
        assert!(matches!(
            extract_file(f.path()).await,
            Err(IngestError::EmptyDocument(_))
        ));
    }

    #[tokio::test]
    async fn multi_page_pdf_keeps_page_numbers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.pdf");
        std::fs::write(&path, crate::fixture::sample_pdf(&["Revenue grew", "Zebras sleep"]).unwrap()).unwrap();

        let pages = extract_file(&path).await.unwrap();
        assert_eq!(pages.len(), 2, "{pages:?}");
        assert_eq!(pages[0].label.as_deref(), Some("1"));
        assert_eq!(pages[1].label.as_deref(), Some("2"));
        assert!(pages[0].text.contains("Revenue"));
        assert!(pages[1].text.contains("Zebras"));
    }

    #[test]
    fn garbage_pdf_reports_a_pdf_error() {
        assert!(matches!(
            extract_pdf("bad.pdf", b"definitely not a pdf"),
            Err(IngestError::Pdf { .. })
        ));
    }
}
