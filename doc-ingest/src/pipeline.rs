//! End-to-end ingestion: extract → chunk → embed → ensure collection → upsert → snapshot.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use rag_store::{EmbeddingsProvider, VectorStore, embed_chunks};
use serde::Serialize;
use services::uuid::new_doc_id;
use tracing::{error, info, instrument, warn};

use crate::chunker::chunk_pages;
use crate::config::IngestConfig;
use crate::errors::IngestError;
use crate::extract::extract_file;
use crate::progress::Progress;
use crate::snapshot::{IndexSnapshot, SnapshotEntry};

/// Result of ingesting one document.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct IngestReport {
    pub doc_id: String,
    pub filename: String,
    pub status: &'static str,
    pub pages: usize,
    pub chunks: usize,
}

/// Result of a directory run. Failures do not stop the batch.
#[derive(Debug, Default)]
pub struct DirReport {
    pub ingested: Vec<IngestReport>,
    pub failed: Vec<(String, IngestError)>,
}

pub struct IngestPipeline {
    cfg: IngestConfig,
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn EmbeddingsProvider>,
    snapshot: Option<IndexSnapshot>,
}

impl IngestPipeline {
    pub fn new(
        cfg: IngestConfig,
        store: Arc<dyn VectorStore>,
        embedder: Arc<dyn EmbeddingsProvider>,
    ) -> Self {
        let snapshot = cfg.index_persist_dir.as_ref().map(IndexSnapshot::in_dir);
        Self {
            cfg,
            store,
            embedder,
            snapshot,
        }
    }

    pub fn config(&self) -> &IngestConfig {
        &self.cfg
    }

    pub fn store(&self) -> &Arc<dyn VectorStore> {
        &self.store
    }

    /// Ingest one file under `filename` (the name shown as source).
    ///
    /// A fresh `doc_id` (UUIDv4) is generated unless one is supplied.
    #[instrument(skip_all, fields(filename = %filename))]
    pub async fn ingest_file(
        &self,
        path: &Path,
        filename: &str,
        doc_id: Option<String>,
    ) -> Result<IngestReport, IngestError> {
        let doc_id = doc_id.unwrap_or_else(new_doc_id);

        let pages = extract_file(path).await?;
        let mut chunks = chunk_pages(
            &doc_id,
            filename,
            &pages,
            self.cfg.chunk_size,
            self.cfg.chunk_overlap,
        );
        if chunks.is_empty() {
            return Err(IngestError::EmptyDocument(filename.to_string()));
        }

        embed_chunks(&mut chunks, self.embedder.as_ref(), self.cfg.embed_concurrency).await?;

        self.store.ensure_collection().await?;
        let written = self.store.upsert_chunks(&chunks).await?;

        let report = IngestReport {
            doc_id,
            filename: filename.to_string(),
            status: "success",
            pages: pages.len(),
            chunks: written,
        };

        if let Some(snapshot) = &self.snapshot {
            let entry = SnapshotEntry {
                doc_id: report.doc_id.clone(),
                filename: report.filename.clone(),
                pages: report.pages,
                chunks: report.chunks,
                collection: self.store.collection().to_string(),
                ingested_at: Utc::now(),
            };
            // The vectors are already stored; a snapshot failure only loses the local record.
            if let Err(e) = snapshot.append(&entry).await {
                warn!(error = %e, "failed to append index snapshot");
            }
        }

        info!(
            doc_id = %report.doc_id,
            pages = report.pages,
            chunks = report.chunks,
            collection = self.store.collection(),
            "document ingested"
        );
        Ok(report)
    }

    /// Ingest every `*.pdf` in `dir` (non-recursive, sorted by name).
    pub async fn ingest_dir(
        &self,
        dir: &Path,
        progress: &dyn Progress,
    ) -> Result<DirReport, IngestError> {
        let files = list_pdfs(dir).await?;
        let mut report = DirReport::default();
        if files.is_empty() {
            warn!(dir = %dir.display(), "no PDF files found");
            return Ok(report);
        }

        progress.set_total(files.len() as u64);
        for path in files {
            let filename = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            progress.message(&filename);
            match self.ingest_file(&path, &filename, None).await {
                Ok(r) => report.ingested.push(r),
                Err(e) => {
                    error!(file = %filename, error = %e, "ingestion failed");
                    report.failed.push((filename.clone(), e));
                }
            }
            progress.step(&filename);
        }
        progress.finish(&format!(
            "{} ingested, {} failed",
            report.ingested.len(),
            report.failed.len()
        ));
        Ok(report)
    }
}

async fn list_pdfs(dir: &Path) -> Result<Vec<PathBuf>, IngestError> {
    let mut rd = match tokio::fs::read_dir(dir).await {
        Ok(rd) => rd,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(IngestError::io(dir, e)),
    };
    let mut out = Vec::new();
    while let Some(entry) = rd.next_entry().await.map_err(|e| IngestError::io(dir, e))? {
        let path = entry.path();
        let is_pdf = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("pdf"));
        if is_pdf && path.is_file() {
            out.push(path);
        }
    }
    out.sort();
    Ok(out)
}

/// Keep only the final path component of a client-supplied filename.
pub fn sanitize_filename(name: &str) -> Option<String> {
    let base = name.rsplit(['/', '\\']).next()?.trim();
    if base.is_empty() || base == "." || base == ".." {
        return None;
    }
    Some(base.to_string())
}

/// Write an uploaded file to `dir/<filename>`, creating `dir` if needed.
pub async fn save_upload(dir: &Path, filename: &str, bytes: &[u8]) -> Result<PathBuf, IngestError> {
    let name = sanitize_filename(filename)
        .ok_or_else(|| IngestError::Unsupported(format!("invalid filename: {filename:?}")))?;
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| IngestError::io(dir, e))?;
    let path = dir.join(name);
    tokio::fs::write(&path, bytes)
        .await
        .map_err(|e| IngestError::io(&path, e))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::NoopProgress;
    use rag_store::{MemoryStore, RagError, RagFilter};
    use std::future::Future;
    use std::pin::Pin;

    /// Deterministic 8-dim embedder keyed on byte sums.
    struct HashEmbedder;

    impl EmbeddingsProvider for HashEmbedder {
        fn embed<'a>(
            &'a self,
            text: &'a str,
        ) -> Pin<Box<dyn Future<Output = Result<Vec<f32>, RagError>> + Send + 'a>> {
            Box::pin(async move {
                let mut v = vec![0.0f32; 8];
                for (i, b) in text.bytes().enumerate() {
                    v[i % 8] += b as f32;
                }
                Ok(v)
            })
        }

        fn dim(&self) -> Option<usize> {
            Some(8)
        }
    }

    fn pipeline(persist: Option<PathBuf>) -> (IngestPipeline, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new("docs", 8));
        let cfg = IngestConfig {
            chunk_size: 40,
            chunk_overlap: 8,
            index_persist_dir: persist,
            ..IngestConfig::default()
        };
        (
            IngestPipeline::new(cfg, store.clone(), Arc::new(HashEmbedder)),
            store,
        )
    }

    #[tokio::test]
    async fn ingests_text_file_and_scopes_by_doc_id() {
        let dir = tempfile::tempdir().unwrap();
        let path = save_upload(
            dir.path(),
            "notes.txt",
            "The quarterly report shows revenue growth across every region we track.".as_bytes(),
        )
        .await
        .unwrap();

        let (pipe, store) = pipeline(Some(dir.path().join("index")));
        let report = pipe.ingest_file(&path, "notes.txt", None).await.unwrap();
        assert!(!report.doc_id.is_empty());
        assert_eq!(report.status, "success");
        assert!(report.chunks > 1);
        assert_eq!(store.len().await, report.chunks);

        let scope = RagFilter::scope(Some(&report.doc_id), None);
        let hits = store
            .search(vec![1.0; 8], 50, scope.as_ref())
            .await
            .unwrap();
        assert_eq!(hits.len(), report.chunks);
        assert!(hits.iter().all(|h| h.source.as_deref() == Some("notes.txt")));

        let snap = IndexSnapshot::in_dir(dir.path().join("index")).read_all().unwrap();
        assert_eq!(snap.len(), 1);
        assert_eq!(snap[0].doc_id, report.doc_id);
    }

    #[tokio::test]
    async fn each_upload_gets_its_own_doc_id() {
        let dir = tempfile::tempdir().unwrap();
        let path = save_upload(dir.path(), "a.md", b"same text twice").await.unwrap();
        let (pipe, store) = pipeline(None);
        let a = pipe.ingest_file(&path, "a.md", None).await.unwrap();
        let b = pipe.ingest_file(&path, "a.md", None).await.unwrap();
        assert_ne!(a.doc_id, b.doc_id);
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn unsupported_and_empty_files_fail_before_any_write() {
        let dir = tempfile::tempdir().unwrap();
        let (pipe, store) = pipeline(None);

        let xlsx = save_upload(dir.path(), "sheet.xlsx", b"data").await.unwrap();
        assert!(matches!(
            pipe.ingest_file(&xlsx, "sheet.xlsx", None).await,
            Err(IngestError::Unsupported(_))
        ));

        let empty = save_upload(dir.path(), "empty.txt", b"   \n").await.unwrap();
        assert!(matches!(
            pipe.ingest_file(&empty, "empty.txt", None).await,
            Err(IngestError::EmptyDocument(_))
        ));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn dir_without_pdfs_is_a_warning_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        save_upload(dir.path(), "readme.txt", b"not a pdf").await.unwrap();
        let (pipe, _) = pipeline(None);
        let report = pipe.ingest_dir(dir.path(), &NoopProgress).await.unwrap();
        assert!(report.ingested.is_empty() && report.failed.is_empty());

        let missing = pipe
            .ingest_dir(&dir.path().join("nope"), &NoopProgress)
            .await
            .unwrap();
        assert!(missing.ingested.is_empty());
    }

    #[tokio::test]
    async fn broken_pdf_is_counted_as_failed() {
        let dir = tempfile::tempdir().unwrap();
        save_upload(dir.path(), "broken.pdf", b"%PDF-1.4 garbage").await.unwrap();
        let (pipe, _) = pipeline(None);
        let report = pipe.ingest_dir(dir.path(), &NoopProgress).await.unwrap();
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, "broken.pdf");
    }

    #[test]
    fn filenames_lose_their_directories() {
        assert_eq!(sanitize_filename("../../etc/passwd").as_deref(), Some("passwd"));
        assert_eq!(sanitize_filename("C:\\tmp\\report.pdf").as_deref(), Some("report.pdf"));
        assert_eq!(sanitize_filename("dir/"), None);
        assert_eq!(sanitize_filename(".."), None);
    }
}
