//! Sequential consumer of ingestion events.

use std::path::Path;
use std::sync::Arc;

use doc_ingest::{DirReport, IngestPipeline, IngestReport, Progress};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::bus::EventReceiver;
use crate::errors::WorkerError;
use crate::event::{INGEST_REQUESTED, IngestEvent};

/// Counts reported when the queue closes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct WorkerSummary {
    pub completed: usize,
    pub failed: usize,
}

/// Outcome of one handled event.
#[derive(Clone, Debug, Serialize)]
pub struct WorkerOutcome {
    pub status: &'static str,
    pub filename: String,
    pub doc_id: String,
    pub chunks: usize,
}

#[derive(Clone)]
pub struct IngestWorker {
    pipeline: Arc<IngestPipeline>,
}

impl IngestWorker {
    pub fn new(pipeline: Arc<IngestPipeline>) -> Self {
        Self { pipeline }
    }

    /// Run one event through the ingestion pipeline.
    pub async fn handle(&self, event: &IngestEvent) -> Result<WorkerOutcome, WorkerError> {
        if event.name != INGEST_REQUESTED {
            return Err(WorkerError::UnknownEvent(event.name.clone()));
        }
        info!(filename = %event.data.filename, "starting ingestion");
        let IngestReport {
            doc_id, chunks, ..
        } = self
            .pipeline
            .ingest_file(&event.data.path, &event.data.filename, None)
            .await?;
        Ok(WorkerOutcome {
            status: "completed",
            filename: event.data.filename.clone(),
            doc_id,
            chunks,
        })
    }

    /// Consume events one at a time until every sender is dropped.
    ///
    /// Failures are logged and counted; nothing is retried.
    pub async fn run(self, mut rx: EventReceiver) -> WorkerSummary {
        let mut summary = WorkerSummary::default();
        while let Some(event) = rx.recv().await {
            match self.handle(&event).await {
                Ok(out) => {
                    summary.completed += 1;
                    info!(
                        status = out.status,
                        filename = %out.filename,
                        doc_id = %out.doc_id,
                        chunks = out.chunks,
                        "ingestion completed"
                    );
                }
                Err(e) => {
                    summary.failed += 1;
                    error!(filename = %event.data.filename, error = %e, "ingestion failed");
                }
            }
        }
        info!(completed = summary.completed, failed = summary.failed, "ingest worker stopped");
        summary
    }

    /// Standalone start-up pass: ingest every PDF already in `dir`.
    pub async fn bootstrap(
        &self,
        dir: &Path,
        progress: &dyn Progress,
    ) -> Result<DirReport, WorkerError> {
        let report = self.pipeline.ingest_dir(dir, progress).await?;
        if report.ingested.is_empty() && report.failed.is_empty() {
            warn!(dir = %dir.display(), "no PDFs to bootstrap");
        }
        Ok(report)
    }
}
