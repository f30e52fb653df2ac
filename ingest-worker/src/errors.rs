use doc_ingest::IngestError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkerError {
    /// The worker side of the queue is gone.
    #[error("ingest queue is closed")]
    QueueClosed,

    #[error("unknown event: {0}")]
    UnknownEvent(String),

    #[error(transparent)]
    Ingest(#[from] IngestError),
}
