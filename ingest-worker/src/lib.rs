//! Background ingestion worker.
//!
//! The upload route publishes an [`IngestEvent`] on the [`EventBus`] and
//! returns at once; [`IngestWorker::run`] consumes the queue sequentially and
//! runs the same ingestion pipeline as the synchronous path. There is no
//! ordering guarantee between "upload accepted" and "document queryable".

mod bus;
mod errors;
mod event;
mod worker;

pub use bus::{EventBus, EventReceiver};
pub use errors::WorkerError;
pub use event::{INGEST_REQUESTED, IngestEvent, IngestRequest};
pub use worker::{IngestWorker, WorkerOutcome, WorkerSummary};
