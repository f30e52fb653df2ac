use tokio::sync::mpsc;
use tracing::debug;

use crate::errors::WorkerError;
use crate::event::IngestEvent;

pub type EventReceiver = mpsc::UnboundedReceiver<IngestEvent>;

/// Producer side of the ingestion queue. Cheap to clone; sending never blocks.
#[derive(Clone, Debug)]
pub struct EventBus {
    tx: mpsc::UnboundedSender<IngestEvent>,
}

impl EventBus {
    pub fn new() -> (Self, EventReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn send(&self, event: IngestEvent) -> Result<(), WorkerError> {
        debug!(event = %event.name, filename = %event.data.filename, "event enqueued");
        self.tx.send(event).map_err(|_| WorkerError::QueueClosed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_after_receiver_dropped_fails() {
        let (bus, rx) = EventBus::new();
        bus.send(IngestEvent::requested("a.pdf", "a.pdf")).unwrap();
        drop(rx);
        assert!(matches!(
            bus.send(IngestEvent::requested("b.pdf", "b.pdf")),
            Err(WorkerError::QueueClosed)
        ));
    }
}
