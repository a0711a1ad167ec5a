use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use super::{CompletionRecord, StatsAggregator, StatsStore};
use crate::error::CollaboratorError;

enum StatsMessage {
    Record(CompletionRecord),
    Flush(oneshot::Sender<()>),
}

/// Sender half of the background stats writer.
///
/// Records are queued on an unbounded channel and written by a dedicated
/// thread, so [`StatsAggregator::record_completion`] never waits on storage.
/// The thread exits once every handle is dropped.
#[derive(Debug, Clone)]
pub struct StatsHandle {
    tx: mpsc::UnboundedSender<StatsMessage>,
}

impl StatsHandle {
    /// Spawn the writer thread for `store`.
    pub fn spawn(store: Arc<dyn StatsStore>) -> std::io::Result<Self> {
        let (tx, mut rx) = mpsc::unbounded_channel::<StatsMessage>();
        std::thread::Builder::new()
            .name("bartomato-stats".into())
            .spawn(move || {
                while let Some(message) = rx.blocking_recv() {
                    match message {
                        StatsMessage::Record(record) => {
                            if let Err(e) = store.record_completion(&record) {
                                warn!(
                                    record_id = %record.id,
                                    error = %e,
                                    "failed to persist completion"
                                );
                            }
                        }
                        StatsMessage::Flush(done) => {
                            let _ = done.send(());
                        }
                    }
                }
                debug!("stats worker stopped");
            })?;
        Ok(Self { tx })
    }

    /// Block until every record queued before this call has been handled.
    ///
    /// Must not be called from inside an async runtime.
    pub fn flush(&self) -> Result<(), CollaboratorError> {
        let (done_tx, done_rx) = oneshot::channel();
        self.tx
            .send(StatsMessage::Flush(done_tx))
            .map_err(|_| CollaboratorError::StatsWorkerClosed)?;
        done_rx
            .blocking_recv()
            .map_err(|_| CollaboratorError::StatsWorkerClosed)
    }
}

impl StatsAggregator for StatsHandle {
    fn record_completion(&self, record: CompletionRecord) {
        if self.tx.send(StatsMessage::Record(record)).is_err() {
            warn!("stats worker is gone; completion dropped");
        }
    }
}
