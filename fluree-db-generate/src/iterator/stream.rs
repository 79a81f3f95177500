//! Channel between a producer on the blocking pool and an async consumer

use super::{BatchProducer, BatchSink, IterationOutcome, SinkControl};
use crate::binding::Batch;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Batches from a producer running on the blocking pool
///
/// The channel holds at most one batch, so the producer waits at each batch
/// boundary until the consumer has taken the previous one. Dropping the
/// stream (or calling [`finish`](Self::finish)) makes the producer's next
/// send fail, which it treats as `SinkControl::Stop`.
pub struct BatchStream {
    rx: mpsc::Receiver<Batch>,
    handle: JoinHandle<IterationOutcome>,
}

struct ChannelSink {
    tx: mpsc::Sender<Batch>,
}

impl BatchSink for ChannelSink {
    fn accept(&mut self, batch: Batch) -> SinkControl {
        match self.tx.blocking_send(batch) {
            Ok(()) => SinkControl::Continue,
            Err(_) => SinkControl::Stop,
        }
    }
}

impl BatchStream {
    /// Start `producer` on the blocking pool
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(producer: Box<dyn BatchProducer>) -> Self {
        let (tx, rx) = mpsc::channel(1);
        let handle = tokio::task::spawn_blocking(move || {
            let mut sink = ChannelSink { tx };
            producer.run(&mut sink)
        });
        Self { rx, handle }
    }

    /// Next batch, or `None` once the producer is done
    pub async fn next(&mut self) -> Option<Batch> {
        self.rx.recv().await
    }

    /// Stop the producer (if still running) and wait for its outcome
    pub async fn finish(mut self) -> IterationOutcome {
        self.rx.close();
        match self.handle.await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(error = %e, "batch producer task failed");
                IterationOutcome::failed(format!("producer task failed: {e}"))
            }
        }
    }
}

impl std::fmt::Debug for BatchStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchStream")
            .field("finished", &self.handle.is_finished())
            .finish()
    }
}
