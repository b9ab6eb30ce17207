//! The serialized ingestion queue.
//!
//! Each store instance owns one queue and one worker task, created together
//! with the store and stopped when it is dropped. The worker drains
//! submissions strictly in enqueue order and runs each pipeline to
//! completion before starting the next, so no two read-merge-write cycles
//! are ever in flight against the same store handle. This is the only
//! concurrency control in the write path; it does not protect against other
//! store instances or processes.

use tokio::sync::{mpsc, oneshot};

use crate::error::{Error, Result};
use crate::ingest::{IngestOutcome, Ingestor};
use crate::model::{MaterializedStats, Snapshot};
use crate::time::Timestamp;

enum Job {
    Ingest(Snapshot),
    Compact(Timestamp, oneshot::Sender<Result<Option<MaterializedStats>>>),
    Flush(oneshot::Sender<()>),
}

pub(crate) struct IngestQueue {
    tx: mpsc::UnboundedSender<Job>,
}

impl IngestQueue {
    /// Spawns the worker task and returns the queue handle.
    pub(crate) fn start(ingestor: Ingestor) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(run_worker(ingestor, rx));
        Self { tx }
    }

    /// Enqueues a submission and returns immediately.
    ///
    /// Errors only if the worker is gone; a failure while processing the
    /// submission itself is reported through tracing, not to this caller.
    pub(crate) fn submit(&self, snapshot: Snapshot) -> Result<()> {
        self.tx
            .send(Job::Ingest(snapshot))
            .map_err(|_| Error::Internal("ingestion queue has shut down".to_string()))
    }

    /// Runs a compaction through the queue and awaits its result.
    ///
    /// Routing through the worker keeps the read-merge-write cycle
    /// serialized with in-flight submissions.
    pub(crate) async fn compact(&self, ts: Timestamp) -> Result<Option<MaterializedStats>> {
        let (ack, done) = oneshot::channel();
        self.tx
            .send(Job::Compact(ts, ack))
            .map_err(|_| Error::Internal("ingestion queue has shut down".to_string()))?;
        done.await
            .map_err(|_| Error::Internal("ingestion queue dropped the compaction".to_string()))?
    }

    /// Waits until every previously enqueued submission has been processed.
    pub(crate) async fn flush(&self) -> Result<()> {
        let (ack, done) = oneshot::channel();
        self.tx
            .send(Job::Flush(ack))
            .map_err(|_| Error::Internal("ingestion queue has shut down".to_string()))?;
        done.await
            .map_err(|_| Error::Internal("ingestion queue dropped the flush barrier".to_string()))
    }
}

async fn run_worker(ingestor: Ingestor, mut rx: mpsc::UnboundedReceiver<Job>) {
    while let Some(job) = rx.recv().await {
        match job {
            Job::Ingest(snapshot) => match ingestor.ingest(snapshot).await {
                Ok(IngestOutcome::Stored(ts)) => {
                    tracing::debug!(ts = %ts, "stored raw submission and recompacted bucket");
                }
                Ok(IngestOutcome::Duplicate(ts)) => {
                    tracing::debug!(ts = %ts, "ignored duplicate submission");
                }
                // One failing submission must not take the queue down.
                Err(error) => {
                    tracing::error!(error = %error, "failed to process submission");
                }
            },
            Job::Compact(ts, ack) => {
                let result = ingestor.compact(&ts).await;
                let _ = ack.send(result);
            }
            Job::Flush(ack) => {
                let _ = ack.send(());
            }
        }
    }
}
