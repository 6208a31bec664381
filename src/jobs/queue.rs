//! Unbounded in-process job channel.

use super::{Job, JobSink};
use crate::error::{Error, Result};
use tokio::sync::mpsc;

/// A job plus how many times it has already failed.
#[derive(Debug)]
pub(super) struct Envelope {
    pub(super) job: Job,
    pub(super) attempt: u32,
}

/// Sending half of the queue.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    tx: mpsc::UnboundedSender<Envelope>,
}

impl Dispatcher {
    pub(super) fn redeliver(&self, job: Job, attempt: u32) -> Result<()> {
        self.tx
            .send(Envelope { job, attempt })
            .map_err(|_| Error::QueueClosed)
    }
}

impl JobSink for Dispatcher {
    fn dispatch(&self, job: Job) -> Result<()> {
        self.redeliver(job, 0)
    }
}

/// Receiving half of the queue.
#[derive(Debug)]
pub struct JobQueue {
    rx: mpsc::UnboundedReceiver<Envelope>,
}

impl JobQueue {
    /// Next queued job, or `None` once the queue is empty.
    pub(super) fn try_next(&mut self) -> Option<Envelope> {
        self.rx.try_recv().ok()
    }
}

/// Create a connected dispatcher and queue.
pub fn channel() -> (Dispatcher, JobQueue) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Dispatcher { tx }, JobQueue { rx })
}
