//! Drains the job queue on the blocking thread pool.

use super::queue::{Dispatcher, JobQueue, channel};
use super::{Job, JobSink};
use crate::error::{Error, Result};
use crate::pipeline::Pipeline;
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Outcome of draining the queue.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkerReport {
    /// Jobs that succeeded.
    pub completed: usize,
    /// Failed attempts that were queued again.
    pub redelivered: usize,
    /// Jobs that failed on their last attempt, with the error.
    pub failed: Vec<(Job, String)>,
}

/// Runs queued jobs one at a time until the queue is empty.
pub struct Worker {
    pipeline: Arc<Pipeline>,
    dispatcher: Dispatcher,
    queue: JobQueue,
    redeliveries: u32,
}

impl Worker {
    /// Worker with its own queue. A failing job is retried up to `redeliveries` times.
    pub fn new(pipeline: Arc<Pipeline>, redeliveries: u32) -> Self {
        let (dispatcher, queue) = channel();
        Self {
            pipeline,
            dispatcher,
            queue,
            redeliveries,
        }
    }

    /// Sink feeding this worker's queue.
    pub fn dispatcher(&self) -> Dispatcher {
        self.dispatcher.clone()
    }

    /// Queue a job.
    pub fn submit(&self, job: Job) -> Result<()> {
        self.dispatcher.dispatch(job)
    }

    /// Execute jobs, including the follow-ups they dispatch, until none remain.
    pub async fn run_until_idle(&mut self) -> Result<WorkerReport> {
        let mut report = WorkerReport::default();

        while let Some(envelope) = self.queue.try_next() {
            let job = envelope.job;
            debug!("Running job: {job}");

            let pipeline = Arc::clone(&self.pipeline);
            let sink = self.dispatcher.clone();
            let task_job = job.clone();
            let outcome = tokio::task::spawn_blocking(move || pipeline.execute(&task_job, &sink))
                .await
                .map_err(|e| Error::WorkerJoin {
                    reason: e.to_string(),
                })?;

            match outcome {
                Ok(()) => report.completed += 1,
                Err(e) if envelope.attempt < self.redeliveries => {
                    warn!(
                        "Job failed ({job}), redelivering (attempt {} of {}): {e}",
                        envelope.attempt + 1,
                        self.redeliveries + 1
                    );
                    self.dispatcher.redeliver(job, envelope.attempt + 1)?;
                    report.redelivered += 1;
                }
                Err(e) => {
                    error!("Job failed ({job}): {e}");
                    report.failed.push((job, e.to_string()));
                }
            }
        }

        Ok(report)
    }
}
