//! Job queue connecting pipeline stages.
//!
//! Delivery is at-least-once: a failed job may be redelivered, so every job
//! must be safe to run again. The stages provide that through completion
//! flags and delete-then-insert writes, not through the queue.

mod queue;
mod worker;

pub use queue::{Dispatcher, JobQueue, channel};
pub use worker::{Worker, WorkerReport};

use crate::error::Result;
use crate::inference::EmbeddingClass;
use crate::scoring::ScoreMode;
use crate::store::{DetectionId, PhotoId};
use std::fmt;

/// A unit of pipeline work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Job {
    /// Run detectors on photos.
    Detect {
        /// Photos to process.
        photos: Vec<PhotoId>,
        /// Re-run detectors that already ran.
        force: bool,
    },
    /// Embed detections for one class.
    Extract {
        /// Detections to embed.
        detections: Vec<DetectionId>,
        /// Embedding class.
        class: EmbeddingClass,
        /// Replace existing embeddings.
        force: bool,
    },
    /// Link detections to ground-truth boxes.
    Associate {
        /// Photos to re-associate.
        photos: Vec<PhotoId>,
    },
    /// Score sightings and cache the rankings.
    Score {
        /// Sightings to cover.
        mode: ScoreMode,
    },
}

impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Detect { photos, force } => {
                write!(f, "detect {} photos", photos.len())?;
                if *force {
                    write!(f, " (forced)")?;
                }
                Ok(())
            }
            Self::Extract {
                detections, class, ..
            } => write!(f, "extract {class} for {} detections", detections.len()),
            Self::Associate { photos } => write!(f, "associate {} photos", photos.len()),
            Self::Score { mode } => match mode {
                ScoreMode::FillMissing => write!(f, "score unscored sightings"),
                ScoreMode::RecomputeAll => write!(f, "score all sightings"),
                ScoreMode::Sightings(ids) => write!(f, "score {} sightings", ids.len()),
            },
        }
    }
}

/// Accepts jobs for later execution.
pub trait JobSink: Send + Sync {
    /// Queue a job; the caller does not wait for it.
    fn dispatch(&self, job: Job) -> Result<()>;
}

/// Sink that drops every job, for running one stage in isolation.
#[derive(Debug, Clone, Copy, Default)]
pub struct Discard;

impl JobSink for Discard {
    fn dispatch(&self, job: Job) -> Result<()> {
        tracing::debug!("Not chaining: {job}");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_job_display() {
        let detect = Job::Detect {
            photos: vec![PhotoId(1), PhotoId(2)],
            force: true,
        };
        assert_eq!(detect.to_string(), "detect 2 photos (forced)");

        let extract = Job::Extract {
            detections: vec![DetectionId(7)],
            class: EmbeddingClass::LeftEar,
            force: false,
        };
        assert_eq!(extract.to_string(), "extract left_ear for 1 detections");

        let score = Job::Score {
            mode: ScoreMode::Sightings(vec![]),
        };
        assert_eq!(score.to_string(), "score 0 sightings");
        assert_eq!(
            Job::Score {
                mode: ScoreMode::RecomputeAll
            }
            .to_string(),
            "score all sightings"
        );
    }

    #[test]
    fn test_discard_accepts_jobs() {
        let job = Job::Associate {
            photos: vec![PhotoId(3)],
        };
        assert!(Discard.dispatch(job).is_ok());
    }

    #[test]
    fn test_channel_delivers_in_order() {
        let (dispatcher, mut queue) = channel();
        dispatcher
            .dispatch(Job::Associate { photos: vec![] })
            .unwrap();
        dispatcher
            .dispatch(Job::Score {
                mode: ScoreMode::FillMissing,
            })
            .unwrap();

        let first = queue.try_next().unwrap();
        assert_eq!(first.job, Job::Associate { photos: vec![] });
        assert_eq!(first.attempt, 0);
        assert!(matches!(queue.try_next().unwrap().job, Job::Score { .. }));
        assert!(queue.try_next().is_none());
    }

    #[test]
    fn test_closed_queue_rejects_dispatch() {
        let (dispatcher, queue) = channel();
        drop(queue);
        assert!(matches!(
            dispatcher.dispatch(Job::Associate { photos: vec![] }),
            Err(crate::error::Error::QueueClosed)
        ));
    }
}
