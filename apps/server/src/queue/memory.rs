//! In-process job queue
//!
//! Jobs live in a map guarded by a single `RwLock`. Every state transition
//! takes the write lock, so `claim_next` is an atomic select-and-update and
//! several workers in one process can share the queue without double claims.

use super::helpers::{aggregate_stats, claim_order, paginate};
use super::models::{EnqueueOptions, Job, JobFilter, JobStats, JobStatus, JobType, RetryPolicy};
use super::traits::JobQueue;
use crate::{Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;
use uuid::Uuid;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

#[derive(Debug, Default)]
struct QueueState {
    jobs: HashMap<Uuid, Job>,
    next_sequence: u64,
}

impl QueueState {
    fn processing_job(&mut self, id: Uuid, action: &'static str) -> Result<&mut Job> {
        let job = self.jobs.get_mut(&id).ok_or(Error::JobNotFound(id))?;
        if job.status != JobStatus::Processing {
            return Err(Error::InvalidTransition {
                id,
                status: job.status,
                action,
            });
        }
        Ok(job)
    }
}

#[derive(Debug)]
pub struct InMemoryJobQueue {
    state: RwLock<QueueState>,
    default_max_attempts: u32,
    retry_policy: RetryPolicy,
}

impl Default for InMemoryJobQueue {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS, RetryPolicy::default())
    }
}

impl InMemoryJobQueue {
    pub fn new(default_max_attempts: u32, retry_policy: RetryPolicy) -> Self {
        Self {
            state: RwLock::new(QueueState::default()),
            default_max_attempts,
            retry_policy,
        }
    }

    /// When a job re-queued after `delay` becomes claimable again.
    ///
    /// Saturates instead of overflowing: the delay is capped by the policy's
    /// `max_delay`, and past the end of the calendar the job waits forever.
    fn backoff_deadline(&self, now: DateTime<Utc>, delay: Duration) -> DateTime<Utc> {
        let after = |delay: Duration| {
            chrono::Duration::from_std(delay)
                .ok()
                .and_then(|delay| now.checked_add_signed(delay))
        };

        after(delay)
            .or_else(|| after(self.retry_policy.max_delay))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

#[async_trait]
impl JobQueue for InMemoryJobQueue {
    async fn enqueue(
        &self,
        job_type: JobType,
        payload: serde_json::Value,
        options: EnqueueOptions,
    ) -> Result<Job> {
        let max_attempts = options.max_attempts.unwrap_or(self.default_max_attempts);
        if max_attempts == 0 {
            return Err(Error::Validation(
                "maxAttempts must be at least 1".to_string(),
            ));
        }

        let mut state = self.state.write().await;
        let sequence = state.next_sequence;
        state.next_sequence += 1;

        let job = Job::new(
            job_type,
            payload,
            options.priority.unwrap_or(0),
            max_attempts,
            sequence,
        );
        state.jobs.insert(job.id, job.clone());

        Ok(job)
    }

    async fn claim_next(&self) -> Result<Option<Job>> {
        let now = Utc::now();
        let mut state = self.state.write().await;

        let next_id = state
            .jobs
            .values()
            .filter(|job| job.is_claimable(now))
            .min_by(|a, b| claim_order(a, b))
            .map(|job| job.id);

        let Some(id) = next_id else {
            return Ok(None);
        };

        let job = state.jobs.get_mut(&id).ok_or(Error::JobNotFound(id))?;
        job.status = JobStatus::Processing;
        job.started_at = Some(now);
        job.available_at = None;
        job.progress = None;
        job.progress_message = None;
        job.attempts += 1;

        Ok(Some(job.clone()))
    }

    async fn complete(&self, id: Uuid, result: serde_json::Value) -> Result<Job> {
        let mut state = self.state.write().await;
        let job = state.processing_job(id, "completed")?;

        job.status = JobStatus::Completed;
        job.result = Some(result);
        job.error = None;
        job.progress = Some(100);
        job.completed_at = Some(Utc::now());

        Ok(job.clone())
    }

    async fn fail(&self, id: Uuid, error: &str) -> Result<Job> {
        let now = Utc::now();
        let mut state = self.state.write().await;
        let job = state.processing_job(id, "failed")?;

        job.last_error = Some(error.to_string());
        if job.can_retry() {
            let delay = self.retry_policy.calculate_delay(job.attempts);
            job.status = JobStatus::Pending;
            job.started_at = None;
            job.progress = None;
            job.progress_message = None;
            job.available_at = (!delay.is_zero()).then(|| self.backoff_deadline(now, delay));
        } else {
            job.status = JobStatus::Failed;
            job.error = Some(error.to_string());
            job.result = None;
            job.completed_at = Some(now);
        }

        Ok(job.clone())
    }

    async fn abort(&self, id: Uuid, error: &str) -> Result<Job> {
        let mut state = self.state.write().await;
        let job = state.processing_job(id, "aborted")?;

        job.status = JobStatus::Failed;
        job.error = Some(error.to_string());
        job.last_error = Some(error.to_string());
        job.result = None;
        job.completed_at = Some(Utc::now());

        Ok(job.clone())
    }

    async fn retry(&self, id: Uuid) -> Result<Job> {
        let mut state = self.state.write().await;
        let job = state.jobs.get_mut(&id).ok_or(Error::JobNotFound(id))?;
        if job.status != JobStatus::Failed {
            return Err(Error::InvalidTransition {
                id,
                status: job.status,
                action: "retried",
            });
        }

        job.status = JobStatus::Pending;
        job.attempts = 0;
        job.error = None;
        job.result = None;
        job.progress = None;
        job.progress_message = None;
        job.available_at = None;
        job.started_at = None;
        job.completed_at = None;

        Ok(job.clone())
    }

    async fn update_progress(
        &self,
        id: Uuid,
        progress: u8,
        message: Option<String>,
    ) -> Result<()> {
        let mut state = self.state.write().await;
        let job = state.processing_job(id, "updated")?;

        job.progress = Some(progress.min(100));
        if message.is_some() {
            job.progress_message = message;
        }

        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Job>> {
        let state = self.state.read().await;
        Ok(state.jobs.get(&id).cloned())
    }

    async fn list(&self, filter: &JobFilter) -> Result<(Vec<Job>, usize)> {
        let state = self.state.read().await;
        Ok(paginate(state.jobs.values(), filter))
    }

    async fn stats(&self) -> Result<JobStats> {
        let state = self.state.read().await;
        Ok(aggregate_stats(state.jobs.values()))
    }
}
