//! Job queue trait

use super::models::{EnqueueOptions, Job, JobFilter, JobStats, JobType};
use crate::Result;
use async_trait::async_trait;
use uuid::Uuid;

/// Storage seam for job records.
///
/// Implementations own every `Job`; callers only ever see clones. `claim_next`
/// must select and transition a job in one atomic step so that two workers
/// sharing a store can never hold the same job.
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Create a pending job
    async fn enqueue(
        &self,
        job_type: JobType,
        payload: serde_json::Value,
        options: EnqueueOptions,
    ) -> Result<Job>;

    /// Claim the next eligible pending job, if any
    async fn claim_next(&self) -> Result<Option<Job>>;

    /// Mark a processing job as completed
    async fn complete(&self, id: Uuid, result: serde_json::Value) -> Result<Job>;

    /// Record a failed attempt, re-queueing the job while attempts remain
    async fn fail(&self, id: Uuid, error: &str) -> Result<Job>;

    /// Fail a processing job permanently, ignoring remaining attempts
    async fn abort(&self, id: Uuid, error: &str) -> Result<Job>;

    /// Put a failed job back in the queue with a fresh attempt budget
    async fn retry(&self, id: Uuid) -> Result<Job>;

    /// Report progress for a processing job
    async fn update_progress(&self, id: Uuid, progress: u8, message: Option<String>)
        -> Result<()>;

    /// Look up a job by ID
    async fn get(&self, id: Uuid) -> Result<Option<Job>>;

    /// List jobs (newest first) with the total number of matches
    async fn list(&self, filter: &JobFilter) -> Result<(Vec<Job>, usize)>;

    /// Aggregate counts per status
    async fn stats(&self) -> Result<JobStats>;
}
