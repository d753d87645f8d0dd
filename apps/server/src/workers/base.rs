//! Base handler trait and the context handed to each invocation

use crate::{
    queue::{Job, JobQueue, JobType},
    Result,
};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use uuid::Uuid;

/// A handler performs the work for one job type.
///
/// Handlers get a copy of the payload and return a JSON result; the worker
/// loop records the outcome in the queue. Returning an error counts as a
/// failed attempt and the job is retried while attempts remain.
#[async_trait]
pub trait JobHandler: Send + Sync {
    /// Handler name for logging
    fn name(&self) -> &str;

    /// The job type this handler processes
    fn job_type(&self) -> JobType;

    /// Process one job payload
    async fn handle(&self, ctx: &JobContext, payload: serde_json::Value)
        -> Result<serde_json::Value>;
}

/// Per-invocation context.
///
/// Only exposes progress reporting for the job being processed; handlers
/// never touch other queue state.
#[derive(Clone)]
pub struct JobContext {
    job_id: Uuid,
    job_type: JobType,
    attempt: u32,
    queue: Arc<dyn JobQueue>,
}

impl JobContext {
    pub fn new(job: &Job, queue: Arc<dyn JobQueue>) -> Self {
        Self {
            job_id: job.id,
            job_type: job.job_type,
            attempt: job.attempts,
            queue,
        }
    }

    pub fn job_id(&self) -> Uuid {
        self.job_id
    }

    pub fn job_type(&self) -> JobType {
        self.job_type
    }

    /// 1-based attempt number
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Record progress. Failures are logged and swallowed so progress
    /// reporting can never fail a job.
    pub async fn report_progress(&self, progress: u8, message: impl Into<String>) {
        let message = message.into();
        tracing::debug!(
            job_id = %self.job_id,
            progress,
            message = %message,
            "Job progress"
        );
        if let Err(e) = self
            .queue
            .update_progress(self.job_id, progress, Some(message))
            .await
        {
            tracing::warn!(job_id = %self.job_id, error = %e, "Failed to record job progress");
        }
    }
}

/// Deserialize a job payload into the handler's parameter type
pub fn parse_payload<T: DeserializeOwned>(payload: serde_json::Value) -> Result<T> {
    Ok(serde_json::from_value(payload)?)
}
