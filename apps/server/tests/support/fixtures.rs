use axum::body::Bytes;
use async_trait::async_trait;
use petnet_jobs::{
    queue::{EnqueueOptions, Job, JobFilter, JobQueue, JobStats, JobType},
    workers::{JobContext, JobHandler},
    Error, Result,
};
use uuid::Uuid;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub fn to_json_body(value: &Value) -> anyhow::Result<Bytes> {
    Ok(Bytes::from(serde_json::to_vec(value)?))
}

/// POST /api/jobs body
pub fn enqueue_body(job_type: &str, payload: Value) -> Value {
    json!({ "type": job_type, "payload": payload })
}

/// Handler that fails every attempt and counts invocations
pub struct AlwaysFails {
    pub job_type: JobType,
    pub calls: Arc<AtomicUsize>,
}

impl AlwaysFails {
    pub fn new(job_type: JobType) -> (Self, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            Self {
                job_type,
                calls: calls.clone(),
            },
            calls,
        )
    }
}

#[async_trait]
impl JobHandler for AlwaysFails {
    fn name(&self) -> &str {
        "AlwaysFails"
    }

    fn job_type(&self) -> JobType {
        self.job_type
    }

    async fn handle(&self, _ctx: &JobContext, _payload: Value) -> Result<Value> {
        let attempt = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        Err(Error::Handler(format!("attempt {attempt} failed")))
    }
}

/// Handler that echoes its payload back as the result
pub struct Echo(pub JobType);

#[async_trait]
impl JobHandler for Echo {
    fn name(&self) -> &str {
        "Echo"
    }

    fn job_type(&self) -> JobType {
        self.0
    }

    async fn handle(&self, ctx: &JobContext, payload: Value) -> Result<Value> {
        ctx.report_progress(50, "echoing").await;
        Ok(json!({ "echo": payload }))
    }
}

/// Queue whose backing store is unreachable: every call errors
pub struct UnavailableQueue;

impl UnavailableQueue {
    fn down<T>() -> Result<T> {
        Err(Error::JobQueue("store unavailable".to_string()))
    }
}

#[async_trait]
impl JobQueue for UnavailableQueue {
    async fn enqueue(&self, _: JobType, _: Value, _: EnqueueOptions) -> Result<Job> {
        Self::down()
    }

    async fn claim_next(&self) -> Result<Option<Job>> {
        Self::down()
    }

    async fn complete(&self, _: Uuid, _: Value) -> Result<Job> {
        Self::down()
    }

    async fn fail(&self, _: Uuid, _: &str) -> Result<Job> {
        Self::down()
    }

    async fn abort(&self, _: Uuid, _: &str) -> Result<Job> {
        Self::down()
    }

    async fn retry(&self, _: Uuid) -> Result<Job> {
        Self::down()
    }

    async fn update_progress(&self, _: Uuid, _: u8, _: Option<String>) -> Result<()> {
        Self::down()
    }

    async fn get(&self, _: Uuid) -> Result<Option<Job>> {
        Self::down()
    }

    async fn list(&self, _: &JobFilter) -> Result<(Vec<Job>, usize)> {
        Self::down()
    }

    async fn stats(&self) -> Result<JobStats> {
        Self::down()
    }
}
