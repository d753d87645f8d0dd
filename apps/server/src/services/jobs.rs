//! Job service: the enqueue and inspection API used by external callers

use crate::{
    queue::{EnqueueOptions, Job, JobFilter, JobQueue, JobStats, JobType},
    workers::HandlerRegistry,
    Error, Result,
};
use std::sync::Arc;
use tokio::sync::Notify;
use uuid::Uuid;

pub struct JobService {
    queue: Arc<dyn JobQueue>,
    registry: Arc<HandlerRegistry>,
    wake: Option<Arc<Notify>>,
}

impl JobService {
    pub fn new(queue: Arc<dyn JobQueue>, registry: Arc<HandlerRegistry>) -> Self {
        Self {
            queue,
            registry,
            wake: None,
        }
    }

    /// Wake the worker loop whenever a job is enqueued
    pub fn with_wake(mut self, wake: Arc<Notify>) -> Self {
        self.wake = Some(wake);
        self
    }

    /// Enqueue a job by its wire name (e.g. `"link-check"`)
    pub async fn enqueue_job(
        &self,
        job_type: &str,
        payload: serde_json::Value,
        options: EnqueueOptions,
    ) -> Result<Job> {
        let job_type: JobType = job_type.parse()?;
        self.enqueue(job_type, payload, options).await
    }

    /// Enqueue a job. Types without a registered handler are rejected
    /// before anything is stored.
    pub async fn enqueue(
        &self,
        job_type: JobType,
        payload: serde_json::Value,
        options: EnqueueOptions,
    ) -> Result<Job> {
        if !self.registry.contains(job_type) {
            return Err(Error::HandlerNotRegistered(job_type));
        }

        let job = self.queue.enqueue(job_type, payload, options).await?;

        crate::metrics::JOBS_ENQUEUED_TOTAL
            .with_label_values(&[job_type.as_str()])
            .inc();
        tracing::info!(
            job_id = %job.id,
            job_type = %job.job_type,
            priority = job.priority,
            max_attempts = job.max_attempts,
            "Job enqueued"
        );

        if let Some(wake) = &self.wake {
            wake.notify_one();
        }

        Ok(job)
    }

    /// Re-queue a failed job with a fresh attempt budget
    pub async fn retry_job(&self, id: Uuid) -> Result<Job> {
        let job = self.queue.retry(id).await?;

        tracing::info!(
            job_id = %job.id,
            job_type = %job.job_type,
            last_error = job.last_error.as_deref().unwrap_or(""),
            "Job re-queued for retry"
        );

        if let Some(wake) = &self.wake {
            wake.notify_one();
        }

        Ok(job)
    }

    pub async fn get_job(&self, id: Uuid) -> Result<Job> {
        self.queue.get(id).await?.ok_or(Error::JobNotFound(id))
    }

    pub async fn list_jobs(&self, filter: &JobFilter) -> Result<(Vec<Job>, usize)> {
        self.queue.list(filter).await
    }

    /// Current queue statistics; also refreshes the queue size gauges
    pub async fn job_stats(&self) -> Result<JobStats> {
        let stats = self.queue.stats().await?;
        crate::metrics::record_queue_size(&stats);
        Ok(stats)
    }

    /// Best-effort statistics: zeros when the queue cannot be read
    pub async fn job_stats_or_default(&self) -> JobStats {
        match self.job_stats().await {
            Ok(stats) => stats,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read job stats, reporting zeros");
                JobStats::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::{InMemoryJobQueue, JobStatus};
    use crate::workers::{JobContext, JobHandler};
    use async_trait::async_trait;
    use serde_json::json;

    struct Noop(JobType);

    #[async_trait]
    impl JobHandler for Noop {
        fn name(&self) -> &str {
            "Noop"
        }

        fn job_type(&self) -> JobType {
            self.0
        }

        async fn handle(
            &self,
            _ctx: &JobContext,
            _payload: serde_json::Value,
        ) -> Result<serde_json::Value> {
            Ok(json!(null))
        }
    }

    fn service() -> (JobService, Arc<InMemoryJobQueue>) {
        let queue = Arc::new(InMemoryJobQueue::default());
        let registry = HandlerRegistry::new()
            .with(Noop(JobType::LinkCheck))
            .with(Noop(JobType::NotifyUser));
        (JobService::new(queue.clone(), Arc::new(registry)), queue)
    }

    #[tokio::test]
    async fn enqueue_job_returns_pending_job() {
        let (service, _) = service();
        let job = service
            .enqueue_job(
                "link-check",
                json!({"url": "https://example.com"}),
                EnqueueOptions::default(),
            )
            .await
            .unwrap();

        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.attempts, 0);
        assert_eq!(service.get_job(job.id).await.unwrap(), job);
    }

    #[tokio::test]
    async fn bogus_type_is_rejected_and_nothing_is_stored() {
        let (service, queue) = service();
        let err = service
            .enqueue_job("bogus", json!({}), EnqueueOptions::default())
            .await
            .unwrap_err();

        assert!(err.is_configuration());
        assert_eq!(queue.stats().await.unwrap().total(), 0);
    }

    #[tokio::test]
    async fn known_type_without_handler_is_rejected() {
        let (service, queue) = service();
        let err = service
            .enqueue_job("transcode-video", json!({}), EnqueueOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::HandlerNotRegistered(JobType::TranscodeVideo)));
        assert_eq!(queue.stats().await.unwrap().total(), 0);
    }

    #[tokio::test]
    async fn enqueue_wakes_the_worker() {
        let (service, _) = service();
        let wake = Arc::new(Notify::new());
        let service = service.with_wake(wake.clone());

        service
            .enqueue(JobType::NotifyUser, json!({}), EnqueueOptions::default())
            .await
            .unwrap();

        // notify_one stores a permit, so this resolves immediately
        tokio::time::timeout(std::time::Duration::from_secs(1), wake.notified())
            .await
            .expect("worker should have been woken");
    }

    #[tokio::test]
    async fn missing_job_is_not_found() {
        let (service, _) = service();
        let id = Uuid::new_v4();
        assert!(matches!(
            service.get_job(id).await,
            Err(Error::JobNotFound(missing)) if missing == id
        ));
    }

    #[tokio::test]
    async fn retry_job_requeues_failed_job_and_wakes_the_worker() {
        let (service, queue) = service();
        let wake = Arc::new(Notify::new());
        let service = service.with_wake(wake.clone());

        let job = queue
            .enqueue(
                JobType::LinkCheck,
                json!({}),
                EnqueueOptions::default().with_max_attempts(1),
            )
            .await
            .unwrap();
        queue.claim_next().await.unwrap();
        queue.fail(job.id, "dns lookup failed").await.unwrap();

        let retried = service.retry_job(job.id).await.unwrap();
        assert_eq!(retried.status, JobStatus::Pending);
        assert_eq!(retried.attempts, 0);
        tokio::time::timeout(std::time::Duration::from_secs(1), wake.notified())
            .await
            .expect("worker should have been woken");

        assert!(matches!(
            service.retry_job(job.id).await,
            Err(Error::InvalidTransition { .. })
        ));
    }

    #[tokio::test]
    async fn stats_sum_to_enqueued_jobs() {
        let (service, _) = service();
        for _ in 0..3 {
            service
                .enqueue(JobType::LinkCheck, json!({}), EnqueueOptions::default())
                .await
                .unwrap();
        }

        let stats = service.job_stats_or_default().await;
        assert_eq!(stats.total(), 3);
        assert_eq!(stats.backlog, 3);
    }
}
