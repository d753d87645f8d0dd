//! Worker loop that claims jobs from the queue and runs their handlers

use super::base::JobContext;
use super::registry::HandlerRegistry;
use crate::{
    queue::{Job, JobQueue, JobStatus},
    Error,
};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::{
    sync::{watch, Mutex, Notify},
    task::JoinHandle,
    time::{Duration, MissedTickBehavior},
};

#[derive(Clone, Debug)]
pub struct WorkerRunnerConfig {
    pub poll_interval: Duration,
    /// Maximum number of jobs claimed per tick
    pub batch_size: usize,
    pub handler_timeout: Option<Duration>,
}

impl WorkerRunnerConfig {
    pub fn from_config(config: &crate::config::WorkerConfig) -> Self {
        Self {
            poll_interval: config.poll_interval(),
            batch_size: config.batch_size.max(1),
            handler_timeout: config.handler_timeout(),
        }
    }
}

impl Default for WorkerRunnerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            batch_size: 1,
            handler_timeout: Some(Duration::from_secs(300)),
        }
    }
}

/// What happened to a claimed job after its handler ran
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    Completed,
    Retried,
    Failed,
    /// Failed without running a handler (configuration error)
    Aborted,
    /// The queue rejected the outcome update
    Lost,
}

impl JobOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobOutcome::Completed => "completed",
            JobOutcome::Retried => "retried",
            JobOutcome::Failed => "failed",
            JobOutcome::Aborted => "aborted",
            JobOutcome::Lost => "lost",
        }
    }
}

/// Summary of one tick
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Another tick was still running, nothing was claimed
    pub skipped: bool,
    pub outcomes: Vec<JobOutcome>,
}

impl TickReport {
    pub fn claimed(&self) -> usize {
        self.outcomes.len()
    }
}

struct WorkerInner {
    queue: Arc<dyn JobQueue>,
    registry: Arc<HandlerRegistry>,
    config: WorkerRunnerConfig,
    ticking: AtomicBool,
    wake: Arc<Notify>,
}

struct RunningLoop {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// Timer-driven worker loop.
///
/// One loop task per `WorkerLoop`. Ticks run one after another inside that
/// task, and `tick()` is gated by a flag so a manual tick can never overlap a
/// timer tick. `stop()` waits for the current tick to finish; handlers that
/// are already running are never cancelled by it.
pub struct WorkerLoop {
    inner: Arc<WorkerInner>,
    running: Mutex<Option<RunningLoop>>,
}

impl WorkerLoop {
    pub fn new(
        queue: Arc<dyn JobQueue>,
        registry: Arc<HandlerRegistry>,
        config: WorkerRunnerConfig,
    ) -> Self {
        Self {
            inner: Arc::new(WorkerInner {
                queue,
                registry,
                config,
                ticking: AtomicBool::new(false),
                wake: Arc::new(Notify::new()),
            }),
            running: Mutex::new(None),
        }
    }

    /// Signal that wakes the loop ahead of its next timer tick
    pub fn waker(&self) -> Arc<Notify> {
        self.inner.wake.clone()
    }

    /// Start the loop task. Returns `false` if it was already running.
    pub async fn start(&self) -> bool {
        let mut running = self.running.lock().await;
        if let Some(current) = running.as_ref() {
            if !current.handle.is_finished() {
                tracing::debug!("Worker loop already running");
                return false;
            }
        }

        let (shutdown, shutdown_rx) = watch::channel(false);
        let inner = self.inner.clone();
        let handle = tokio::spawn(async move { inner.run(shutdown_rx).await });

        tracing::info!(
            poll_interval_ms = self.inner.config.poll_interval.as_millis() as u64,
            batch_size = self.inner.config.batch_size,
            job_types = ?self.inner.registry.job_types(),
            "Worker loop started"
        );

        *running = Some(RunningLoop { shutdown, handle });
        true
    }

    /// Stop the loop and wait for the tick in progress to finish.
    /// Returns `false` if the loop was not running.
    pub async fn stop(&self) -> bool {
        let Some(current) = self.running.lock().await.take() else {
            return false;
        };

        let _ = current.shutdown.send(true);
        if let Err(e) = current.handle.await {
            tracing::error!(error = %e, "Worker loop task ended abnormally");
        }

        tracing::info!("Worker loop stopped");
        true
    }

    pub async fn is_running(&self) -> bool {
        self.running
            .lock()
            .await
            .as_ref()
            .is_some_and(|current| !current.handle.is_finished())
    }

    /// Run one tick now
    pub async fn tick(&self) -> TickReport {
        self.inner.tick().await
    }
}

/// Clears the tick flag even if a tick unwinds
struct TickGuard<'a>(&'a AtomicBool);

impl Drop for TickGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl WorkerInner {
    async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let mut interval = tokio::time::interval(self.config.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        tracing::debug!("Worker loop shutdown requested");
                        return;
                    }
                    continue;
                }
                _ = interval.tick() => {}
                _ = self.wake.notified() => {
                    tracing::trace!("Worker loop woken by enqueue");
                }
            }

            self.tick().await;
        }
    }

    async fn tick(&self) -> TickReport {
        if self
            .ticking
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!("Previous tick still running, skipping");
            return TickReport {
                skipped: true,
                outcomes: Vec::new(),
            };
        }
        let _guard = TickGuard(&self.ticking);
        crate::metrics::WORKER_TICKS_TOTAL.inc();

        let mut report = TickReport::default();
        while report.claimed() < self.config.batch_size {
            let job = match self.queue.claim_next().await {
                Ok(Some(job)) => job,
                Ok(None) => break,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to claim next job");
                    break;
                }
            };
            report.outcomes.push(self.process_job(job).await);
        }

        report
    }

    #[tracing::instrument(
        name = "process_job",
        skip_all,
        fields(job_id = %job.id, job_type = %job.job_type, attempt = job.attempts)
    )]
    async fn process_job(&self, job: Job) -> JobOutcome {
        let Some(handler) = self.registry.get(job.job_type) else {
            let error = Error::HandlerNotRegistered(job.job_type);
            tracing::error!(error = %error, "Job has no handler, failing without retry");
            let outcome = match self.queue.abort(job.id, &error.to_string()).await {
                Ok(_) => JobOutcome::Aborted,
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to record aborted job");
                    JobOutcome::Lost
                }
            };
            record_outcome(&job, outcome, None);
            return outcome;
        };

        tracing::info!(handler = handler.name(), "Processing job");
        let ctx = JobContext::new(&job, self.queue.clone());
        let started = Instant::now();

        let invocation = AssertUnwindSafe(handler.handle(&ctx, job.payload.clone())).catch_unwind();
        let result = match self.config.handler_timeout {
            Some(limit) => match tokio::time::timeout(limit, invocation).await {
                Ok(result) => result,
                Err(_) => Ok(Err(Error::HandlerTimeout(limit))),
            },
            None => invocation.await,
        };
        let result = result.unwrap_or_else(|panic| Err(Error::HandlerPanic(panic_message(panic))));
        let elapsed = started.elapsed();

        let outcome = match result {
            Ok(value) => match self.queue.complete(job.id, value).await {
                Ok(_) => {
                    tracing::info!(duration_ms = elapsed.as_millis() as u64, "Job completed");
                    JobOutcome::Completed
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to record job completion");
                    JobOutcome::Lost
                }
            },
            Err(error) if error.is_configuration() => {
                tracing::error!(error = %error, "Job misconfigured, failing without retry");
                match self.queue.abort(job.id, &error.to_string()).await {
                    Ok(_) => JobOutcome::Aborted,
                    Err(e) => {
                        tracing::warn!(error = %e, "Failed to record aborted job");
                        JobOutcome::Lost
                    }
                }
            }
            Err(error) => match self.queue.fail(job.id, &error.to_string()).await {
                Ok(updated) if updated.status == JobStatus::Pending => {
                    tracing::warn!(
                        error = %error,
                        attempts = updated.attempts,
                        max_attempts = updated.max_attempts,
                        "Job attempt failed, re-queued for retry"
                    );
                    JobOutcome::Retried
                }
                Ok(updated) => {
                    tracing::error!(
                        error = %error,
                        attempts = updated.attempts,
                        "Job failed permanently"
                    );
                    JobOutcome::Failed
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to record job failure");
                    JobOutcome::Lost
                }
            },
        };

        record_outcome(&job, outcome, Some(elapsed));
        outcome
    }
}

fn record_outcome(job: &Job, outcome: JobOutcome, elapsed: Option<Duration>) {
    crate::metrics::JOBS_FINISHED_TOTAL
        .with_label_values(&[job.job_type.as_str(), outcome.as_str()])
        .inc();
    if let Some(elapsed) = elapsed {
        crate::metrics::JOB_DURATION_SECONDS
            .with_label_values(&[job.job_type.as_str()])
            .observe(elapsed.as_secs_f64());
    }
}

fn panic_message(panic: Box<dyn std::any::Any + Send>) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
