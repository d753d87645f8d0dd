//! Shared application state

use crate::{
    config::Config,
    queue::{InMemoryJobQueue, JobQueue},
    services::{JobService, SearchService},
    workers::{
        create_registry, HandlerDependencies, HandlerRegistry, WorkerLoop, WorkerRunnerConfig,
    },
    Result,
};
use std::sync::Arc;

/// State shared by the HTTP handlers and the background worker.
///
/// The queue is constructed exactly once here and handed to both the
/// service and the worker loop.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub job_service: Arc<JobService>,
    pub search_service: Arc<SearchService>,
    pub worker: Arc<WorkerLoop>,
}

impl AppState {
    /// Build state with the built-in handlers for every job type
    pub fn new(config: Config) -> Result<Self> {
        let queue = Arc::new(InMemoryJobQueue::new(
            config.workers.default_max_attempts,
            config.workers.retry_policy(),
        ));
        Self::with_queue(config, queue)
    }

    /// Built-in handlers around an existing queue
    pub fn with_queue(config: Config, job_queue: Arc<dyn JobQueue>) -> Result<Self> {
        let search_service = Arc::new(SearchService::default());
        let handler_deps = HandlerDependencies::new(
            search_service.documents(),
            search_service.index(),
            &config.handlers,
        );
        let registry = create_registry(&config.handlers, &handler_deps)?;

        Ok(Self::from_parts(config, job_queue, registry, search_service))
    }

    /// Build state around an existing queue and handler registry
    pub fn from_parts(
        config: Config,
        job_queue: Arc<dyn JobQueue>,
        registry: HandlerRegistry,
        search_service: Arc<SearchService>,
    ) -> Self {
        let registry = Arc::new(registry);
        let worker = Arc::new(WorkerLoop::new(
            job_queue.clone(),
            registry.clone(),
            WorkerRunnerConfig::from_config(&config.workers),
        ));

        let mut job_service = JobService::new(job_queue, registry);
        if config.workers.wake_on_enqueue {
            job_service = job_service.with_wake(worker.waker());
        }

        Self {
            config: Arc::new(config),
            job_service: Arc::new(job_service),
            search_service,
            worker,
        }
    }
}
