//! Background workers for asynchronous processing
//!
//! The worker loop polls the job queue and dispatches each claimed job to the
//! handler registered for its type.

mod base;
mod link_check;
mod notification;
mod registry;
mod runner;
mod search_index;
mod transcode;

pub use base::{parse_payload, JobContext, JobHandler};
pub use link_check::LinkCheckHandler;
pub use notification::{
    Notification, Notifier, NotifyUserHandler, SendNotificationHandler, SimulatedNotifier,
};
pub use registry::HandlerRegistry;
pub use runner::{JobOutcome, TickReport, WorkerLoop, WorkerRunnerConfig};
pub use search_index::{
    Document, DocumentKind, DocumentSource, InMemoryDocumentSource, RebuildSearchIndexHandler,
    SearchIndex,
};
pub use transcode::TranscodeVideoHandler;

use crate::{config::HandlerConfig, Result};
use std::sync::Arc;
use std::time::Duration;

/// Collaborators the built-in handlers need
#[derive(Clone)]
pub struct HandlerDependencies {
    pub documents: Arc<dyn DocumentSource>,
    pub search_index: Arc<SearchIndex>,
    pub notifier: Arc<dyn Notifier>,
}

impl HandlerDependencies {
    pub fn new(
        documents: Arc<dyn DocumentSource>,
        search_index: Arc<SearchIndex>,
        config: &HandlerConfig,
    ) -> Self {
        Self {
            documents,
            search_index,
            notifier: Arc::new(SimulatedNotifier::new(Duration::from_millis(
                config.notification_delay_ms,
            ))),
        }
    }
}

/// Register a handler for every job type
pub fn create_registry(
    config: &HandlerConfig,
    deps: &HandlerDependencies,
) -> Result<HandlerRegistry> {
    let registry = HandlerRegistry::new()
        .with(LinkCheckHandler::new(config)?)
        .with(NotifyUserHandler::new(deps.notifier.clone()))
        .with(SendNotificationHandler::new(deps.notifier.clone()))
        .with(RebuildSearchIndexHandler::new(
            deps.documents.clone(),
            deps.search_index.clone(),
        ))
        .with(TranscodeVideoHandler::new(Duration::from_millis(
            config.transcode_delay_ms,
        )));

    Ok(registry)
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::JobType;

    #[test]
    fn every_job_type_has_a_builtin_handler() {
        let config = HandlerConfig::default();
        let deps = HandlerDependencies::new(
            Arc::new(InMemoryDocumentSource::default()),
            Arc::new(SearchIndex::new()),
            &config,
        );
        let registry = create_registry(&config, &deps).expect("registry");

        assert_eq!(registry.len(), JobType::ALL.len());
        for job_type in JobType::ALL {
            assert!(registry.contains(job_type), "missing handler for {job_type}");
        }
    }
}
