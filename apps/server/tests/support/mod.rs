pub mod assertions;
pub mod fixtures;

use anyhow::Context as _;
use axum::{
    body::{Body, Bytes},
    http::{HeaderMap, HeaderName, HeaderValue, Method, Request, StatusCode},
    Router,
};
use petnet_jobs::{
    api::create_router,
    queue::{InMemoryJobQueue, JobQueue},
    services::SearchService,
    workers::HandlerRegistry,
    AppState, Config,
};
use std::sync::Arc;
use tower::ServiceExt as _;

pub use assertions::*;
pub use fixtures::*;

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
}

impl TestApp {
    /// App with the built-in handlers and the worker loop left stopped.
    /// Tests drive the worker explicitly via `state.worker.tick()`.
    pub fn new() -> anyhow::Result<Self> {
        Self::new_with_config(|_| {})
    }

    pub fn new_with_config(configure: impl FnOnce(&mut Config)) -> anyhow::Result<Self> {
        let state = AppState::new(test_config(configure)).context("build app state")?;
        Ok(Self::from_state(state))
    }

    /// App with the built-in handlers over a caller-supplied queue
    pub fn new_with_queue(queue: Arc<dyn JobQueue>) -> anyhow::Result<Self> {
        let state =
            AppState::with_queue(test_config(|_| {}), queue).context("build app state")?;
        Ok(Self::from_state(state))
    }

    /// App with a caller-supplied handler registry
    pub fn new_with_registry(
        configure: impl FnOnce(&mut Config),
        registry: HandlerRegistry,
    ) -> Self {
        let config = test_config(configure);
        let queue = Arc::new(InMemoryJobQueue::new(
            config.workers.default_max_attempts,
            config.workers.retry_policy(),
        ));
        let state = AppState::from_parts(
            config,
            queue,
            registry,
            Arc::new(SearchService::default()),
        );
        Self::from_state(state)
    }

    fn from_state(state: AppState) -> Self {
        petnet_jobs::logging::init_simple_logging();

        let router = create_router(state.clone());
        Self { router, state }
    }

    pub async fn request(
        &self,
        method: Method,
        path_and_query: &str,
        body: Option<Bytes>,
    ) -> anyhow::Result<(StatusCode, HeaderMap, Bytes)> {
        self.request_with_extra_headers(method, path_and_query, body, &[])
            .await
    }

    pub async fn request_with_extra_headers(
        &self,
        method: Method,
        path_and_query: &str,
        body: Option<Bytes>,
        extra_headers: &[(&str, &str)],
    ) -> anyhow::Result<(StatusCode, HeaderMap, Bytes)> {
        let mut request = Request::builder()
            .method(method)
            .uri(path_and_query)
            .header("host", "example.org")
            .header("accept", "application/json")
            .header("content-type", "application/json")
            .body(match body {
                Some(bytes) => Body::from(bytes),
                None => Body::empty(),
            })
            .context("build request")?;

        for (name, value) in extra_headers {
            request.headers_mut().insert(
                name.parse::<HeaderName>().context("parse header name")?,
                value.parse::<HeaderValue>().context("parse header value")?,
            );
        }

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .context("dispatch request")?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .context("read response body")?;

        Ok((status, headers, body))
    }

    /// Request and parse the body as JSON
    pub async fn request_json(
        &self,
        method: Method,
        path_and_query: &str,
        body: Option<Bytes>,
    ) -> anyhow::Result<(StatusCode, serde_json::Value)> {
        let (status, _headers, body) = self.request(method, path_and_query, body).await?;
        let value = serde_json::from_slice(&body)
            .with_context(|| format!("parse JSON body of {path_and_query}"))?;
        Ok((status, value))
    }
}

fn test_config(configure: impl FnOnce(&mut Config)) -> Config {
    let mut config = Config::default();
    config.workers.enabled = false;
    config.handlers.notification_delay_ms = 0;
    config.handlers.transcode_delay_ms = 0;
    configure(&mut config);
    config
}
