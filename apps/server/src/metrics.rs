//! Metrics collection
//!
//! Prometheus metrics for HTTP traffic and the job queue, registered in the
//! default registry and exposed on `/metrics`.

use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter, register_int_counter_vec,
    register_int_gauge_vec, HistogramVec, IntCounter, IntCounterVec, IntGaugeVec,
};

use crate::queue::{JobStats, JobStatus};

lazy_static! {
    // HTTP Request Metrics

    /// Total HTTP requests by method, path, and status
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "petnet_http_requests_total",
        "Total number of HTTP requests",
        &["method", "path", "status"]
    )
    .expect("Failed to register HTTP_REQUESTS_TOTAL");

    /// HTTP request duration in seconds
    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "petnet_http_request_duration_seconds",
        "HTTP request duration in seconds",
        &["method", "path"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    )
    .expect("Failed to register HTTP_REQUEST_DURATION_SECONDS");

    /// In-flight HTTP requests
    pub static ref HTTP_REQUESTS_IN_FLIGHT: IntGaugeVec = register_int_gauge_vec!(
        "petnet_http_requests_in_flight",
        "Number of HTTP requests currently being processed",
        &["method", "path"]
    )
    .expect("Failed to register HTTP_REQUESTS_IN_FLIGHT");

    // Job Queue Metrics

    /// Jobs enqueued
    pub static ref JOBS_ENQUEUED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "petnet_jobs_enqueued_total",
        "Total number of jobs enqueued",
        &["job_type"]
    )
    .expect("Failed to register JOBS_ENQUEUED_TOTAL");

    /// Handler invocations by outcome (completed, retried, failed, aborted)
    pub static ref JOBS_FINISHED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "petnet_jobs_finished_total",
        "Total number of job attempts by outcome",
        &["job_type", "outcome"]
    )
    .expect("Failed to register JOBS_FINISHED_TOTAL");

    /// Job duration
    pub static ref JOB_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "petnet_job_duration_seconds",
        "Job handler execution duration in seconds",
        &["job_type"],
        vec![0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 10.0, 30.0, 60.0, 300.0]
    )
    .expect("Failed to register JOB_DURATION_SECONDS");

    /// Jobs in queue by status
    pub static ref JOBS_QUEUE_SIZE: IntGaugeVec = register_int_gauge_vec!(
        "petnet_jobs_queue_size",
        "Number of jobs in queue",
        &["status"]
    )
    .expect("Failed to register JOBS_QUEUE_SIZE");

    /// Worker loop ticks that ran (skipped ticks are not counted)
    pub static ref WORKER_TICKS_TOTAL: IntCounter = register_int_counter!(
        "petnet_worker_ticks_total",
        "Total number of worker loop ticks"
    )
    .expect("Failed to register WORKER_TICKS_TOTAL");
}

/// Publish a stats snapshot to the queue size gauges
pub fn record_queue_size(stats: &JobStats) {
    for status in JobStatus::ALL {
        JOBS_QUEUE_SIZE
            .with_label_values(&[status.as_str()])
            .set(stats.count(status) as i64);
    }
}

/// Helper to sanitize path for metrics labels (replace IDs, limit cardinality)
pub fn sanitize_path(path: &str) -> String {
    let segments: Vec<&str> = path
        .split('/')
        .filter(|s| !s.is_empty())
        .map(|segment| {
            if uuid::Uuid::parse_str(segment).is_ok() {
                "{id}"
            } else {
                segment
            }
        })
        .take(3)
        .collect();

    format!("/{}", segments.join("/"))
}
