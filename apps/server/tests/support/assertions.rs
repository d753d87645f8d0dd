use anyhow::Context as _;
use axum::http::StatusCode;
use serde_json::Value;

/// Assert status code matches expected
pub fn assert_status(actual: StatusCode, expected: StatusCode, context: &str) {
    assert_eq!(
        actual, expected,
        "{context}: expected status {expected}, got {actual}"
    );
}

/// Assert the body is an error envelope with the given code
pub fn assert_error_code(body: &Value, expected: &str) {
    assert_eq!(
        body.get("error").and_then(|v| v.as_str()),
        Some(expected),
        "expected error code {expected}, got {body}"
    );
    assert!(
        body.get("message").and_then(|v| v.as_str()).is_some(),
        "error body should carry a message: {body}"
    );
}

/// Job id from a job body
pub fn job_id(job: &Value) -> anyhow::Result<&str> {
    job.get("id").and_then(|v| v.as_str()).context("job.id is a string")
}

/// Assert a job body has the given status
pub fn assert_job_status(job: &Value, expected: &str) {
    assert_eq!(
        job.get("status").and_then(|v| v.as_str()),
        Some(expected),
        "expected job status {expected}, got {job}"
    );
}

/// Count of jobs in a given status from a stats body
pub fn stat(stats: &Value, key: &str) -> u64 {
    stats.get(key).and_then(|v| v.as_u64()).unwrap_or_default()
}
