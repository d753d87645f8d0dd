//! Job endpoints: enqueue, inspect, retry, list and stats

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::{
    api::extractors::JsonBody,
    queue::{EnqueueOptions, JobFilter, JobStatus, JobType},
    state::AppState,
    Error, Result,
};

const DEFAULT_PAGE_SIZE: usize = 50;
const MAX_PAGE_SIZE: usize = 500;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct EnqueueJobRequest {
    #[serde(rename = "type")]
    #[validate(length(min = 1, message = "type is required"))]
    pub job_type: String,
    #[serde(default)]
    pub payload: serde_json::Value,
    pub priority: Option<i32>,
    #[validate(range(min = 1, max = 100, message = "maxAttempts must be between 1 and 100"))]
    pub max_attempts: Option<u32>,
}

/// POST /api/jobs
pub async fn enqueue_job(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<EnqueueJobRequest>,
) -> Result<Response> {
    req.validate()
        .map_err(|e| Error::Validation(e.to_string()))?;

    let options = EnqueueOptions {
        priority: req.priority,
        max_attempts: req.max_attempts,
    };
    let job = state
        .job_service
        .enqueue_job(req.job_type.trim(), req.payload, options)
        .await?;

    Ok((StatusCode::CREATED, Json(job)).into_response())
}

/// GET /api/jobs/{id}
pub async fn get_job(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Response> {
    let job = state.job_service.get_job(id).await?;
    Ok(Json(job).into_response())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum JobAction {
    Retry,
}

#[derive(Debug, Deserialize)]
pub struct UpdateJobRequest {
    pub action: String,
}

impl UpdateJobRequest {
    fn action(&self) -> Result<JobAction> {
        serde_json::from_value(serde_json::Value::String(self.action.clone()))
            .map_err(|_| Error::Validation(format!("Unsupported action: {}", self.action)))
    }
}

/// PATCH /api/jobs/{id} with `{"action": "retry"}`
pub async fn update_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    JsonBody(req): JsonBody<UpdateJobRequest>,
) -> Result<Response> {
    let job = match req.action()? {
        JobAction::Retry => state.job_service.retry_job(id).await?,
    };
    Ok(Json(job).into_response())
}

#[derive(Debug, Default, Deserialize)]
pub struct ListJobsQuery {
    #[serde(rename = "type")]
    pub job_type: Option<String>,
    pub status: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl ListJobsQuery {
    fn into_filter(self) -> Result<JobFilter> {
        let job_type = self
            .job_type
            .as_deref()
            .map(str::parse::<JobType>)
            .transpose()?;
        let status = self
            .status
            .as_deref()
            .map(str::parse::<JobStatus>)
            .transpose()
            .map_err(Error::Validation)?;

        Ok(JobFilter {
            job_type,
            status,
            limit: self.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE),
            offset: self.offset.unwrap_or(0),
        })
    }
}

/// GET /api/jobs
pub async fn list_jobs(
    State(state): State<AppState>,
    Query(query): Query<ListJobsQuery>,
) -> Result<Response> {
    let filter = query.into_filter()?;
    let (jobs, total) = state.job_service.list_jobs(&filter).await?;

    Ok(Json(json!({
        "jobs": jobs,
        "total": total,
        "limit": filter.limit,
        "offset": filter.offset,
    }))
    .into_response())
}

/// GET /api/jobs/stats
pub async fn job_stats(State(state): State<AppState>) -> Result<Response> {
    let stats = state.job_service.job_stats().await?;
    Ok((StatusCode::OK, Json(stats)).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_query_defaults_and_clamps_page_size() {
        let filter = ListJobsQuery::default().into_filter().unwrap();
        assert_eq!(filter.limit, DEFAULT_PAGE_SIZE);
        assert_eq!(filter.offset, 0);

        let filter = ListJobsQuery {
            limit: Some(10_000),
            ..Default::default()
        }
        .into_filter()
        .unwrap();
        assert_eq!(filter.limit, MAX_PAGE_SIZE);
    }

    #[test]
    fn list_query_parses_filters() {
        let filter = ListJobsQuery {
            job_type: Some("link-check".into()),
            status: Some("FAILED".into()),
            ..Default::default()
        }
        .into_filter()
        .unwrap();
        assert_eq!(filter.job_type, Some(JobType::LinkCheck));
        assert_eq!(filter.status, Some(JobStatus::Failed));

        assert!(ListJobsQuery {
            status: Some("sleeping".into()),
            ..Default::default()
        }
        .into_filter()
        .is_err());
    }

    #[test]
    fn enqueue_request_rejects_out_of_range_attempts() {
        let req: EnqueueJobRequest = serde_json::from_value(json!({
            "type": "link-check",
            "maxAttempts": 0
        }))
        .unwrap();
        assert!(req.validate().is_err());
    }

    #[test]
    fn update_request_accepts_only_known_actions() {
        let retry = UpdateJobRequest {
            action: "retry".into(),
        };
        assert_eq!(retry.action().unwrap(), JobAction::Retry);

        let cancel = UpdateJobRequest {
            action: "cancel".into(),
        };
        assert!(matches!(cancel.action(), Err(Error::Validation(_))));
    }
}
