//! Job API Routes

use crate::api::handlers::jobs;
use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};

pub fn job_routes() -> Router<AppState> {
    Router::new()
        .route("/jobs", post(jobs::enqueue_job).get(jobs::list_jobs))
        .route("/jobs/stats", get(jobs::job_stats))
        .route("/jobs/:id", get(jobs::get_job).patch(jobs::update_job))
}
