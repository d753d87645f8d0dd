//! Search API Routes

use crate::api::handlers::search;
use crate::state::AppState;
use axum::{
    routing::{delete, get, post},
    Router,
};

pub fn search_routes() -> Router<AppState> {
    Router::new()
        .route("/search", get(search::search))
        .route("/search/documents", post(search::upsert_document))
        .route("/search/documents/:kind/:id", delete(search::remove_document))
}
