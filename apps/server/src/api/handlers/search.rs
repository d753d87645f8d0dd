//! Search endpoints: document writes and index queries

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use validator::Validate;

use crate::{
    api::extractors::JsonBody,
    state::AppState,
    workers::{Document, DocumentKind},
    Error, Result,
};

#[derive(Debug, Deserialize, Validate)]
pub struct UpsertDocumentRequest {
    #[validate(length(min = 1, max = 200, message = "id must be 1-200 characters"))]
    pub id: String,
    pub kind: DocumentKind,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// POST /api/search/documents
///
/// 201 when the document is new, 200 when it replaced an existing one.
pub async fn upsert_document(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<UpsertDocumentRequest>,
) -> Result<Response> {
    req.validate()
        .map_err(|e| Error::Validation(e.to_string()))?;

    let document = Document {
        id: req.id,
        kind: req.kind,
        title: req.title,
        body: req.body,
        tags: req.tags,
    };
    let created = state
        .search_service
        .upsert_document(document.clone())
        .await?;

    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(document)).into_response())
}

/// DELETE /api/search/documents/{kind}/{id}
pub async fn remove_document(
    State(state): State<AppState>,
    Path((kind, id)): Path<(String, String)>,
) -> Result<Response> {
    let kind: DocumentKind = kind.parse()?;
    state.search_service.remove_document(kind, &id).await?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    pub kind: Option<String>,
    #[serde(default)]
    pub q: String,
}

/// GET /api/search?q=...&kind=article
pub async fn search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Response> {
    let kind = query
        .kind
        .as_deref()
        .map(str::parse::<DocumentKind>)
        .transpose()?;
    let hits = state.search_service.search(kind, &query.q).await;

    Ok(Json(json!({
        "query": query.q,
        "total": hits.len(),
        "hits": hits,
    }))
    .into_response())
}
