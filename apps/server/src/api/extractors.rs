//! Custom Axum extractors.

use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequest, Request},
};
use serde::de::DeserializeOwned;

use crate::Error;

/// JSON request body whose failures render as the API's JSON error body.
///
/// Unlike `axum::Json` the Content-Type header is not checked; a missing or
/// malformed body becomes `Error::Validation` (400 `validation_error`).
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for JsonBody<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = Error;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|e| Error::Validation(format!("Failed to read request body: {}", e)))?;

        if bytes.is_empty() {
            return Err(Error::Validation("Request body is required".to_string()));
        }

        let value = serde_json::from_slice(&bytes)
            .map_err(|e| Error::Validation(format!("Invalid JSON in request body: {}", e)))?;

        Ok(JsonBody(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Named {
        name: String,
    }

    async fn extract(body: &'static str) -> Result<Named, Error> {
        let req = Request::builder()
            .method("POST")
            .uri("/")
            .body(Body::from(body))
            .unwrap();
        JsonBody::<Named>::from_request(req, &()).await.map(|b| b.0)
    }

    #[tokio::test]
    async fn parses_body_without_content_type() {
        assert_eq!(extract(r#"{"name":"rex"}"#).await.unwrap().name, "rex");
    }

    #[tokio::test]
    async fn malformed_and_missing_bodies_are_validation_errors() {
        for body in ["", "{", r#"{"nom":"rex"}"#] {
            assert!(matches!(extract(body).await, Err(Error::Validation(_))), "{body:?}");
        }
    }
}
