//! Link check handler
//!
//! Validates a user-submitted URL and checks it with a `HEAD` request. An
//! unreachable or broken link is a normal result (`isValid: false`), not a
//! handler error, so it is never retried.

use super::base::{parse_payload, JobContext, JobHandler};
use crate::{config::HandlerConfig, queue::JobType, Error, Result};
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct LinkCheckParams {
    url: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkCheckResult {
    pub url: String,
    pub is_valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub checked_at: String,
}

impl LinkCheckResult {
    fn invalid(url: String, error: impl Into<String>) -> Self {
        Self {
            url,
            is_valid: false,
            status_code: None,
            error: Some(error.into()),
            checked_at: Utc::now().to_rfc3339(),
        }
    }
}

pub struct LinkCheckHandler {
    client: reqwest::Client,
}

impl LinkCheckHandler {
    pub fn new(config: &HandlerConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.link_check_timeout_seconds))
            .user_agent(config.link_check_user_agent.clone())
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|e| Error::Internal(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self::with_client(client))
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn check(&self, ctx: &JobContext, url: String) -> LinkCheckResult {
        ctx.report_progress(10, "Validating URL format...").await;

        let parsed = match url::Url::parse(&url) {
            Ok(parsed) => parsed,
            Err(e) => return LinkCheckResult::invalid(url, format!("Invalid URL format: {}", e)),
        };
        if !matches!(parsed.scheme(), "http" | "https") {
            return LinkCheckResult::invalid(
                url,
                "Invalid protocol. Only http and https are allowed.",
            );
        }

        ctx.report_progress(50, "Checking URL accessibility...").await;

        match self.client.head(parsed).send().await {
            Ok(response) => {
                let status = response.status().as_u16();
                let is_valid = (200..400).contains(&status);
                LinkCheckResult {
                    url,
                    is_valid,
                    status_code: Some(status),
                    error: (!is_valid).then(|| format!("HTTP {}", status)),
                    checked_at: Utc::now().to_rfc3339(),
                }
            }
            Err(e) if e.is_timeout() => LinkCheckResult::invalid(url, "Request timeout"),
            Err(e) => LinkCheckResult::invalid(url, e.to_string()),
        }
    }
}

#[async_trait]
impl JobHandler for LinkCheckHandler {
    fn name(&self) -> &str {
        "LinkCheckHandler"
    }

    fn job_type(&self) -> JobType {
        JobType::LinkCheck
    }

    async fn handle(
        &self,
        ctx: &JobContext,
        payload: serde_json::Value,
    ) -> Result<serde_json::Value> {
        let params: LinkCheckParams = parse_payload(payload)?;

        let result = self.check(ctx, params.url).await;
        tracing::info!(
            url = %result.url,
            is_valid = result.is_valid,
            status_code = ?result.status_code,
            "Link checked"
        );

        ctx.report_progress(
            100,
            if result.is_valid {
                "Link is valid"
            } else {
                "Link check completed"
            },
        )
        .await;

        Ok(serde_json::to_value(result)?)
    }
}
