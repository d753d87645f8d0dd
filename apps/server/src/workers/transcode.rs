//! Video transcode handler
//!
//! The transcoder itself is external. The handler waits out the simulated
//! encode and reports the output location; presets are passed through as-is.

use super::base::{parse_payload, JobContext, JobHandler};
use crate::{queue::JobType, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TranscodeParams {
    file_url: String,
    preset: String,
    user_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TranscodeResult {
    success: bool,
    preset: String,
    output_url: String,
    duration_ms: u64,
}

pub struct TranscodeVideoHandler {
    delay: Duration,
}

impl TranscodeVideoHandler {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl JobHandler for TranscodeVideoHandler {
    fn name(&self) -> &str {
        "TranscodeVideoHandler"
    }

    fn job_type(&self) -> JobType {
        JobType::TranscodeVideo
    }

    async fn handle(
        &self,
        ctx: &JobContext,
        payload: serde_json::Value,
    ) -> Result<serde_json::Value> {
        let start = Instant::now();
        let params: TranscodeParams = parse_payload(payload)?;

        ctx.report_progress(10, format!("Queuing transcode ({})...", params.preset))
            .await;
        tokio::time::sleep(self.delay).await;

        tracing::info!(
            user_id = %params.user_id,
            preset = %params.preset,
            "Video transcoded"
        );
        ctx.report_progress(100, "Transcode complete").await;

        Ok(serde_json::to_value(TranscodeResult {
            success: true,
            preset: params.preset,
            output_url: params.file_url,
            duration_ms: start.elapsed().as_millis() as u64,
        })?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workers::test_support::claimed_context;
    use serde_json::json;

    #[tokio::test]
    async fn transcode_reports_output() {
        let handler = TranscodeVideoHandler::new(Duration::ZERO);
        let payload = json!({
            "fileUrl": "https://cdn.example.com/u1/clip.mov",
            "preset": "720p",
            "userId": "u1"
        });
        let (ctx, _queue) = claimed_context(JobType::TranscodeVideo, payload.clone()).await;

        let result = handler.handle(&ctx, payload).await.unwrap();
        assert_eq!(result["success"], true);
        assert_eq!(result["preset"], "720p");
        assert_eq!(result["outputUrl"], "https://cdn.example.com/u1/clip.mov");
    }

    #[tokio::test]
    async fn any_preset_is_passed_through() {
        let handler = TranscodeVideoHandler::new(Duration::ZERO);
        let payload = json!({
            "fileUrl": "https://cdn.example.com/u1/clip.mov",
            "preset": "8k-hdr",
            "userId": "u1"
        });
        let (ctx, _queue) = claimed_context(JobType::TranscodeVideo, payload.clone()).await;

        let result = handler.handle(&ctx, payload).await.unwrap();
        assert_eq!(result["preset"], "8k-hdr");
    }

    #[tokio::test]
    async fn payload_without_file_url_is_invalid() {
        let handler = TranscodeVideoHandler::new(Duration::ZERO);
        let payload = json!({ "preset": "720p", "userId": "u1" });
        let (ctx, _queue) = claimed_context(JobType::TranscodeVideo, payload.clone()).await;

        let err = handler.handle(&ctx, payload).await.unwrap_err();
        assert!(matches!(err, crate::Error::InvalidPayload(_)));
    }
}
