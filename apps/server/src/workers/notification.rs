//! Notification handlers (notify-user and send-notification)

use super::base::{parse_payload, JobContext, JobHandler};
use crate::{queue::JobType, Error, Result};
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// A notification ready for delivery
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub user_id: String,
    pub channel: String,
    pub title: String,
    pub body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_id: Option<String>,
    #[serde(skip_serializing_if = "serde_json::Value::is_null")]
    pub data: serde_json::Value,
}

/// Delivery backend for notifications
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn deliver(&self, notification: &Notification) -> Result<()>;
}

/// Logs the notification after a fixed delay.
///
/// Stands in for the email/push provider, which lives outside this service.
#[derive(Debug, Clone)]
pub struct SimulatedNotifier {
    delay: Duration,
}

impl SimulatedNotifier {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl Notifier for SimulatedNotifier {
    async fn deliver(&self, notification: &Notification) -> Result<()> {
        tokio::time::sleep(self.delay).await;
        tracing::info!(
            user_id = %notification.user_id,
            channel = %notification.channel,
            template_id = ?notification.template_id,
            "Notification delivered"
        );
        Ok(())
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct NotificationResult {
    success: bool,
    message: String,
    sent_at: String,
}

fn require_non_empty(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::InvalidPayload(format!("{} must not be empty", field)));
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NotifyUserParams {
    user_id: String,
    template_id: String,
    #[serde(default)]
    data: serde_json::Value,
}

/// Sends a templated notification to a user
pub struct NotifyUserHandler {
    notifier: Arc<dyn Notifier>,
}

impl NotifyUserHandler {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self { notifier }
    }
}

#[async_trait]
impl JobHandler for NotifyUserHandler {
    fn name(&self) -> &str {
        "NotifyUserHandler"
    }

    fn job_type(&self) -> JobType {
        JobType::NotifyUser
    }

    async fn handle(
        &self,
        ctx: &JobContext,
        payload: serde_json::Value,
    ) -> Result<serde_json::Value> {
        let params: NotifyUserParams = parse_payload(payload)?;
        require_non_empty("userId", &params.user_id)?;
        require_non_empty("templateId", &params.template_id)?;

        ctx.report_progress(10, "Preparing notification...").await;
        let notification = Notification {
            user_id: params.user_id,
            channel: "in-app".to_string(),
            title: params.template_id.clone(),
            body: String::new(),
            template_id: Some(params.template_id.clone()),
            data: params.data,
        };

        ctx.report_progress(
            50,
            format!("Sending notification (template: {})...", params.template_id),
        )
        .await;
        self.notifier.deliver(&notification).await?;
        ctx.report_progress(100, "Notification sent").await;

        Ok(serde_json::to_value(NotificationResult {
            success: true,
            message: format!(
                "Notification sent successfully using template {}",
                params.template_id
            ),
            sent_at: Utc::now().to_rfc3339(),
        })?)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SendNotificationParams {
    user_id: String,
    title: String,
    message: String,
    #[serde(default = "default_channel")]
    channel: String,
}

fn default_channel() -> String {
    "in-app".to_string()
}

/// Delivers an ad-hoc notification composed by an admin
pub struct SendNotificationHandler {
    notifier: Arc<dyn Notifier>,
}

impl SendNotificationHandler {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self { notifier }
    }
}

#[async_trait]
impl JobHandler for SendNotificationHandler {
    fn name(&self) -> &str {
        "SendNotificationHandler"
    }

    fn job_type(&self) -> JobType {
        JobType::SendNotification
    }

    async fn handle(
        &self,
        ctx: &JobContext,
        payload: serde_json::Value,
    ) -> Result<serde_json::Value> {
        let params: SendNotificationParams = parse_payload(payload)?;
        require_non_empty("userId", &params.user_id)?;
        require_non_empty("title", &params.title)?;

        ctx.report_progress(
            50,
            format!("Sending notification via {}...", params.channel),
        )
        .await;
        let notification = Notification {
            user_id: params.user_id,
            channel: params.channel,
            title: params.title,
            body: params.message,
            template_id: None,
            data: serde_json::Value::Null,
        };
        self.notifier.deliver(&notification).await?;
        ctx.report_progress(100, "Notification sent").await;

        Ok(serde_json::to_value(NotificationResult {
            success: true,
            message: format!("Notification delivered to {}", notification.user_id),
            sent_at: Utc::now().to_rfc3339(),
        })?)
    }
}
