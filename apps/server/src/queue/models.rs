//! Job queue domain models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub const ALL: [JobStatus; 4] = [
        JobStatus::Pending,
        JobStatus::Processing,
        JobStatus::Completed,
        JobStatus::Failed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_lowercase().as_str() {
            "pending" => Ok(JobStatus::Pending),
            "processing" => Ok(JobStatus::Processing),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            _ => Err(format!("Invalid job status: {}", value)),
        }
    }
}

/// Job types the application enqueues
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JobType {
    /// Check that a user-submitted link is reachable
    LinkCheck,
    /// Send a templated notification to a user
    NotifyUser,
    /// Rebuild the article and blog post search index
    RebuildSearchIndex,
    /// Deliver an ad-hoc notification
    SendNotification,
    /// Transcode an uploaded video to a preset
    TranscodeVideo,
}

impl JobType {
    pub const ALL: [JobType; 5] = [
        JobType::LinkCheck,
        JobType::NotifyUser,
        JobType::RebuildSearchIndex,
        JobType::SendNotification,
        JobType::TranscodeVideo,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobType::LinkCheck => "link-check",
            JobType::NotifyUser => "notify-user",
            JobType::RebuildSearchIndex => "rebuild-search-index",
            JobType::SendNotification => "send-notification",
            JobType::TranscodeVideo => "transcode-video",
        }
    }
}

impl fmt::Display for JobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobType {
    type Err = crate::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        JobType::ALL
            .into_iter()
            .find(|t| t.as_str() == value)
            .ok_or_else(|| crate::Error::UnknownJobType(value.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::ZERO,
            max_delay: Duration::from_secs(60),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Delay before a job that has failed `attempts` times may be claimed again
    pub fn calculate_delay(&self, attempts: u32) -> Duration {
        if self.initial_delay.is_zero() {
            return Duration::ZERO;
        }
        let exponent = attempts.saturating_sub(1).min(i32::MAX as u32) as i32;
        let delay = self.initial_delay.as_secs_f64() * self.backoff_multiplier.powi(exponent);
        Duration::from_secs_f64(delay.min(self.max_delay.as_secs_f64()))
    }
}

/// Options accepted by enqueue
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnqueueOptions {
    pub priority: Option<i32>,
    pub max_attempts: Option<u32>,
}

impl EnqueueOptions {
    pub fn with_priority(mut self, priority: impl Into<i32>) -> Self {
        self.priority = Some(priority.into());
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub job_type: JobType,
    pub status: JobStatus,
    pub priority: i32,
    pub payload: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress_message: Option<String>,
    pub attempts: u32,
    pub max_attempts: u32,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    /// Insertion order, breaks ties between jobs created in the same instant
    #[serde(skip)]
    pub(crate) sequence: u64,
}

impl Job {
    pub(crate) fn new(
        job_type: JobType,
        payload: serde_json::Value,
        priority: i32,
        max_attempts: u32,
        sequence: u64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            job_type,
            status: JobStatus::Pending,
            priority,
            payload,
            result: None,
            error: None,
            last_error: None,
            progress: None,
            progress_message: None,
            attempts: 0,
            max_attempts,
            created_at: Utc::now(),
            available_at: None,
            started_at: None,
            completed_at: None,
            sequence,
        }
    }

    pub fn can_retry(&self) -> bool {
        self.attempts < self.max_attempts
    }

    pub fn is_claimable(&self, now: DateTime<Utc>) -> bool {
        self.status == JobStatus::Pending && self.available_at.map_or(true, |at| at <= now)
    }

    /// Wall-clock processing time of a completed job
    pub fn processing_time(&self) -> Option<chrono::Duration> {
        match (self.started_at, self.completed_at) {
            (Some(started), Some(completed)) => Some(completed - started),
            _ => None,
        }
    }
}

/// Filter for listing jobs
#[derive(Debug, Clone, Default)]
pub struct JobFilter {
    pub job_type: Option<JobType>,
    pub status: Option<JobStatus>,
    pub limit: usize,
    pub offset: usize,
}

/// Per-status counts for one job type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeCounts {
    pub total: u64,
    pub pending: u64,
    pub processing: u64,
    pub completed: u64,
    pub failed: u64,
}

impl TypeCounts {
    pub(crate) fn record(&mut self, status: JobStatus) {
        self.total += 1;
        match status {
            JobStatus::Pending => self.pending += 1,
            JobStatus::Processing => self.processing += 1,
            JobStatus::Completed => self.completed += 1,
            JobStatus::Failed => self.failed += 1,
        }
    }
}

/// Aggregated queue statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStats {
    pub pending: u64,
    pub processing: u64,
    pub completed: u64,
    pub failed: u64,
    pub backlog: u64,
    pub avg_processing_time_ms: f64,
    /// Only types with at least one job appear
    pub by_type: BTreeMap<JobType, TypeCounts>,
}

impl JobStats {
    pub fn total(&self) -> u64 {
        self.pending + self.processing + self.completed + self.failed
    }

    pub fn count(&self, status: JobStatus) -> u64 {
        match status {
            JobStatus::Pending => self.pending,
            JobStatus::Processing => self.processing,
            JobStatus::Completed => self.completed,
            JobStatus::Failed => self.failed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn job_type_round_trips_through_its_wire_name() {
        for job_type in JobType::ALL {
            assert_eq!(job_type.as_str().parse::<JobType>().unwrap(), job_type);
            assert_eq!(
                serde_json::to_value(job_type).unwrap(),
                json!(job_type.as_str())
            );
        }
    }

    #[test]
    fn unknown_job_type_is_a_configuration_error() {
        let err = "bogus".parse::<JobType>().unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn retry_delay_grows_and_is_capped() {
        let policy = RetryPolicy {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(5),
            backoff_multiplier: 2.0,
        };
        assert_eq!(policy.calculate_delay(1), Duration::from_secs(1));
        assert_eq!(policy.calculate_delay(2), Duration::from_secs(2));
        assert_eq!(policy.calculate_delay(3), Duration::from_secs(4));
        assert_eq!(policy.calculate_delay(4), Duration::from_secs(5));
    }

    #[test]
    fn default_retry_policy_requeues_immediately() {
        assert_eq!(RetryPolicy::default().calculate_delay(3), Duration::ZERO);
    }

    #[test]
    fn stats_serialize_type_breakdown_by_wire_name() {
        let mut stats = JobStats::default();
        stats
            .by_type
            .entry(JobType::LinkCheck)
            .or_default()
            .record(JobStatus::Failed);

        let value = serde_json::to_value(&stats).unwrap();
        assert_eq!(
            value["byType"]["link-check"],
            json!({"total": 1, "pending": 0, "processing": 0, "completed": 0, "failed": 1})
        );
        assert_eq!(value["avgProcessingTimeMs"], 0.0);
    }

    #[test]
    fn job_serializes_with_camel_case_projection() {
        let job = Job::new(JobType::LinkCheck, json!({"url": "https://a.b"}), 5, 3, 0);
        let value = serde_json::to_value(&job).unwrap();
        assert_eq!(value["type"], "link-check");
        assert_eq!(value["status"], "pending");
        assert_eq!(value["maxAttempts"], 3);
        assert!(value.get("result").is_none());
        assert!(value.get("sequence").is_none());
    }
}
