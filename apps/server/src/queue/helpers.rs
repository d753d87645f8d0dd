//! Helper functions for job queue operations

use super::models::{Job, JobFilter, JobStats, JobStatus};
use std::cmp::Ordering;

/// Claim order: higher priority first, then older, then earlier insertion
pub fn claim_order(a: &Job, b: &Job) -> Ordering {
    b.priority
        .cmp(&a.priority)
        .then_with(|| a.created_at.cmp(&b.created_at))
        .then_with(|| a.sequence.cmp(&b.sequence))
}

/// Whether a job passes the type/status filter
pub fn matches_filter(job: &Job, filter: &JobFilter) -> bool {
    filter.job_type.map_or(true, |t| job.job_type == t)
        && filter.status.map_or(true, |s| job.status == s)
}

/// Apply a filter and pagination to a set of jobs, newest first
pub fn paginate<'a>(
    jobs: impl Iterator<Item = &'a Job>,
    filter: &JobFilter,
) -> (Vec<Job>, usize) {
    let mut matching: Vec<&Job> = jobs.filter(|job| matches_filter(job, filter)).collect();
    matching.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| b.sequence.cmp(&a.sequence))
    });

    let total = matching.len();
    let page = matching
        .into_iter()
        .skip(filter.offset)
        .take(filter.limit)
        .cloned()
        .collect();

    (page, total)
}

/// Aggregate per-status and per-type counts and mean processing time of
/// completed jobs
pub fn aggregate_stats<'a>(jobs: impl Iterator<Item = &'a Job>) -> JobStats {
    let mut stats = JobStats::default();
    let mut total_ms = 0f64;

    for job in jobs {
        stats.by_type.entry(job.job_type).or_default().record(job.status);
        match job.status {
            JobStatus::Pending => stats.pending += 1,
            JobStatus::Processing => stats.processing += 1,
            JobStatus::Completed => {
                stats.completed += 1;
                if let Some(elapsed) = job.processing_time() {
                    total_ms += elapsed.num_milliseconds().max(0) as f64;
                }
            }
            JobStatus::Failed => stats.failed += 1,
        }
    }

    stats.backlog = stats.pending + stats.processing;
    if stats.completed > 0 {
        stats.avg_processing_time_ms = total_ms / stats.completed as f64;
    }

    stats
}
