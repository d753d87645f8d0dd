//! Background worker management
//!
//! The worker loop runs inside the server process and shares its queue.

use crate::state::AppState;

/// Start the worker loop unless disabled in configuration
pub async fn start_workers(state: &AppState) -> bool {
    if !state.config.workers.enabled {
        tracing::info!("Background workers disabled by configuration");
        return false;
    }

    tracing::info!(
        poll_interval_ms = state.config.workers.poll_interval_ms,
        batch_size = state.config.workers.batch_size,
        wake_on_enqueue = state.config.workers.wake_on_enqueue,
        "Starting background worker loop..."
    );
    state.worker.start().await
}

/// Stop the worker loop, waiting for the current tick to finish
pub async fn stop_workers(state: &AppState) {
    if state.worker.stop().await {
        let stats = state.job_service.job_stats_or_default().await;
        tracing::info!(
            pending = stats.pending,
            processing = stats.processing,
            completed = stats.completed,
            failed = stats.failed,
            "Background worker loop stopped"
        );
    }
}
