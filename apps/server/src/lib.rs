//! Petnet job runner
//!
//! An in-process job queue for the pet social network backend:
//! - Typed jobs with priority, bounded retries and status tracking
//! - A periodic worker loop dispatching jobs to registered handlers
//! - Built-in handlers for link checks, notifications, search indexing
//!   and video transcoding
//! - A small HTTP API for enqueueing and inspecting jobs

pub mod api;
pub mod background;
pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod queue;
pub mod services;
pub mod state;
pub mod workers;

pub use config::Config;
pub use error::{Error, Result};
pub use state::AppState;
