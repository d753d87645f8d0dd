//! Job queue abstraction for background processing
//!
//! Provides a trait-based interface for job queues with an in-process
//! implementation. The worker loop claims from it; the HTTP layer enqueues
//! into it and reads statistics from it.

mod helpers;
mod memory;
mod models;
mod traits;

pub use helpers::*;
pub use memory::{InMemoryJobQueue, DEFAULT_MAX_ATTEMPTS};
pub use models::*;
pub use traits::JobQueue;
