//! Service layer between the HTTP handlers and the job queue

pub mod jobs;
pub mod search;

pub use jobs::JobService;
pub use search::{SearchHit, SearchService};
