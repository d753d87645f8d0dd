//! Request handlers for API endpoints
//!
//! Handlers extract and validate the request, call a service and
//! shape the response. Errors convert into JSON responses via `Error`.

pub mod jobs;
pub mod metrics;
pub mod search;

pub use jobs::*;
pub use metrics::*;
