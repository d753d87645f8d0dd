//! Route tables, grouped by area

pub mod jobs;
pub mod metrics;
pub mod search;
