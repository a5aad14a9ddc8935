mod client;
mod types;

pub use client::{ConcourseClient, DEFAULT_MAX_CONCURRENT_REQUESTS};
pub use types::{BuildSummary, FinishedBuild, JobSummary, PipelineSummary};
