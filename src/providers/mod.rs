pub mod bucket;
pub mod concourse;

use async_trait::async_trait;

use crate::auth::Token;
use crate::error::Result;

pub use bucket::BucketVersionStore;
pub use concourse::{BuildSummary, ConcourseClient, FinishedBuild, JobSummary, PipelineSummary};

/// Read-only view of the CI server's REST API.
#[async_trait]
pub trait CiApi: Send + Sync {
    async fn list_pipelines(&self, token: Option<&Token>) -> Result<Vec<PipelineSummary>>;

    async fn list_jobs(
        &self,
        token: Option<&Token>,
        pipeline: &PipelineSummary,
    ) -> Result<Vec<JobSummary>>;

    /// Builds of a job, newest first.
    async fn list_builds(
        &self,
        token: Option<&Token>,
        pipeline: &PipelineSummary,
        job: &str,
    ) -> Result<Vec<BuildSummary>>;
}

/// Remote object store holding one version file per pipeline.
#[async_trait]
pub trait VersionStore: Send + Sync {
    /// Returns the raw object body, or `RadiatorError::NotFound`.
    async fn get_version(&self, pipeline: &str) -> Result<Vec<u8>>;
}
