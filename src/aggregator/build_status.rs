use std::collections::HashMap;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use log::{debug, info, warn};

use crate::auth::Token;
use crate::error::Result;
use crate::pipeline::{BuildStep, PipelineStatus};
use crate::providers::{CiApi, FinishedBuild, JobSummary, PipelineSummary};

/// Build steps discovered for one pipeline during a poll.
#[derive(Debug, Default)]
pub struct PipelineBuilds {
    /// In discovery order
    pub steps: Vec<BuildStep>,
    pub status: Option<PipelineStatus>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}

impl PipelineBuilds {
    fn record(&mut self, step: BuildStep, listed_status: &str) {
        if let Some(start) = step.start_time {
            if self.start_time.map_or(true, |current| start < current) {
                self.start_time = Some(start);
            }
        }
        if let Some(end) = step.end_time {
            if self.end_time.map_or(true, |current| end > current) {
                self.end_time = Some(end);
            }
        }

        self.status = merge_status(
            self.status,
            PipelineStatus::from_build_status(listed_status),
        );
        self.steps.push(step);
    }
}

/// Folds one step's status into the pipeline status.
///
/// A provisional `Succeeded` gives way to any later observation; anything else
/// stays pinned. Which failing job wins therefore depends on the order the API
/// lists jobs in.
pub fn merge_status(
    current: Option<PipelineStatus>,
    observed: PipelineStatus,
) -> Option<PipelineStatus> {
    match current {
        None | Some(PipelineStatus::Succeeded) => Some(observed),
        pinned => pinned,
    }
}

fn build_step(job: &JobSummary, build: &FinishedBuild) -> BuildStep {
    BuildStep {
        id: job.id,
        name: job.name.clone(),
        build_id: build.id,
        build_name: build.name.clone(),
        status: build.status.clone(),
        start_time: build.started_at(),
        end_time: build.ended_at(),
    }
}

/// Lists a pipeline's jobs and resolves the current status of each job's
/// latest build.
///
/// Fails only when the job listing itself fails. A failed build lookup keeps
/// the status captured from the job listing.
pub async fn fetch_pipeline_builds(
    api: &dyn CiApi,
    token: Option<&Token>,
    pipeline: &PipelineSummary,
) -> Result<PipelineBuilds> {
    let jobs = api.list_jobs(token, pipeline).await?;
    debug!("Received {} jobs for {}", jobs.len(), pipeline.name);

    let mut builds = PipelineBuilds::default();
    for job in &jobs {
        match &job.finished_build {
            Some(finished) => builds.record(build_step(job, finished), &finished.status),
            None => info!(
                "Job {} of pipeline {} is not reporting any finished builds",
                job.name, pipeline.name
            ),
        }
    }

    let lookups: Vec<(u64, String)> = builds
        .steps
        .iter()
        .map(|step| (step.id, step.name.clone()))
        .collect();

    let latest = join_all(lookups.into_iter().map(|(job_id, job_name)| async move {
        let status = latest_build_status(api, token, pipeline, &job_name).await;
        (job_id, status)
    }))
    .await;

    let mut latest: HashMap<u64, String> = latest
        .into_iter()
        .filter_map(|(job_id, status)| status.map(|status| (job_id, status)))
        .collect();

    for step in &mut builds.steps {
        if let Some(status) = latest.remove(&step.id) {
            step.status = status;
        }
    }

    Ok(builds)
}

async fn latest_build_status(
    api: &dyn CiApi,
    token: Option<&Token>,
    pipeline: &PipelineSummary,
    job: &str,
) -> Option<String> {
    match api.list_builds(token, pipeline, job).await {
        Ok(builds) => builds.into_iter().next().map(|build| build.status),
        Err(e) => {
            warn!(
                "Could not refresh status of {job} in {}: {e}",
                pipeline.name
            );
            None
        }
    }
}
