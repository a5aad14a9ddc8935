mod build_status;
mod ordering;
mod recency;

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Instant;

use futures::future::join_all;
use log::{info, warn};

use crate::auth::Token;
use crate::error::Result;
use crate::pipeline::{Pipeline, PipelineStatus};
use crate::providers::{CiApi, PipelineSummary};

use build_status::fetch_pipeline_builds;
use ordering::order_pipelines;
use recency::RecencyCache;

/// Builds the per-poll pipeline snapshot and keeps the last good one.
///
/// `refresh` must not run concurrently with itself on the same instance; the
/// caller serializes polls. Readers can take `snapshot()` at any time and
/// always get a complete list.
pub struct PipelineAggregator {
    api: Arc<dyn CiApi>,
    max_allowed_pipelines: usize,
    recency: Mutex<RecencyCache>,
    snapshot: RwLock<Arc<Vec<Pipeline>>>,
}

impl PipelineAggregator {
    pub fn new(api: Arc<dyn CiApi>, max_allowed_pipelines: usize) -> Self {
        Self {
            api,
            max_allowed_pipelines,
            recency: Mutex::new(RecencyCache::new()),
            snapshot: RwLock::new(Arc::new(Vec::new())),
        }
    }

    /// The last published snapshot.
    pub fn snapshot(&self) -> Arc<Vec<Pipeline>> {
        self.snapshot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Swaps in a new snapshot in one step.
    pub fn replace_snapshot(&self, pipelines: Vec<Pipeline>) {
        *self
            .snapshot
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Arc::new(pipelines);
    }

    /// Runs one poll: list pipelines, fan out to jobs and builds, detect
    /// recent finishes, then order.
    ///
    /// # Errors
    ///
    /// Fails only when the pipeline listing fails; the previous snapshot is
    /// left in place. Failures of individual pipelines are logged and that
    /// pipeline keeps whatever it gathered.
    pub async fn refresh(&self, token: Option<&Token>) -> Result<Vec<Pipeline>> {
        let started = Instant::now();
        info!("Start updating all pipelines...");

        let summaries = self.api.list_pipelines(token).await.inspect_err(|e| {
            warn!("Could not get pipelines: {e}");
        })?;

        let previous = self.snapshot();
        let previous_by_name: HashMap<&str, &Pipeline> = previous
            .iter()
            .map(|pipeline| (pipeline.name.as_str(), pipeline))
            .collect();

        let mut pipelines = join_all(
            summaries
                .iter()
                .map(|summary| self.build_pipeline(token, summary, &previous_by_name)),
        )
        .await;

        self.recency
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .detect(&mut pipelines);

        order_pipelines(&mut pipelines, self.max_allowed_pipelines);

        self.replace_snapshot(pipelines.clone());

        info!(
            "Refreshed {} pipelines in {:.2}s",
            pipelines.len(),
            started.elapsed().as_secs_f64()
        );

        Ok(pipelines)
    }

    async fn build_pipeline(
        &self,
        token: Option<&Token>,
        summary: &PipelineSummary,
        previous: &HashMap<&str, &Pipeline>,
    ) -> Pipeline {
        let mut pipeline = Pipeline::new(&summary.name, &summary.team_name, summary.paused);
        let last = previous.get(summary.name.as_str());

        // Version annotations survive until the freshness cache rewrites them.
        if let Some(last) = last {
            pipeline.build_version.clone_from(&last.build_version);
            pipeline.new_version = last.new_version;
        }

        if summary.paused {
            // Paused pipelines stay frozen at what was last seen.
            if let Some(last) = last {
                pipeline.build_steps.clone_from(&last.build_steps);
                pipeline.start_time = last.start_time;
                pipeline.end_time = last.end_time;
            }
            return pipeline;
        }

        match fetch_pipeline_builds(self.api.as_ref(), token, summary).await {
            Ok(builds) => {
                pipeline.status = builds.status.unwrap_or(PipelineStatus::Unknown);
                pipeline.start_time = builds.start_time;
                pipeline.end_time = builds.end_time;
                pipeline.build_steps = builds.steps;
            }
            Err(e) => warn!("Failed to fetch jobs of {}: {e}", summary.name),
        }

        pipeline
    }
}
