use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use tokio::sync::Mutex;

use crate::aggregator::PipelineAggregator;
use crate::auth::Authenticator;
use crate::config::Config;
use crate::error::Result;
use crate::pipeline::Pipeline;
use crate::providers::{BucketVersionStore, ConcourseClient};
use crate::versions::VersionFreshnessCache;

/// What the renderer gets after a poll.
#[derive(Debug, Clone)]
pub struct DashboardView {
    pub pipelines: Arc<Vec<Pipeline>>,
    /// Set when this poll failed; `pipelines` is then the last good snapshot.
    pub error: Option<String>,
    pub refreshed: bool,
}

#[derive(Default)]
struct PollState {
    last_update: Option<Instant>,
}

/// Decides when to refresh and serialises polls.
///
/// Holds the aggregator and freshness cache for the lifetime of the process.
pub struct Dashboard {
    authenticator: Authenticator,
    aggregator: PipelineAggregator,
    versions: Mutex<VersionFreshnessCache>,
    refresh_interval: Duration,
    poll_state: Mutex<PollState>,
}

impl Dashboard {
    pub fn new(
        authenticator: Authenticator,
        aggregator: PipelineAggregator,
        versions: VersionFreshnessCache,
        refresh_interval: Duration,
    ) -> Self {
        Self {
            authenticator,
            aggregator,
            versions: Mutex::new(versions),
            refresh_interval,
            poll_state: Mutex::new(PollState::default()),
        }
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let concourse = &config.concourse;
        let api_url = concourse.api_url()?;

        let authenticator = Authenticator::new(
            &api_url,
            &concourse.team,
            concourse.username.clone().unwrap_or_default(),
            concourse.password.clone().unwrap_or_default(),
            concourse.use_bearer_token,
            concourse.request_timeout(),
        )?;

        let client = ConcourseClient::new(
            api_url,
            concourse.team.clone(),
            concourse.request_timeout(),
            concourse.max_concurrent_requests,
        )?;
        let aggregator =
            PipelineAggregator::new(Arc::new(client), config.dashboard.max_allowed_pipelines);

        let store = BucketVersionStore::new(
            config.versions.endpoint_url()?,
            config.versions.bucket.clone(),
            config.versions.request_timeout(),
        )?;
        let versions = VersionFreshnessCache::new(
            Arc::new(store),
            config.versions.enabled,
            config.versions.notify_window(),
        );

        Ok(Self::new(
            authenticator,
            aggregator,
            versions,
            config.dashboard.refresh_interval(),
        ))
    }

    pub fn refresh_interval(&self) -> Duration {
        self.refresh_interval
    }

    /// Refreshes if the throttle window has passed and no other poll is
    /// running; otherwise serves the current snapshot.
    pub async fn poll(&self) -> DashboardView {
        let Ok(mut state) = self.poll_state.try_lock() else {
            debug!("Poll already in progress, serving current snapshot");
            return self.cached_view();
        };

        if let Some(last_update) = state.last_update {
            if last_update.elapsed() < self.refresh_interval {
                info!("Skipping data refresh...");
                return self.cached_view();
            }
        }

        let started = Instant::now();
        match self.refresh_and_annotate().await {
            Ok(()) => {
                state.last_update = Some(Instant::now());
                info!(
                    "Poll completed in {:.2} seconds",
                    started.elapsed().as_secs_f64()
                );
                DashboardView {
                    pipelines: self.aggregator.snapshot(),
                    error: None,
                    refreshed: true,
                }
            }
            Err(e) => {
                warn!("Poll failed, serving last snapshot: {e}");
                DashboardView {
                    pipelines: self.aggregator.snapshot(),
                    error: Some(e.to_string()),
                    refreshed: false,
                }
            }
        }
    }

    async fn refresh_and_annotate(&self) -> Result<()> {
        let token = self.authenticator.token().await?;
        let mut pipelines = self.aggregator.refresh(token.as_ref()).await?;
        self.versions.lock().await.annotate(&mut pipelines).await;
        self.aggregator.replace_snapshot(pipelines);
        Ok(())
    }

    fn cached_view(&self) -> DashboardView {
        DashboardView {
            pipelines: self.aggregator.snapshot(),
            error: None,
            refreshed: false,
        }
    }
}
