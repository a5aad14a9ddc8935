//! In-memory stand-ins for the CI API and the version store.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::auth::Token;
use crate::error::{RadiatorError, Result};
use crate::providers::{
    BuildSummary, CiApi, FinishedBuild, JobSummary, PipelineSummary, VersionStore,
};

#[derive(Default)]
pub struct FakeCiState {
    pub pipelines: Vec<PipelineSummary>,
    pub jobs: HashMap<String, Vec<JobSummary>>,
    /// Keyed by (pipeline, job); missing entries answer 404
    pub builds: HashMap<(String, String), Vec<BuildSummary>>,
    pub fail_listing: bool,
    /// Held before `list_pipelines` answers
    pub listing_delay: Option<Duration>,
    /// Held before `list_builds` answers for (pipeline, job)
    pub build_delays: HashMap<(String, String), Duration>,
    pub failing_pipelines: HashSet<String>,
    pub calls: Vec<String>,
}

#[derive(Default)]
pub struct FakeCi {
    state: Mutex<FakeCiState>,
}

impl FakeCi {
    pub fn update(&self, f: impl FnOnce(&mut FakeCiState)) {
        f(&mut self.state.lock().unwrap());
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }
}

#[async_trait]
impl CiApi for FakeCi {
    async fn list_pipelines(&self, _token: Option<&Token>) -> Result<Vec<PipelineSummary>> {
        let delay = {
            let mut state = self.state.lock().unwrap();
            state.calls.push("pipelines".into());
            state.listing_delay
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let state = self.state.lock().unwrap();
        if state.fail_listing {
            return Err(RadiatorError::Api {
                status: 502,
                message: "bad gateway".into(),
            });
        }
        Ok(state.pipelines.clone())
    }

    async fn list_jobs(
        &self,
        _token: Option<&Token>,
        pipeline: &PipelineSummary,
    ) -> Result<Vec<JobSummary>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("jobs:{}", pipeline.name));
        if state.failing_pipelines.contains(&pipeline.name) {
            return Err(RadiatorError::Api {
                status: 500,
                message: "internal error".into(),
            });
        }
        Ok(state.jobs.get(&pipeline.name).cloned().unwrap_or_default())
    }

    async fn list_builds(
        &self,
        _token: Option<&Token>,
        pipeline: &PipelineSummary,
        job: &str,
    ) -> Result<Vec<BuildSummary>> {
        let key = (pipeline.name.clone(), job.to_owned());
        let delay = {
            let mut state = self.state.lock().unwrap();
            state.calls.push(format!("builds:{}/{job}", pipeline.name));
            state.build_delays.get(&key).copied()
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("answered:{}/{job}", pipeline.name));
        state
            .builds
            .get(&key)
            .cloned()
            .ok_or_else(|| RadiatorError::Api {
                status: 404,
                message: "no such job".into(),
            })
    }
}

pub fn summary(name: &str, paused: bool) -> PipelineSummary {
    PipelineSummary {
        id: 1,
        name: name.into(),
        paused,
        team_name: "main".into(),
    }
}

pub fn job(id: u64, name: &str, status: &str, start: i64, end: i64) -> JobSummary {
    JobSummary {
        id,
        name: name.into(),
        finished_build: Some(FinishedBuild {
            id: id * 100,
            name: "1".into(),
            status: status.into(),
            start_time: Some(start),
            end_time: Some(end),
        }),
    }
}

pub fn job_without_build(id: u64, name: &str) -> JobSummary {
    JobSummary {
        id,
        name: name.into(),
        finished_build: None,
    }
}

pub fn build(id: u64, status: &str) -> BuildSummary {
    BuildSummary {
        id,
        name: id.to_string(),
        status: status.into(),
        start_time: None,
        end_time: None,
    }
}

#[derive(Default)]
pub struct FakeVersionStore {
    versions: Mutex<HashMap<String, String>>,
    fetches: AtomicUsize,
}

impl FakeVersionStore {
    pub fn set(&self, pipeline: &str, version: &str) {
        self.versions
            .lock()
            .unwrap()
            .insert(pipeline.to_owned(), version.to_owned());
    }

    pub fn remove(&self, pipeline: &str) {
        self.versions.lock().unwrap().remove(pipeline);
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VersionStore for FakeVersionStore {
    async fn get_version(&self, pipeline: &str) -> Result<Vec<u8>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.versions
            .lock()
            .unwrap()
            .get(pipeline)
            .map(|version| version.clone().into_bytes())
            .ok_or_else(|| RadiatorError::NotFound(format!("{pipeline}/version.txt")))
    }
}
