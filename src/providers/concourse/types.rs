use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Entry of `GET /pipelines`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineSummary {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub paused: bool,
    #[serde(default)]
    pub team_name: String,
}

/// Entry of `GET /teams/{team}/pipelines/{pipeline}/jobs`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSummary {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub finished_build: Option<FinishedBuild>,
}

/// Snapshot of a job's last finished build, as embedded in the job listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinishedBuild {
    pub id: u64,
    /// Build number
    pub name: String,
    pub status: String,
    /// Unix seconds
    #[serde(default)]
    pub start_time: Option<i64>,
    /// Unix seconds
    #[serde(default)]
    pub end_time: Option<i64>,
}

impl FinishedBuild {
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.start_time.and_then(|secs| DateTime::from_timestamp(secs, 0))
    }

    pub fn ended_at(&self) -> Option<DateTime<Utc>> {
        self.end_time.and_then(|secs| DateTime::from_timestamp(secs, 0))
    }
}

/// Entry of `GET .../jobs/{job}/builds`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildSummary {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    pub status: String,
    #[serde(default)]
    pub start_time: Option<i64>,
    #[serde(default)]
    pub end_time: Option<i64>,
}
