use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Overall health of a pipeline as shown on the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PipelineStatus {
    Succeeded,
    Failed,
    Errored,
    Aborted,
    Paused,
    #[default]
    Unknown,
}

impl PipelineStatus {
    /// Parses a build status string reported by the CI API.
    ///
    /// Anything that is not a terminal build outcome (e.g. `started`, `pending`)
    /// maps to `Unknown`.
    pub fn from_build_status(status: &str) -> Self {
        match status {
            "succeeded" => Self::Succeeded,
            "failed" => Self::Failed,
            "errored" => Self::Errored,
            "aborted" => Self::Aborted,
            "paused" => Self::Paused,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Errored => "errored",
            Self::Aborted => "aborted",
            Self::Paused => "paused",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for PipelineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a pipeline makes it onto the rendered dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Display {
    Show,
    #[default]
    Hide,
}

/// One CI pipeline as of the latest poll.
///
/// `name` is the join key for the recency and version caches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pipeline {
    pub name: String,
    pub team: String,
    pub paused: bool,
    pub status: PipelineStatus,
    /// Earliest start across this poll's build steps
    pub start_time: Option<DateTime<Utc>>,
    /// Latest end across this poll's build steps
    pub end_time: Option<DateTime<Utc>>,
    pub build_steps: Vec<BuildStep>,
    pub display: Display,
    pub finished_recently: bool,
    pub build_version: String,
    pub new_version: bool,
}

impl Pipeline {
    pub fn new(name: impl Into<String>, team: impl Into<String>, paused: bool) -> Self {
        Self {
            name: name.into(),
            team: team.into(),
            paused,
            status: if paused {
                PipelineStatus::Paused
            } else {
                PipelineStatus::Unknown
            },
            start_time: None,
            end_time: None,
            build_steps: Vec::new(),
            display: Display::Hide,
            finished_recently: false,
            build_version: String::new(),
            new_version: false,
        }
    }

    pub fn is_shown(&self) -> bool {
        self.display == Display::Show
    }
}

/// A job's most recent finished build, scoped to its pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildStep {
    /// Job id, stable across polls
    pub id: u64,
    /// Job name
    pub name: String,
    pub build_id: u64,
    /// Build number as shown by the CI server
    pub build_name: String,
    pub status: String,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}
