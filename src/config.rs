use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::TimeDelta;
use serde::{Deserialize, Serialize};
use url::Url;

/// Configuration file structure for the radiator.
///
/// Loaded from the current directory, the user config directory, or a path
/// given on the command line. Every field has a default so an empty file is
/// a valid configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    /// CI server connection
    #[serde(default)]
    pub concourse: ConcourseConfig,

    /// Dashboard behaviour
    #[serde(default)]
    pub dashboard: DashboardConfig,

    /// Version file lookup
    #[serde(default)]
    pub versions: VersionsConfig,

    /// Default log filter, overridden by `RUST_LOG`
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ConcourseConfig {
    /// Concourse base URL
    #[serde(default = "default_concourse_url")]
    pub url: String,

    /// API prefix appended to the base URL
    #[serde(default = "default_api_subdirectory")]
    pub api_subdirectory: String,

    /// Team used for the token and for pipelines without a team
    #[serde(default = "default_team")]
    pub team: String,

    pub username: Option<String>,

    pub password: Option<String>,

    /// Exchange username/password for a bearer token before each poll
    #[serde(default = "default_true")]
    pub use_bearer_token: bool,

    /// Timeout applied to every CI call
    #[serde(default = "default_http_timeout")]
    pub http_request_timeout_seconds: u64,

    /// Upper bound on CI calls in flight during a poll
    #[serde(default = "default_max_concurrent_requests")]
    pub max_concurrent_requests: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DashboardConfig {
    /// Display cut-off
    #[serde(default = "default_max_allowed_pipelines")]
    pub max_allowed_pipelines: usize,

    /// Minimum time between two refreshes
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct VersionsConfig {
    /// Look up version files at all
    #[serde(default)]
    pub enabled: bool,

    /// Object store endpoint
    #[serde(default = "default_versions_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_versions_bucket")]
    pub bucket: String,

    /// How long a changed version is flagged as new
    #[serde(default = "default_notify_minutes")]
    pub notify_new_versions_for_minutes: i64,

    #[serde(default = "default_versions_timeout")]
    pub request_timeout_seconds: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            concourse: ConcourseConfig::default(),
            dashboard: DashboardConfig::default(),
            versions: VersionsConfig::default(),
            log_level: default_log_level(),
        }
    }
}

impl Default for ConcourseConfig {
    fn default() -> Self {
        Self {
            url: default_concourse_url(),
            api_subdirectory: default_api_subdirectory(),
            team: default_team(),
            username: None,
            password: None,
            use_bearer_token: true,
            http_request_timeout_seconds: default_http_timeout(),
            max_concurrent_requests: default_max_concurrent_requests(),
        }
    }
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            max_allowed_pipelines: default_max_allowed_pipelines(),
            refresh_interval_seconds: default_refresh_interval(),
        }
    }
}

impl Default for VersionsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: default_versions_endpoint(),
            bucket: default_versions_bucket(),
            notify_new_versions_for_minutes: default_notify_minutes(),
            request_timeout_seconds: default_versions_timeout(),
        }
    }
}

fn default_concourse_url() -> String {
    "https://ci.concourse-ci.org".to_string()
}

fn default_api_subdirectory() -> String {
    "/api/v1".to_string()
}

fn default_team() -> String {
    "main".to_string()
}

fn default_true() -> bool {
    true
}

fn default_http_timeout() -> u64 {
    10
}

fn default_max_concurrent_requests() -> usize {
    crate::providers::concourse::DEFAULT_MAX_CONCURRENT_REQUESTS
}

fn default_max_allowed_pipelines() -> usize {
    50
}

fn default_refresh_interval() -> u64 {
    10
}

fn default_versions_endpoint() -> String {
    "https://s3.amazonaws.com".to_string()
}

fn default_versions_bucket() -> String {
    "s3-versions-bucket".to_string()
}

fn default_notify_minutes() -> i64 {
    15
}

fn default_versions_timeout() -> u64 {
    5
}

fn default_log_level() -> String {
    "info".to_string()
}

impl ConcourseConfig {
    /// API root with a trailing slash, e.g. `https://ci.example.com/api/v1/`.
    pub fn api_url(&self) -> Result<Url> {
        let mut base = self.url.trim_end_matches('/').to_string();
        base.push('/');
        let subdirectory = self.api_subdirectory.trim_matches('/');

        let base = Url::parse(&base).with_context(|| format!("Invalid Concourse URL: {}", self.url))?;
        if subdirectory.is_empty() {
            return Ok(base);
        }

        base.join(&format!("{subdirectory}/"))
            .with_context(|| format!("Invalid API subdirectory: {}", self.api_subdirectory))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.http_request_timeout_seconds)
    }
}

impl DashboardConfig {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_seconds)
    }
}

impl VersionsConfig {
    pub fn endpoint_url(&self) -> Result<Url> {
        Url::parse(&self.endpoint)
            .with_context(|| format!("Invalid version store endpoint: {}", self.endpoint))
    }

    pub fn notify_window(&self) -> TimeDelta {
        TimeDelta::minutes(self.notify_new_versions_for_minutes)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

impl Config {
    /// Load configuration from a file.
    ///
    /// Searches for configuration files in this order:
    /// 1. Specified path
    /// 2. ./radiator.toml, ./radiator.json, ./radiator.yaml, ./radiator.yml
    /// 3. `<config dir>/concourse-radiator/config.toml`
    ///
    /// Returns default configuration if no file is found.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            if path.exists() {
                return Self::load_from_path(path);
            }
            anyhow::bail!("Config file not found: {}", path.display());
        }

        let candidates = ["radiator.toml", "radiator.json", "radiator.yaml", "radiator.yml"];

        for candidate in &candidates {
            let path = Path::new(candidate);
            if path.exists() {
                return Self::load_from_path(path);
            }
        }

        if let Some(path) = user_config_path() {
            if path.exists() {
                return Self::load_from_path(&path);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file path.
    fn load_from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let extension = path.extension().and_then(|ext| ext.to_str()).unwrap_or("");

        match extension {
            "toml" => toml::from_str(&contents)
                .with_context(|| format!("Failed to parse TOML config: {}", path.display())),
            "json" => serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse JSON config: {}", path.display())),
            "yaml" | "yml" => serde_yaml::from_str(&contents)
                .with_context(|| format!("Failed to parse YAML config: {}", path.display())),
            _ => toml::from_str(&contents)
                .or_else(|_| serde_json::from_str(&contents))
                .or_else(|_| serde_yaml::from_str(&contents))
                .with_context(|| format!("Failed to parse config file: {}", path.display())),
        }
    }

    /// Checks values that would otherwise only fail once polling starts.
    pub fn validate(&self) -> Result<()> {
        self.concourse.api_url()?;
        if self.concourse.use_bearer_token
            && (self.concourse.username.is_none() || self.concourse.password.is_none())
        {
            anyhow::bail!("Bearer token requested but username or password is missing");
        }
        if self.versions.enabled {
            self.versions.endpoint_url()?;
        }
        if self.versions.notify_new_versions_for_minutes < 0 {
            anyhow::bail!("notify-new-versions-for-minutes must not be negative");
        }
        Ok(())
    }
}

fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("concourse-radiator").join("config.toml"))
}
