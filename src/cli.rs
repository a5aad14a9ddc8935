use anyhow::{Context, Result};
use chrono::Utc;
use clap::builder::BoolishValueParser;
use clap::{Parser, Subcommand};
use console::Term;
use log::info;
use std::path::PathBuf;

use crate::config::Config;
use crate::output::{self, PollProgress};
use crate::scheduler::Dashboard;

#[derive(Parser)]
#[command(name = "radiator")]
#[command(author, version, about = "Concourse pipeline radiator", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (TOML, JSON or YAML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[arg(short, long, global = true, env = "CONCOURSE_URL")]
    url: Option<String>,

    #[arg(short, long, global = true, env = "CONCOURSE_TEAM")]
    team: Option<String>,

    #[arg(long, global = true, env = "CONCOURSE_USERNAME")]
    username: Option<String>,

    #[arg(long, global = true, env = "CONCOURSE_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Fetch a bearer token before each poll
    #[arg(
        long,
        global = true,
        env = "CONCOURSE_USE_BEARER",
        value_parser = BoolishValueParser::new()
    )]
    use_bearer_token: Option<bool>,

    /// Timeout for each Concourse request, in milliseconds
    #[arg(long, global = true, env = "HTTP_REQUEST_TIMEOUT")]
    http_request_timeout_ms: Option<u64>,

    #[arg(long, global = true, env = "REFRESH_SECONDS")]
    refresh_seconds: Option<u64>,

    /// Show the deployed version of each pipeline
    #[arg(long, global = true, env = "ENABLE_VERSIONS")]
    enable_versions: bool,

    #[arg(long, global = true, env = "S3_VERSIONS_BUCKET")]
    versions_bucket: Option<String>,

    /// How long a changed version stays flagged as new
    #[arg(long, global = true, env = "NOTIFY_NEW_VERSIONS_FOR_MINS")]
    notify_new_versions_for_mins: Option<i64>,

    #[arg(long, global = true, env = "LOG_LEVEL")]
    log_level: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Keep polling and redraw the dashboard after every refresh
    Watch,

    /// Poll once and print the snapshot as JSON
    Snapshot {
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[arg(short, long, default_value_t = false)]
        pretty: bool,
    },
}

impl Cli {
    /// Loads the configuration file and applies command-line overrides.
    pub fn load_config(&self) -> Result<Config> {
        let mut config = Config::load(self.config.as_deref())?;

        if let Some(url) = &self.url {
            config.concourse.url.clone_from(url);
        }
        if let Some(team) = &self.team {
            config.concourse.team.clone_from(team);
        }
        if let Some(username) = &self.username {
            config.concourse.username = Some(username.clone());
        }
        if let Some(password) = &self.password {
            config.concourse.password = Some(password.clone());
        }
        if let Some(use_bearer_token) = self.use_bearer_token {
            config.concourse.use_bearer_token = use_bearer_token;
        }
        if let Some(timeout_ms) = self.http_request_timeout_ms {
            config.concourse.http_request_timeout_seconds = timeout_ms.div_ceil(1000);
        }
        if let Some(refresh_seconds) = self.refresh_seconds {
            config.dashboard.refresh_interval_seconds = refresh_seconds;
        }
        if self.enable_versions {
            config.versions.enabled = true;
        }
        if let Some(bucket) = &self.versions_bucket {
            config.versions.bucket.clone_from(bucket);
        }
        if let Some(minutes) = self.notify_new_versions_for_mins {
            config.versions.notify_new_versions_for_minutes = minutes;
        }
        if let Some(log_level) = &self.log_level {
            config.log_level.clone_from(log_level);
        }

        config.validate().context("Invalid configuration")?;
        Ok(config)
    }

    async fn execute_watch(&self, config: &Config) -> Result<()> {
        let dashboard = Dashboard::from_config(config)?;
        let term = Term::stdout();
        info!(
            "Watching {} every {}s",
            config.concourse.url, config.dashboard.refresh_interval_seconds
        );

        loop {
            let view = dashboard.poll().await;
            term.clear_screen()?;
            output::print_dashboard(&view, Utc::now());
            tokio::time::sleep(dashboard.refresh_interval()).await;
        }
    }

    async fn execute_snapshot(
        &self,
        config: &Config,
        output_path: Option<&PathBuf>,
        pretty: bool,
    ) -> Result<()> {
        let dashboard = Dashboard::from_config(config)?;

        let progress = PollProgress::start(&config.concourse.url);
        let view = dashboard.poll().await;
        if let Some(error) = &view.error {
            progress.fail(error);
            anyhow::bail!("Failed to refresh pipelines: {error}");
        }
        progress.finish(view.pipelines.len());

        if let Some(output_path) = output_path {
            let mut file = std::fs::File::create(output_path).with_context(|| {
                format!("Failed to create output file: {}", output_path.display())
            })?;
            output::export_json(&view.pipelines, pretty, &mut file)?;
            info!("Snapshot written to: {}", output_path.display());
        } else {
            output::export_json(&view.pipelines, pretty, &mut std::io::stdout())?;
        }

        Ok(())
    }

    pub async fn execute(&self, config: &Config) -> Result<()> {
        match &self.command {
            Commands::Watch => self.execute_watch(config).await,
            Commands::Snapshot { output, pretty } => {
                self.execute_snapshot(config, output.as_ref(), *pretty).await
            }
        }
    }
}
