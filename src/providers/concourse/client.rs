use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, trace};
use reqwest::header::COOKIE;
use reqwest::Client;
use serde::de::DeserializeOwned;
use tokio::sync::Semaphore;
use url::Url;

use super::types::{BuildSummary, JobSummary, PipelineSummary};
use crate::auth::Token;
use crate::error::{RadiatorError, Result};
use crate::providers::CiApi;

pub const DEFAULT_MAX_CONCURRENT_REQUESTS: usize = 50;

/// Thin REST client for the Concourse API.
///
/// No retries happen here: a failed call is reported once and the next poll
/// is the retry.
pub struct ConcourseClient {
    client: Client,
    api_url: Url,
    team: String,
    semaphore: Arc<Semaphore>,
}

impl ConcourseClient {
    /// `api_url` is the API root including the subdirectory, e.g.
    /// `https://ci.example.com/api/v1/`.
    pub fn new(
        api_url: Url,
        team: String,
        timeout: Duration,
        max_concurrent_requests: usize,
    ) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("concourse-radiator/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| RadiatorError::Config(format!("Failed to create HTTP client: {e}")))?;

        if api_url.cannot_be_a_base() {
            return Err(RadiatorError::Config(format!(
                "API URL cannot be used as a base: {api_url}"
            )));
        }

        Ok(Self {
            client,
            api_url,
            team,
            semaphore: Arc::new(Semaphore::new(max_concurrent_requests.max(1))),
        })
    }

    fn auth_request(
        &self,
        request: reqwest::RequestBuilder,
        token: Option<&Token>,
    ) -> reqwest::RequestBuilder {
        if let Some(token) = token {
            request.header(COOKIE, format!("ATC-Authorization=Bearer {}", token.as_str()))
        } else {
            request
        }
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.api_url.clone();
        url.path_segments_mut()
            .map_err(|()| RadiatorError::Config(format!("Invalid API URL: {}", self.api_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn team_of<'a>(&'a self, pipeline: &'a PipelineSummary) -> &'a str {
        if pipeline.team_name.is_empty() {
            &self.team
        } else {
            &pipeline.team_name
        }
    }

    async fn get_json<T>(&self, url: Url, token: Option<&Token>) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|e| RadiatorError::Config(format!("Request limiter closed: {e}")))?;

        debug!("GET {url}");
        let response = self
            .auth_request(self.client.get(url.clone()), token)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            return Err(RadiatorError::from_status(status, error_text));
        }

        let body = response.text().await?;
        trace!("Response from {url}: {body}");
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl CiApi for ConcourseClient {
    async fn list_pipelines(&self, token: Option<&Token>) -> Result<Vec<PipelineSummary>> {
        let url = self.endpoint(&["pipelines"])?;
        self.get_json(url, token).await
    }

    async fn list_jobs(
        &self,
        token: Option<&Token>,
        pipeline: &PipelineSummary,
    ) -> Result<Vec<JobSummary>> {
        let url = self.endpoint(&[
            "teams",
            self.team_of(pipeline),
            "pipelines",
            pipeline.name.as_str(),
            "jobs",
        ])?;
        self.get_json(url, token).await
    }

    async fn list_builds(
        &self,
        token: Option<&Token>,
        pipeline: &PipelineSummary,
        job: &str,
    ) -> Result<Vec<BuildSummary>> {
        let url = self.endpoint(&[
            "teams",
            self.team_of(pipeline),
            "pipelines",
            pipeline.name.as_str(),
            "jobs",
            job,
            "builds",
        ])?;
        self.get_json(url, token).await
    }
}
