use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::{Client, StatusCode};
use url::Url;

use super::VersionStore;
use crate::error::{RadiatorError, Result};

const VERSION_FILE: &str = "version.txt";

/// Reads `<pipeline>/version.txt` objects from an S3-compatible bucket using
/// path-style addressing (`<endpoint>/<bucket>/<key>`).
pub struct BucketVersionStore {
    client: Client,
    endpoint: Url,
    bucket: String,
}

impl BucketVersionStore {
    pub fn new(endpoint: Url, bucket: String, timeout: Duration) -> Result<Self> {
        if endpoint.cannot_be_a_base() {
            return Err(RadiatorError::Config(format!(
                "Invalid version store endpoint: {endpoint}"
            )));
        }

        let client = Client::builder()
            .user_agent(concat!("concourse-radiator/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| RadiatorError::Config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint,
            bucket,
        })
    }

    fn object_url(&self, pipeline: &str) -> Result<Url> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|()| RadiatorError::Config(format!("Invalid endpoint: {}", self.endpoint)))?
            .pop_if_empty()
            .extend([self.bucket.as_str(), pipeline, VERSION_FILE]);
        Ok(url)
    }
}

#[async_trait]
impl VersionStore for BucketVersionStore {
    async fn get_version(&self, pipeline: &str) -> Result<Vec<u8>> {
        let url = self.object_url(pipeline)?;
        debug!("GET {url}");

        let response = self.client.get(url).send().await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Err(RadiatorError::NotFound(format!("{pipeline}/{VERSION_FILE}")));
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(RadiatorError::from_status(status, message));
        }

        Ok(response.bytes().await?.to_vec())
    }
}
