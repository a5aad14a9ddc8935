use std::fmt;
use std::time::Duration;

use log::{debug, info};
use reqwest::Client;
use serde::Deserialize;
use url::Url;

use crate::error::{RadiatorError, Result};

/// Bearer token handed out by the CI server.
#[derive(Clone, PartialEq, Eq)]
pub struct Token(String);

impl Token {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Token {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<String> for Token {
    fn from(value: String) -> Self {
        Self(value)
    }
}

// Keep tokens out of debug logs.
impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Token(***)")
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    value: String,
}

/// Acquires the credential used for CI calls.
///
/// With bearer tokens disabled the authenticator is a no-op and every call
/// returns `None`.
pub struct Authenticator {
    client: Client,
    token_url: Option<Url>,
    username: String,
    password: String,
}

impl Authenticator {
    pub fn new(
        api_url: &Url,
        team: &str,
        username: String,
        password: String,
        use_bearer_token: bool,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("concourse-radiator/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| RadiatorError::Config(format!("Failed to create HTTP client: {e}")))?;

        let token_url = if use_bearer_token {
            Some(
                api_url
                    .join(&format!("teams/{team}/auth/token"))
                    .map_err(|e| RadiatorError::Config(format!("Invalid token URL: {e}")))?,
            )
        } else {
            None
        };

        Ok(Self {
            client,
            token_url,
            username,
            password,
        })
    }

    pub async fn token(&self) -> Result<Option<Token>> {
        let Some(url) = &self.token_url else {
            debug!("Bearer token disabled, polling anonymously");
            return Ok(None);
        };

        info!("Requesting bearer token...");
        let response = self
            .client
            .get(url.clone())
            .basic_auth(&self.username, Some(&self.password))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(RadiatorError::from_status(status, message));
        }

        let body: TokenResponse = response.json().await?;
        Ok(Some(Token::from(body.value)))
    }
}
