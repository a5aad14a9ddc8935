use thiserror::Error;

#[derive(Error, Debug)]
pub enum RadiatorError {
    #[error("API request failed with status {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Not authorized (status {status})")]
    Auth { status: u16 },

    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl RadiatorError {
    /// Maps a non-success HTTP status to the matching error variant.
    pub fn from_status(status: reqwest::StatusCode, message: String) -> Self {
        match status.as_u16() {
            401 | 403 => Self::Auth {
                status: status.as_u16(),
            },
            code => Self::Api {
                status: code,
                message,
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, RadiatorError>;
