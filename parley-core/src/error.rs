use thiserror::Error;

/// Failures surfaced by [`crate::ConversationClient`].
#[derive(Error, Debug)]
pub enum ClientError {
    /// No response was obtained (connection refused, DNS, timeout).
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Service error ({status}): {body}")]
    Service { status: u16, body: String },

    #[error("Invalid response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Missing API key")]
    MissingApiKey,

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl ClientError {
    /// HTTP status of a `Service` error, `None` for everything else.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Service { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

#[derive(Error, Debug)]
pub enum ParleyError {
    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Client error: {0}")]
    Client(#[from] ClientError),
}
