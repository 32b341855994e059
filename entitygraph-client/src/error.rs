//! Client error types.

use thiserror::Error;

/// Result type for transport and API calls.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that can occur while talking to the remote store.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The store answered with a non-2xx status.
    #[error("request failed with status {status}: {body}")]
    Status { status: u16, body: String },

    /// The request could not be sent or the response not read.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// A JSON body failed to encode or decode.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A select result was not valid CSV.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// The body decoded but did not have the expected shape.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// The transport could not reach the store.
    #[error("network error: {0}")]
    Network(String),

    /// The client settings are unusable.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl ClientError {
    /// The HTTP status, if the error came from a non-2xx response.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Status { status, .. } => Some(*status),
            ClientError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Returns true if the store reported the resource as missing.
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}
