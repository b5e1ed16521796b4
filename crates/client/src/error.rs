//! Error types for the Voxmail client.
//!
//! API calls never surface these: they resolve to [`ApiFailure`] values so
//! callers can render them directly. The enums here cover local concerns
//! such as configuration and durable storage.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised by local client machinery.
#[derive(Error, Debug)]
pub enum ClientError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Durable storage error
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// HTTP client construction error
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// Invalid API base URL
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

/// Errors raised while loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Errors raised by a [`crate::storage::KeyValueStore`].
#[derive(Error, Debug)]
pub enum StorageError {
    /// The backing store is disabled or cannot be reached.
    #[error("storage unavailable")]
    Unavailable,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupted storage file: {0}")]
    Corrupted(#[from] serde_json::Error),
}

/// Result type alias using ClientError.
pub type ClientResult<T> = Result<T, ClientError>;

/// Where an [`ApiFailure`] originated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailureKind {
    /// No HTTP response was received.
    Network,
    /// Error status without a usable message in the body.
    #[default]
    Status,
    /// Error status with a message supplied by the server.
    Server,
    /// Success status with a body that did not decode.
    InvalidResponse,
    /// The request body could not be encoded.
    Encode,
}

/// Uniform failure returned by every API call.
///
/// `status` is `None` when the request never produced an HTTP response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiFailure {
    pub status: Option<u16>,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    #[serde(skip)]
    pub kind: FailureKind,
}

impl ApiFailure {
    fn build(kind: FailureKind, status: Option<u16>, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            details: None,
            kind,
        }
    }

    pub fn network(err: impl std::fmt::Display) -> Self {
        Self::build(FailureKind::Network, None, format!("Network error: {}", err))
    }

    /// Failure carrying the generic message for `status`.
    pub fn status(status: u16) -> Self {
        Self::build(
            FailureKind::Status,
            Some(status),
            crate::http::status_message(status),
        )
    }

    pub fn server(status: u16, message: impl Into<String>) -> Self {
        Self::build(FailureKind::Server, Some(status), message)
    }

    pub fn invalid_response(status: u16, reason: impl std::fmt::Display) -> Self {
        Self::build(
            FailureKind::InvalidResponse,
            Some(status),
            "Invalid response from server",
        )
        .with_details(serde_json::json!({ "reason": reason.to_string() }))
    }

    pub fn encode(err: impl std::fmt::Display) -> Self {
        Self::build(
            FailureKind::Encode,
            None,
            format!("Failed to encode request: {}", err),
        )
    }

    pub(crate) fn local(message: impl Into<String>) -> Self {
        Self::build(FailureKind::InvalidResponse, None, message)
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// The message written by the server, if it sent one.
    pub fn server_message(&self) -> Option<&str> {
        match self.kind {
            FailureKind::Server => Some(&self.message),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status == Some(401)
    }
}

impl std::fmt::Display for ApiFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.status {
            Some(status) => write!(f, "{} ({})", self.message, status),
            None => f.write_str(&self.message),
        }
    }
}

impl std::error::Error for ApiFailure {}

/// Result of an API call.
pub type ApiResult<T> = Result<T, ApiFailure>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_error_display() {
        let err = ClientError::from(StorageError::Unavailable);
        assert_eq!(err.to_string(), "Storage error: storage unavailable");
    }

    #[test]
    fn test_api_failure_display() {
        let err = ApiFailure::status(404);
        assert_eq!(err.to_string(), "Not found (404)");
        assert_eq!(err.server_message(), None);

        let err = ApiFailure::network("connection refused");
        assert_eq!(err.to_string(), "Network error: connection refused");
        assert!(err.status.is_none());
    }

    #[test]
    fn test_api_failure_skips_empty_details() {
        let err = ApiFailure::server(401, "invalid credentials");
        let json = serde_json::to_value(&err).unwrap();
        assert!(json.get("details").is_none());
        assert!(json.get("kind").is_none());
        assert_eq!(err.server_message(), Some("invalid credentials"));
        assert!(err.is_unauthorized());
    }
}
