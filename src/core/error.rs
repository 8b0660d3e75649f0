//! Error types for the device notes tool
//!
//! `ApiError` covers the operations that are allowed to fail hard: building the
//! device directory, reading the CSV input and writing snapshots. Per-device
//! operations report failures through [`crate::core::outcome::Outcome`] instead.

use crate::device::traits::TransportError;
use thiserror::Error;

/// Main error type for the device notes tool
#[derive(Error, Debug)]
pub enum ApiError {
    /// The request never produced an HTTP response
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// The API answered with a non-success status
    #[error("HTTP {status} from {path}: {body}")]
    Status {
        path: String,
        status: u16,
        body: String,
    },

    /// The response body did not have the expected shape
    #[error("Unexpected response from {path}: {message}")]
    Decode { path: String, message: String },

    /// General I/O error
    #[error("IO error: {0}")]
    Io(String),

    /// The CSV input could not be read
    #[error("CSV error in '{path}': {message}")]
    Csv { path: String, message: String },

    /// A required setting is missing or invalid
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, ApiError>;

impl From<std::io::Error> for ApiError {
    fn from(err: std::io::Error) -> Self {
        ApiError::Io(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_error_message() {
        let err = ApiError::Status {
            path: "/devices".to_string(),
            status: 401,
            body: "unauthorized".to_string(),
        };
        assert_eq!(err.to_string(), "HTTP 401 from /devices: unauthorized");
    }

    #[test]
    fn test_transport_error_converts() {
        let err: ApiError = TransportError::Timeout("deadline elapsed".to_string()).into();
        assert!(matches!(err, ApiError::Transport(TransportError::Timeout(_))));
        assert!(err.to_string().contains("timeout"));
    }
}
