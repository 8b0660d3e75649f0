//! Transport abstraction for testability
//!
//! Every call to the device-management API goes through the [`Transport`]
//! trait. The real implementation ([`crate::device::http::HttpTransport`])
//! speaks HTTP with basic auth; the mock in [`crate::testdb`] serves an
//! in-memory fleet and records every request it receives. Both are
//! interchangeable behind [`crate::device::client::ApiClient`].
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use device_notes_tool::device::traits::{ApiRequest, Transport};
//!
//! fn count_devices<T: Transport>(transport: &T) -> Result<usize, String> {
//!     let response = transport
//!         .send(&ApiRequest::get("devices"))
//!         .map_err(|e| e.to_string())?;
//!     let body: serde_json::Value = serde_json::from_str(&response.body).map_err(|e| e.to_string())?;
//!     Ok(body["devices"].as_array().map(|d| d.len()).unwrap_or(0))
//! }
//! ```

use serde::Serialize;
use serde_json::Value;
use std::fmt::{self, Display};
use thiserror::Error;

/// HTTP method used by a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Method {
    Get,
    Post,
}

impl Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Get => write!(f, "GET"),
            Method::Post => write!(f, "POST"),
        }
    }
}

/// A request relative to the API base URL
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    /// HTTP method
    pub method: Method,
    /// Path below the base URL (e.g. "devices/ABC/details")
    pub path: String,
    /// Query string parameters, in order
    pub query: Vec<(String, String)>,
    /// JSON body for POST requests
    pub body: Option<Value>,
}

impl ApiRequest {
    /// Create a GET request
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    /// Create a POST request carrying a JSON body
    pub fn post_json(path: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::Post,
            path: path.into(),
            query: Vec::new(),
            body: Some(body),
        }
    }

    /// Add a query string parameter
    pub fn with_query(mut self, key: &str, value: impl Into<String>) -> Self {
        self.query.push((key.to_string(), value.into()));
        self
    }

    /// Look up a query parameter by name
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

impl Display for ApiRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} /{}", self.method, self.path.trim_start_matches('/'))
    }
}

/// Raw HTTP response: status and undecoded body text
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Create a response with a JSON body
    pub fn json(status: u16, body: &Value) -> Self {
        Self::new(status, body.to_string())
    }

    /// Whether the status is in the 2xx range
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Parse the body as JSON, if it is JSON
    pub fn json_body(&self) -> Option<Value> {
        serde_json::from_str(&self.body).ok()
    }
}

/// A request that never produced an HTTP response
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The request did not complete within the configured timeout
    #[error("timeout: {0}")]
    Timeout(String),

    /// The server could not be reached
    #[error("connection error: {0}")]
    Connect(String),

    /// Any other failure while sending the request or reading the response
    #[error("request exception: {0}")]
    Request(String),
}

/// Trait for sending requests to the device-management API
///
/// Implementations block until a response arrives or the transport gives up.
/// A response with any status code is `Ok`; only failures that prevent a
/// response from being received are `Err`.
pub trait Transport: Send + Sync {
    /// Send a request and wait for the response
    fn send(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn send(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError> {
        (**self).send(request)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn send(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError> {
        (**self).send(request)
    }
}
