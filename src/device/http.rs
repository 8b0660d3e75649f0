//! HTTP transport backed by `reqwest`'s blocking client
//!
//! Every request carries basic-auth credentials (account id + API token) and
//! shares the timeout chosen at construction.

use crate::core::config::ApiConfig;
use crate::core::error::{ApiError, Result};
use crate::device::traits::{ApiRequest, ApiResponse, Method, Transport, TransportError};
use log::{debug, trace};
use reqwest::blocking::Client;
use std::time::Duration;

/// Blocking HTTP transport for the device-management API
pub struct HttpTransport {
    client: Client,
    base_url: String,
    account_id: String,
    api_token: String,
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("base_url", &self.base_url)
            .field("account_id", &self.account_id)
            .field("api_token", &"<redacted>")
            .finish()
    }
}

impl HttpTransport {
    /// Create a transport from the API settings
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let timeout = Duration::try_from_secs_f64(config.timeout_secs).map_err(|e| {
            ApiError::InvalidConfig(format!(
                "Unusable timeout of {} seconds: {}",
                config.timeout_secs, e
            ))
        })?;

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::InvalidConfig(format!("Failed to build HTTP client: {}", e)))?;

        debug!(
            "HTTP transport ready for {} (timeout {}s)",
            config.base_url, config.timeout_secs
        );

        Ok(Self {
            client,
            base_url: normalize_base_url(&config.base_url),
            account_id: config.account_id.clone(),
            api_token: config.api_token.clone(),
        })
    }

    /// Base URL without a trailing slash
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url_for(&self, path: &str) -> String {
        join_url(&self.base_url, path)
    }
}

impl Transport for HttpTransport {
    fn send(&self, request: &ApiRequest) -> std::result::Result<ApiResponse, TransportError> {
        let url = self.url_for(&request.path);
        trace!("{} {}", request.method, url);

        let mut builder = match request.method {
            Method::Get => self.client.get(&url),
            Method::Post => self.client.post(&url),
        }
        .basic_auth(&self.account_id, Some(&self.api_token));

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(ref body) = request.body {
            builder = builder.json(body);
        }

        let response = builder.send().map_err(classify_error)?;
        let status = response.status().as_u16();
        let body = response.text().map_err(classify_error)?;

        debug!("{} -> HTTP {}", request, status);
        Ok(ApiResponse { status, body })
    }
}

/// Map a reqwest error onto the transport error kinds
fn classify_error(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout(err.to_string())
    } else if err.is_connect() {
        TransportError::Connect(err.to_string())
    } else {
        TransportError::Request(err.to_string())
    }
}

/// Strip trailing slashes from the configured base URL
pub fn normalize_base_url(base_url: &str) -> String {
    base_url.trim().trim_end_matches('/').to_string()
}

/// Join a base URL and a relative path with exactly one slash
///
/// A trailing slash on the path is kept, since some endpoints (`locations/`)
/// are registered with it.
pub fn join_url(base_url: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
