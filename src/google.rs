//! Google Drive and Sheets adapters
//!
//! Both talk to the REST APIs over `reqwest` with a bearer token minted from
//! the service-account key.

pub mod auth;
pub mod drive;
pub mod sheets;

pub use auth::{AccessTokenSource, GoogleAuthError, ServiceAccountAuth, ServiceAccountKey};
pub use drive::DriveUploader;
pub use sheets::GoogleSheetsSink;

use crate::runtime::{RemoteWriteError, UploadError};
use reqwest::{Client, StatusCode};
use std::time::Duration;
use thiserror::Error;

/// Per-request timeout for every Google API call
pub const REQUEST_TIMEOUT: Duration = Duration::from_mins(1);

/// Shared HTTP client for the Google adapters
pub fn http_client() -> Result<Client, reqwest::Error> {
    Client::builder().timeout(REQUEST_TIMEOUT).build()
}

/// Classified non-success response
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiFailure {
    /// 401 or 403
    #[error("{0}")]
    Auth(String),
    /// 429, including Drive's quota errors
    #[error("{0}")]
    RateLimited(String),
    #[error("{0}")]
    Other(String),
}

/// Map an HTTP status and body to a failure class
pub fn classify_status(status: StatusCode, body: &str) -> ApiFailure {
    let message = error_message(body).unwrap_or_else(|| body.to_string());
    match status.as_u16() {
        401 | 403 => ApiFailure::Auth(format!("Authentication failed: {message}")),
        429 => ApiFailure::RateLimited(format!("Rate limited: {message}")),
        500..=599 => ApiFailure::Other(format!("Server error {status}: {message}")),
        _ => ApiFailure::Other(format!("HTTP {status}: {message}")),
    }
}

/// Pull `error.message` out of a Google JSON error body
fn error_message(body: &str) -> Option<String> {
    let parsed: serde_json::Value = serde_json::from_str(body).ok()?;
    parsed
        .get("error")
        .and_then(|e| e.get("message"))
        .and_then(|m| m.as_str())
        .map(str::to_string)
}

/// Describe a transport-level failure the way the status classifier does
pub(crate) fn describe_request_error(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        format!("Request timeout: {e}")
    } else if e.is_connect() {
        format!("Connection failed: {e}")
    } else {
        format!("Request failed: {e}")
    }
}

impl From<ApiFailure> for UploadError {
    fn from(failure: ApiFailure) -> Self {
        match failure {
            ApiFailure::Auth(m) => UploadError::Auth(m),
            ApiFailure::RateLimited(m) => UploadError::RateLimited(m),
            ApiFailure::Other(m) => UploadError::Request(m),
        }
    }
}

impl From<ApiFailure> for RemoteWriteError {
    fn from(failure: ApiFailure) -> Self {
        match failure {
            ApiFailure::Auth(m) => RemoteWriteError::Auth(m),
            ApiFailure::RateLimited(m) => RemoteWriteError::RateLimited(m),
            ApiFailure::Other(m) => RemoteWriteError::Request(m),
        }
    }
}
