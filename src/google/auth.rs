//! Service-account authorization
//!
//! Signs an RS256 assertion with the service-account key, exchanges it for a
//! bearer token and reuses that token until shortly before it expires.

use super::{classify_status, describe_request_error};
use crate::runtime::{RemoteWriteError, UploadError};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::sync::Mutex;

pub const SCOPES: &str =
    "https://www.googleapis.com/auth/spreadsheets https://www.googleapis.com/auth/drive";

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
/// Tokens this close to expiry are refreshed instead of reused
const EXPIRY_MARGIN_SECS: i64 = 60;

#[derive(Debug, Error)]
pub enum GoogleAuthError {
    #[error("cannot read credentials file {path}: {source}")]
    KeyFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed service-account key: {0}")]
    KeyFormat(#[from] serde_json::Error),
    #[error("invalid private key: {0}")]
    PrivateKey(#[source] jsonwebtoken::errors::Error),
    #[error("cannot sign assertion: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),
    #[error("token exchange failed: {0}")]
    Exchange(String),
}

impl From<GoogleAuthError> for UploadError {
    fn from(e: GoogleAuthError) -> Self {
        UploadError::Auth(e.to_string())
    }
}

impl From<GoogleAuthError> for RemoteWriteError {
    fn from(e: GoogleAuthError) -> Self {
        RemoteWriteError::Auth(e.to_string())
    }
}

/// Fields of the service-account JSON key this crate needs
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl ServiceAccountKey {
    pub fn from_json(json: &str) -> Result<Self, GoogleAuthError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: &Path) -> Result<Self, GoogleAuthError> {
        let json = std::fs::read_to_string(path).map_err(|source| GoogleAuthError::KeyFile {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }
}

/// Anything that can hand out a bearer token for the Google APIs
#[async_trait]
pub trait AccessTokenSource: Send + Sync {
    async fn access_token(&self) -> Result<String, GoogleAuthError>;
}

#[derive(Debug, Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Debug, Clone)]
struct CachedToken {
    token: String,
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now + Duration::seconds(EXPIRY_MARGIN_SECS) < self.expires_at
    }
}

pub struct ServiceAccountAuth {
    key: ServiceAccountKey,
    encoding_key: EncodingKey,
    client: Client,
    cached: Mutex<Option<CachedToken>>,
}

impl ServiceAccountAuth {
    /// Fails immediately if the private key is not valid PEM
    pub fn new(key: ServiceAccountKey, client: Client) -> Result<Self, GoogleAuthError> {
        let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
            .map_err(GoogleAuthError::PrivateKey)?;
        Ok(Self {
            key,
            encoding_key,
            client,
            cached: Mutex::new(None),
        })
    }

    pub fn client_email(&self) -> &str {
        &self.key.client_email
    }

    fn assertion(&self, now: DateTime<Utc>) -> Result<String, GoogleAuthError> {
        let iat = now.timestamp();
        let claims = Claims {
            iss: &self.key.client_email,
            scope: SCOPES,
            aud: &self.key.token_uri,
            iat,
            exp: iat + ASSERTION_LIFETIME_SECS,
        };
        jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &self.encoding_key)
            .map_err(GoogleAuthError::Signing)
    }

    async fn exchange(&self, now: DateTime<Utc>) -> Result<CachedToken, GoogleAuthError> {
        let assertion = self.assertion(now)?;

        let response = self
            .client
            .post(&self.key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .map_err(|e| GoogleAuthError::Exchange(describe_request_error(&e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| GoogleAuthError::Exchange(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            return Err(GoogleAuthError::Exchange(classify_status(status, &body).to_string()));
        }

        let token: TokenResponse = serde_json::from_str(&body)
            .map_err(|e| GoogleAuthError::Exchange(format!("Failed to parse response: {e}")))?;

        Ok(CachedToken {
            token: token.access_token,
            expires_at: now + Duration::seconds(token.expires_in),
        })
    }
}

#[async_trait]
impl AccessTokenSource for ServiceAccountAuth {
    async fn access_token(&self) -> Result<String, GoogleAuthError> {
        let mut cached = self.cached.lock().await;
        let now = Utc::now();

        if let Some(token) = cached.as_ref().filter(|t| t.is_fresh(now)) {
            return Ok(token.token.clone());
        }

        let fresh = self.exchange(now).await?;
        tracing::debug!(
            account = %self.key.client_email,
            expires_at = %fresh.expires_at,
            "Obtained Google access token"
        );
        let token = fresh.token.clone();
        *cached = Some(fresh);
        Ok(token)
    }
}
