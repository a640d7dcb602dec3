//! Résumé upload to a Drive folder

use super::{classify_status, describe_request_error, AccessTokenSource};
use crate::runtime::{DocumentSource, ResumeUploader, UploadError};
use crate::state_machine::FileReference;
use async_trait::async_trait;
use reqwest::{header, Body, Client};
use serde::Deserialize;
use std::sync::Arc;

const UPLOAD_URL: &str = "https://www.googleapis.com/upload/drive/v3/files";
const DEFAULT_EXTENSION: &str = ".pdf";

#[derive(Debug, Deserialize)]
struct CreatedFile {
    id: String,
}

/// Public viewing link of an uploaded Drive file
pub fn share_link(file_id: &str) -> String {
    format!("https://drive.google.com/file/d/{file_id}/view?usp=sharing")
}

/// Streams a chat document into the configured Drive folder using a
/// resumable upload session.
pub struct DriveUploader {
    client: Client,
    auth: Arc<dyn AccessTokenSource>,
    folder_id: String,
    source: Arc<dyn DocumentSource>,
    upload_url: String,
}

impl DriveUploader {
    pub fn new(
        client: Client,
        auth: Arc<dyn AccessTokenSource>,
        folder_id: impl Into<String>,
        source: Arc<dyn DocumentSource>,
    ) -> Self {
        Self {
            client,
            auth,
            folder_id: folder_id.into(),
            source,
            upload_url: UPLOAD_URL.to_string(),
        }
    }

    /// Point the uploader at a different API host
    #[allow(dead_code)] // Used by tests
    pub fn with_upload_url(mut self, upload_url: impl Into<String>) -> Self {
        self.upload_url = upload_url.into();
        self
    }

    /// Open a resumable session and return its upload URL
    async fn start_session(&self, token: &str, name: &str) -> Result<String, UploadError> {
        let metadata = serde_json::json!({
            "name": name,
            "parents": [self.folder_id],
        });

        let response = self
            .client
            .post(&self.upload_url)
            .query(&[
                ("uploadType", "resumable"),
                ("fields", "id"),
                ("supportsAllDrives", "true"),
            ])
            .bearer_auth(token)
            .json(&metadata)
            .send()
            .await
            .map_err(|e| UploadError::Request(describe_request_error(&e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status, &body).into());
        }

        response
            .headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| {
                UploadError::Request("Upload session has no Location header".to_string())
            })
    }
}

#[async_trait]
impl ResumeUploader for DriveUploader {
    async fn upload(
        &self,
        file: &FileReference,
        display_name: &str,
    ) -> Result<String, UploadError> {
        let download = self.source.open(file).await?;
        let extension = download
            .extension
            .unwrap_or_else(|| DEFAULT_EXTENSION.to_string());
        let name = format!("{display_name}{extension}");

        let token = self.auth.access_token().await?;
        let session_url = self.start_session(&token, &name).await?;

        let response = self
            .client
            .put(&session_url)
            .bearer_auth(&token)
            .body(Body::wrap_stream(download.stream))
            .send()
            .await
            .map_err(|e| UploadError::Request(describe_request_error(&e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| UploadError::Request(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            return Err(classify_status(status, &body).into());
        }

        let created: CreatedFile = serde_json::from_str(&body).map_err(|e| {
            UploadError::Request(format!("Failed to parse response: {e} - body: {body}"))
        })?;

        tracing::info!(file_id = %created.id, name = %name, "Uploaded résumé to Drive");
        Ok(share_link(&created.id))
    }
}
