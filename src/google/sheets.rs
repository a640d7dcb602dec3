//! Row append to a Google Sheets worksheet

use super::{classify_status, describe_request_error, AccessTokenSource};
use crate::runtime::{RemoteWriteError, SinkError, SubmissionRecord, SubmissionSink};
use async_trait::async_trait;
use reqwest::{Client, Url};
use std::sync::Arc;

const SHEETS_BASE_URL: &str = "https://sheets.googleapis.com/v4/spreadsheets";

pub struct GoogleSheetsSink {
    client: Client,
    auth: Arc<dyn AccessTokenSource>,
    spreadsheet_id: String,
    worksheet: String,
    base_url: String,
}

impl GoogleSheetsSink {
    pub fn new(
        client: Client,
        auth: Arc<dyn AccessTokenSource>,
        spreadsheet_id: impl Into<String>,
        worksheet: impl Into<String>,
    ) -> Self {
        Self {
            client,
            auth,
            spreadsheet_id: spreadsheet_id.into(),
            worksheet: worksheet.into(),
            base_url: SHEETS_BASE_URL.to_string(),
        }
    }

    #[allow(dead_code)] // Used by tests
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// `<base>/<spreadsheet>/values/<worksheet>!A1:append`, with the
    /// worksheet name percent-encoded as a single path segment
    fn append_url(&self) -> Result<Url, RemoteWriteError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| RemoteWriteError::Request(format!("Invalid Sheets URL: {e}")))?;
        url.path_segments_mut()
            .map_err(|()| RemoteWriteError::Request("Sheets URL cannot be a base".to_string()))?
            .pop_if_empty()
            .push(&self.spreadsheet_id)
            .push("values")
            .push(&format!("{}!A1:append", self.worksheet));
        url.query_pairs_mut()
            .append_pair("valueInputOption", "USER_ENTERED")
            .append_pair("insertDataOption", "INSERT_ROWS");
        Ok(url)
    }

    async fn append_row(&self, record: &SubmissionRecord) -> Result<(), RemoteWriteError> {
        let url = self.append_url()?;
        let token = self.auth.access_token().await?;
        let body = serde_json::json!({ "values": [record.to_row()] });

        let response = self
            .client
            .post(url)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .map_err(|e| RemoteWriteError::Request(describe_request_error(&e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status, &body).into());
        }

        tracing::debug!(
            spreadsheet = %self.spreadsheet_id,
            worksheet = %self.worksheet,
            "Appended submission row"
        );
        Ok(())
    }
}

#[async_trait]
impl SubmissionSink for GoogleSheetsSink {
    fn name(&self) -> &'static str {
        "google_sheets"
    }

    async fn append(&self, record: &SubmissionRecord) -> Result<(), SinkError> {
        self.append_row(record).await.map_err(SinkError::from)
    }
}
