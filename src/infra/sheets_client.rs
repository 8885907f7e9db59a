use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode, Url};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use crate::app::ports::SheetStorePort;
use crate::error::{Result, SyncError};

/// Whether an HTTP status from the Sheets API is worth retrying.
pub fn is_transient_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::REQUEST_TIMEOUT
        || status.is_server_error()
}

fn transport_failure(target: &str, e: reqwest::Error) -> SyncError {
    if e.is_timeout() || e.is_connect() || e.is_request() {
        SyncError::TransientRemoteFailure {
            target: target.to_string(),
            status: None,
            message: e.to_string(),
        }
    } else {
        SyncError::PermanentRemoteFailure {
            target: target.to_string(),
            status: None,
            message: e.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateValuesResponse {
    #[serde(default)]
    updated_rows: usize,
}

/// Rows reported by a successful `values.update`, falling back to the rows
/// sent when the body cannot be decoded.
fn rows_updated(range: &str, body: &str, sent: usize) -> usize {
    match serde_json::from_str::<UpdateValuesResponse>(body) {
        Ok(parsed) => parsed.updated_rows,
        Err(e) => {
            warn!(range, sent, "Unexpected update response body: {}", e);
            sent
        }
    }
}

/// Google Sheets values API client for one spreadsheet.
///
/// Takes an already-issued OAuth access token; obtaining and refreshing it is
/// left to the caller.
pub struct SheetsClient {
    http: Client,
    base_url: String,
    spreadsheet_id: String,
    access_token: String,
}

impl SheetsClient {
    pub fn new(base_url: &str, spreadsheet_id: &str, access_token: &str, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SyncError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            spreadsheet_id: spreadsheet_id.to_string(),
            access_token: access_token.to_string(),
        })
    }

    fn values_url(&self, range: &str, suffix: &str) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| SyncError::Config(format!("invalid Sheets API base URL: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| SyncError::Config("Sheets API base URL cannot carry a path".into()))?
            .push(&self.spreadsheet_id)
            .push("values")
            .push(&format!("{range}{suffix}"));
        Ok(url)
    }

    async fn send(&self, method: Method, url: Url, range: &str, body: serde_json::Value) -> Result<reqwest::Response> {
        debug!(%method, range, "Sheets API call");
        let resp = self
            .http
            .request(method, url)
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_failure(range, e))?;

        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let message = resp.text().await.unwrap_or_default();
        let target = range.to_string();
        let status_code = Some(status.as_u16());
        if is_transient_status(status) {
            Err(SyncError::TransientRemoteFailure { target, status: status_code, message })
        } else {
            Err(SyncError::PermanentRemoteFailure { target, status: status_code, message })
        }
    }
}

#[async_trait]
impl SheetStorePort for SheetsClient {
    async fn clear(&self, range: &str) -> Result<()> {
        let url = self.values_url(range, ":clear")?;
        self.send(Method::POST, url, range, json!({})).await?;
        Ok(())
    }

    async fn update(&self, range: &str, values: &[Vec<String>]) -> Result<usize> {
        let mut url = self.values_url(range, "")?;
        // RAW keeps numeric-looking text as typed; sheet formulas do the coercion
        url.query_pairs_mut().append_pair("valueInputOption", "RAW");
        let body = json!({
            "range": range,
            "majorDimension": "ROWS",
            "values": values,
        });
        let resp = self.send(Method::PUT, url, range, body).await?;
        // The write has landed once the status is 2xx; an unreadable body must not fail the run
        let text = match resp.text().await {
            Ok(text) => text,
            Err(e) => {
                warn!(range, "Could not read update response: {}", e);
                String::new()
            }
        };
        Ok(rows_updated(range, &text, values.len()))
    }
}
