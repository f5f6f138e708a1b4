use futures::future::{BoxFuture, FutureExt};
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info};

use super::SheetSource;
use crate::error::LoadError;
use crate::models::{RawGrid, SheetRef};
use crate::services::credentials::{AccessToken, AuthProvider};

const SHEETS_API: &str = "https://sheets.googleapis.com/v4/spreadsheets/";
const DRIVE_FILES_API: &str = "https://www.googleapis.com/drive/v3/files";
const SPREADSHEET_MIME: &str = "application/vnd.google-apps.spreadsheet";

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Option<Vec<Vec<serde_json::Value>>>,
}

#[derive(Debug, Deserialize)]
struct FileList {
    #[serde(default)]
    files: Vec<DriveFile>,
}

#[derive(Debug, Deserialize)]
struct DriveFile {
    id: String,
}

/// Reads a tab through the Sheets values API. The spreadsheet is found by
/// name through Drive unless its id is configured.
pub struct GoogleSheetsSource {
    client: Client,
    auth: Arc<dyn AuthProvider>,
}

impl GoogleSheetsSource {
    pub fn new(auth: Arc<dyn AuthProvider>) -> Self {
        Self {
            client: Client::new(),
            auth,
        }
    }

    async fn resolve_spreadsheet_id(&self, sheet: &SheetRef, token: &AccessToken) -> Result<String, LoadError> {
        if let Some(id) = &sheet.spreadsheet_id {
            return Ok(id.clone());
        }

        let query = drive_name_query(&sheet.spreadsheet);
        let response = self
            .client
            .get(DRIVE_FILES_API)
            .bearer_auth(token.as_str())
            .query(&[("q", query.as_str()), ("fields", "files(id,name)")])
            .send()
            .await
            .map_err(|e| LoadError::Transport(format!("Failed to reach Drive: {}", e)))?;

        let response = check_status(response, &sheet.spreadsheet).await?;
        let listing: FileList = response
            .json()
            .await
            .map_err(|e| LoadError::Transport(format!("Unexpected Drive response: {}", e)))?;

        let id = listing
            .files
            .into_iter()
            .next()
            .map(|file| file.id)
            .ok_or_else(|| LoadError::SourceNotFound(format!("spreadsheet '{}'", sheet.spreadsheet)))?;
        debug!("Spreadsheet '{}' resolved to {}", sheet.spreadsheet, id);
        Ok(id)
    }

    async fn fetch(&self, sheet: &SheetRef) -> Result<RawGrid, LoadError> {
        let token = self.auth.access_token().await?;
        let id = self.resolve_spreadsheet_id(sheet, &token).await?;
        let url = values_url(&id, &sheet.a1_range())?;

        info!("Fetching {}", sheet.a1_range());
        let response = self
            .client
            .get(url)
            .bearer_auth(token.as_str())
            .query(&[("majorDimension", "ROWS"), ("valueRenderOption", "FORMATTED_VALUE")])
            .send()
            .await
            .map_err(|e| LoadError::Transport(format!("Failed to reach Sheets: {}", e)))?;

        let response = check_status(response, &sheet.a1_range()).await?;
        let range: ValueRange = response
            .json()
            .await
            .map_err(|e| LoadError::Transport(format!("Unexpected Sheets response: {}", e)))?;

        Ok(rows_from_values(range.values.unwrap_or_default()))
    }
}

impl SheetSource for GoogleSheetsSource {
    fn fetch_rows<'a>(&'a self, sheet: &'a SheetRef) -> BoxFuture<'a, Result<RawGrid, LoadError>> {
        self.fetch(sheet).boxed()
    }
}

/// Drive search for a spreadsheet by exact name. Backslashes are escaped
/// before quotes so the quote escapes stay intact.
fn drive_name_query(name: &str) -> String {
    format!(
        "name = '{}' and mimeType = '{}' and trashed = false",
        name.replace('\\', "\\\\").replace('\'', "\\'"),
        SPREADSHEET_MIME
    )
}

fn values_url(spreadsheet_id: &str, a1_range: &str) -> Result<Url, LoadError> {
    let mut url = Url::parse(SHEETS_API)
        .map_err(|e| LoadError::Transport(format!("Invalid Sheets endpoint: {}", e)))?;
    url.path_segments_mut()
        .map_err(|_| LoadError::Transport("Invalid Sheets endpoint".to_string()))?
        .pop_if_empty()
        .extend([spreadsheet_id, "values", a1_range]);
    Ok(url)
}

async fn check_status(response: reqwest::Response, what: &str) -> Result<reqwest::Response, LoadError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(classify_failure(status, &body, what))
}

fn classify_failure(status: StatusCode, body: &str, what: &str) -> LoadError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            LoadError::Authentication(format!("access to '{}' was refused ({})", what, status))
        }
        StatusCode::NOT_FOUND => LoadError::SourceNotFound(what.to_string()),
        // A tab that does not exist shows up as an unparseable range
        StatusCode::BAD_REQUEST if body.contains("Unable to parse range") => {
            LoadError::SourceNotFound(what.to_string())
        }
        _ => LoadError::Transport(format!("'{}' answered {}: {}", what, status, body.trim())),
    }
}

fn rows_from_values(values: Vec<Vec<serde_json::Value>>) -> RawGrid {
    values
        .into_iter()
        .map(|row| {
            row.into_iter()
                .map(|cell| match cell {
                    serde_json::Value::String(s) => s,
                    serde_json::Value::Null => String::new(),
                    other => other.to_string(),
                })
                .collect()
        })
        .collect()
}
