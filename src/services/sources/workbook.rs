use bytes::Bytes;
use calamine::{open_workbook_from_rs, Data, Reader, Xlsx};
use chrono::{Duration, NaiveDate};
use futures::future::{BoxFuture, FutureExt};
use reqwest::Client;
use std::io::Cursor;
use tracing::info;

use super::SheetSource;
use crate::error::LoadError;
use crate::models::{RawGrid, SheetRef};

/// An `.xlsx` export of the spreadsheet, read from disk or over HTTP.
/// Cells are rendered back to Brazilian text so they go through the same
/// cleaning as rows coming from the Sheets API.
pub struct WorkbookSource {
    location: String,
    client: Client,
}

impl WorkbookSource {
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            client: Client::new(),
        }
    }

    async fn read_bytes(&self) -> Result<Bytes, LoadError> {
        if self.location.starts_with("http://") || self.location.starts_with("https://") {
            let response = self
                .client
                .get(&self.location)
                .send()
                .await
                .map_err(|e| LoadError::Transport(format!("Failed to fetch workbook: {}", e)))?;

            if response.status() == reqwest::StatusCode::NOT_FOUND {
                return Err(LoadError::SourceNotFound(self.location.clone()));
            }
            if !response.status().is_success() {
                return Err(LoadError::Transport(format!(
                    "Failed to fetch workbook. Status: {}",
                    response.status()
                )));
            }

            response
                .bytes()
                .await
                .map_err(|e| LoadError::Transport(format!("Failed to read response bytes: {}", e)))
        } else {
            match tokio::fs::read(&self.location).await {
                Ok(data) => Ok(Bytes::from(data)),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    Err(LoadError::SourceNotFound(self.location.clone()))
                }
                Err(e) => Err(LoadError::Transport(format!(
                    "Failed to read workbook '{}': {}",
                    self.location, e
                ))),
            }
        }
    }

    async fn fetch(&self, sheet: &SheetRef) -> Result<RawGrid, LoadError> {
        let data = self.read_bytes().await?;
        info!("Workbook loaded, size: {}KB", data.len() / 1024);
        rows_from_workbook(data, &sheet.tab)
    }
}

impl SheetSource for WorkbookSource {
    fn fetch_rows<'a>(&'a self, sheet: &'a SheetRef) -> BoxFuture<'a, Result<RawGrid, LoadError>> {
        self.fetch(sheet).boxed()
    }
}

fn rows_from_workbook(data: Bytes, tab: &str) -> Result<RawGrid, LoadError> {
    let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(data))
        .map_err(|e| LoadError::Transport(format!("Failed to open workbook: {}", e)))?;

    if !workbook.sheet_names().iter().any(|name| name == tab) {
        return Err(LoadError::SourceNotFound(format!("tab '{}'", tab)));
    }

    let range = workbook
        .worksheet_range(tab)
        .map_err(|e| LoadError::Transport(format!("Failed to read tab '{}': {}", tab, e)))?;

    Ok(range
        .rows()
        .map(|row| row.iter().map(cell_text).collect())
        .collect())
}

/// Text as a Brazilian spreadsheet would show it.
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => f.to_string().replace('.', ","),
        Data::DateTime(d) => serial_to_date(d.as_f64())
            .map(|date| date.format("%d/%m/%Y").to_string())
            .unwrap_or_default(),
        other => other.to_string(),
    }
}

// Excel day serials count from 1899-12-30
fn serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }
    NaiveDate::from_ymd_opt(1899, 12, 30)?.checked_add_signed(Duration::days(serial.floor() as i64))
}
