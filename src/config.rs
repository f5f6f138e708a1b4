use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::net::SocketAddr;
use std::time::Duration;

use crate::models::SheetRef;

pub const DEFAULT_SPREADSHEET: &str = "Estoque_industria_Analitico";
pub const DEFAULT_TAB: &str = "ESTOQUETotal";
pub const DEFAULT_CACHE_TTL_SECS: u64 = 600;
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";

/// Selector value meaning "do not restrict on this column".
pub const NO_FILTER: &str = "Todos";
/// Substituted for missing text in filter-key columns.
pub const NOT_INFORMED: &str = "Não Informado";

/// A numeric column shown as a headline total.
#[derive(Debug, Clone, PartialEq)]
pub struct TotalSpec {
    pub column: String,
    pub label: String,
}

/// Static column-role declarations for the inventory tab.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnRoles {
    pub display: Vec<String>,
    pub numeric: Vec<String>,
    pub date: Vec<String>,
    pub filter_keys: Vec<String>,
    pub search_column: String,
    pub selector_columns: Vec<String>,
    pub totals: Vec<TotalSpec>,
}

impl Default for ColumnRoles {
    fn default() -> Self {
        let owned = |names: &[&str]| names.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        Self {
            display: owned(&["TIPO", "RASTREIO", "NOTA FISCAL", "MATÉRIA-PRIMA", "PRODUTO", "KG", "CX"]),
            numeric: owned(&["KG", "CX"]),
            date: Vec::new(),
            filter_keys: owned(&["TIPO", "PRODUTO", "RASTREIO"]),
            search_column: "RASTREIO".to_string(),
            selector_columns: owned(&["TIPO", "PRODUTO"]),
            totals: vec![
                TotalSpec {
                    column: "CX".to_string(),
                    label: "Total de Caixas (CX)".to_string(),
                },
                TotalSpec {
                    column: "KG".to_string(),
                    label: "Total de Quilogramas (KG)".to_string(),
                },
            ],
        }
    }
}

impl ColumnRoles {
    pub fn is_numeric(&self, column: &str) -> bool {
        self.numeric.iter().any(|c| c == column)
    }

    pub fn is_date(&self, column: &str) -> bool {
        self.date.iter().any(|c| c == column)
    }
}

/// Where the rows come from.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceConfig {
    GoogleSheets {
        service_account_json: Option<String>,
        access_token: Option<String>,
    },
    /// `.xlsx` export on disk or behind an HTTP(S) URL.
    Workbook { location: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub sheet: SheetRef,
    pub source: SourceConfig,
    pub roles: ColumnRoles,
    pub cache_ttl: Duration,
    pub bind_addr: SocketAddr,
}

impl Config {
    pub fn new() -> Result<Self> {
        // Load .env file first
        dotenv().ok();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let mut sheet = SheetRef::new(
            var("INVENTORY_SPREADSHEET").unwrap_or_else(|| DEFAULT_SPREADSHEET.to_string()),
            var("INVENTORY_TAB").unwrap_or_else(|| DEFAULT_TAB.to_string()),
        );
        sheet.spreadsheet_id = var("INVENTORY_SPREADSHEET_ID");
        sheet.range = var("INVENTORY_RANGE");

        let source = match var("INVENTORY_WORKBOOK") {
            Some(location) => SourceConfig::Workbook { location },
            None => {
                let service_account_json = match var("GCP_SERVICE_ACCOUNT") {
                    Some(json) => Some(json),
                    None => match var("GCP_SERVICE_ACCOUNT_FILE") {
                        Some(path) => Some(
                            std::fs::read_to_string(&path)
                                .with_context(|| format!("Failed to read GCP_SERVICE_ACCOUNT_FILE '{}'", path))?,
                        ),
                        None => None,
                    },
                };
                SourceConfig::GoogleSheets {
                    service_account_json,
                    access_token: var("SHEETS_ACCESS_TOKEN"),
                }
            }
        };

        let mut roles = ColumnRoles::default();
        if let Some(extra) = var("INVENTORY_DATE_COLUMNS") {
            roles.date.extend(
                extra
                    .split(',')
                    .map(str::trim)
                    .filter(|name| !name.is_empty())
                    .map(str::to_string),
            );
        }

        let cache_ttl = match var("CACHE_TTL_SECS") {
            Some(secs) => Duration::from_secs(
                secs.parse()
                    .with_context(|| format!("CACHE_TTL_SECS must be a number of seconds, got '{}'", secs))?,
            ),
            None => Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
        };

        let bind_addr = var("BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse()
            .context("BIND_ADDR must be a socket address such as 127.0.0.1:3000")?;

        Ok(Config {
            sheet,
            source,
            roles,
            cache_ttl,
            bind_addr,
        })
    }
}
