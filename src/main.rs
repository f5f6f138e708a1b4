use anyhow::Result;
use axum::Router;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

mod config;
mod error;
mod logging;
mod routes;
mod services;
pub mod models;

use config::{Config, SourceConfig};
use services::cache::InventoryService;
use services::credentials::provider_from_config;
use services::sources::{GoogleSheetsSource, SheetSource, WorkbookSource};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    logging::init_logging()?;

    // Load configuration
    let config = Config::new()?;

    // Build our application state
    let state = Arc::new(AppState::from_config(&config));

    let app = Router::new()
        .merge(routes::routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    tracing::info!(
        "Serving '{}' / '{}' on {}",
        config.sheet.spreadsheet,
        config.sheet.tab,
        config.bind_addr
    );

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// Application state
pub struct AppState {
    inventory: InventoryService,
}

impl AppState {
    fn new(inventory: InventoryService) -> Self {
        Self { inventory }
    }

    fn from_config(config: &Config) -> Self {
        let source: Arc<dyn SheetSource> = match &config.source {
            SourceConfig::Workbook { location } => {
                tracing::info!("Reading inventory from workbook {}", location);
                Arc::new(WorkbookSource::new(location.clone()))
            }
            SourceConfig::GoogleSheets {
                service_account_json,
                access_token,
            } => {
                let auth = provider_from_config(service_account_json.as_deref(), access_token.clone());
                Arc::new(GoogleSheetsSource::new(auth))
            }
        };

        Self::new(InventoryService::new(
            source,
            config.sheet.clone(),
            config.roles.clone(),
            config.cache_ttl,
        ))
    }
}
