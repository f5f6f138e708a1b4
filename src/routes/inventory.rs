use axum::{
    extract::{Query, State},
    http::Method,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::{
    config::{ColumnRoles, NOT_INFORMED},
    error::AppError,
    models::{CellValue, CleanedTable},
    services::{
        aggregate, display,
        filter::{self, Choice, Predicate},
        loader::fill_missing_text,
        locale::format_number,
    },
    AppState,
};

const NO_RESULTS: &str = "Nenhum resultado encontrado para os filtros aplicados.";

pub fn routes() -> Router<Arc<AppState>> {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers(Any)
        .max_age(std::time::Duration::from_secs(3600));

    Router::new()
        .route("/inventory", get(dashboard))
        .route("/inventory/options", get(filter_options))
        .layer(cors)
}

#[derive(Debug, Default, Deserialize)]
pub struct DashboardQuery {
    rastreio: Option<String>,
    tipo: Option<String>,
    produto: Option<String>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct TotalView {
    label: String,
    column: String,
    value: f64,
    formatted: String,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct FilterOptions {
    tipo: Vec<String>,
    produto: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct OptionsResponse {
    #[serde(flatten)]
    filters: FilterOptions,
    load_error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    count: usize,
    totals: Vec<TotalView>,
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
    filters: FilterOptions,
    load_error: Option<String>,
    notice: Option<String>,
}

async fn dashboard(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DashboardQuery>,
) -> Result<Json<DashboardResponse>, AppError> {
    let roles = state.inventory.roles();
    let (table, load_error) = match state.inventory.table().await {
        Ok(table) => (table, None),
        Err(e) => {
            tracing::error!("Inventory load failed: {}", e);
            (Arc::new(CleanedTable::empty()), Some(e.to_string()))
        }
    };

    let mut response = build_dashboard(&table, &query, roles)?;
    response.load_error = load_error;
    Ok(Json(response))
}

async fn filter_options(State(state): State<Arc<AppState>>) -> Json<OptionsResponse> {
    let roles = state.inventory.roles();
    let (table, load_error) = match state.inventory.table().await {
        Ok(table) => (prepare(&table, roles), None),
        Err(e) => {
            tracing::error!("Inventory load failed: {}", e);
            (CleanedTable::empty(), Some(e.to_string()))
        }
    };
    Json(OptionsResponse {
        filters: selector_options(&table, roles),
        load_error,
    })
}

/// Filter, total and format one request against the cleaned table.
/// An empty table means no data: filters are ignored and totals are zero.
pub fn build_dashboard(
    table: &CleanedTable,
    query: &DashboardQuery,
    roles: &ColumnRoles,
) -> Result<DashboardResponse, AppError> {
    let prepared = prepare(table, roles);
    let filters = selector_options(&prepared, roles);

    if prepared.is_empty() {
        return Ok(DashboardResponse {
            count: 0,
            totals: total_views(&prepared, roles),
            columns: roles.display.clone(),
            rows: Vec::new(),
            filters,
            load_error: None,
            notice: None,
        });
    }

    let predicates = predicates(query, roles);
    let filtered = filter::apply(&prepared, &predicates);
    let totals = total_views(&filtered, roles);

    let projected = display::project(&filtered, roles).map_err(|e| {
        tracing::warn!("Display projection failed: {}", e);
        e
    })?;

    Ok(DashboardResponse {
        count: filtered.len(),
        totals,
        columns: projected.columns,
        rows: projected.rows,
        filters,
        load_error: None,
        notice: filtered.is_empty().then(|| NO_RESULTS.to_string()),
    })
}

fn prepare(table: &CleanedTable, roles: &ColumnRoles) -> CleanedTable {
    let mut prepared = table.clone();
    fill_missing_text(&mut prepared, &roles.filter_keys, NOT_INFORMED);
    prepared
}

fn predicates(query: &DashboardQuery, roles: &ColumnRoles) -> Vec<Predicate> {
    let selections = [query.tipo.as_deref(), query.produto.as_deref()];
    let mut predicates = vec![Predicate::contains(
        roles.search_column.clone(),
        query.rastreio.as_deref().unwrap_or_default(),
    )];
    predicates.extend(
        roles
            .selector_columns
            .iter()
            .zip(selections)
            .map(|(column, selection)| Predicate::equals(column.clone(), Choice::from_selection(selection))),
    );
    predicates
}

fn selector_options(table: &CleanedTable, roles: &ColumnRoles) -> FilterOptions {
    let mut lists = roles
        .selector_columns
        .iter()
        .map(|column| filter::options(table, column));
    FilterOptions {
        tipo: lists.next().unwrap_or_default(),
        produto: lists.next().unwrap_or_default(),
    }
}

fn total_views(table: &CleanedTable, roles: &ColumnRoles) -> Vec<TotalView> {
    let columns: Vec<String> = roles.totals.iter().map(|t| t.column.clone()).collect();
    aggregate::totals(table, &columns)
        .into_iter()
        .zip(&roles.totals)
        .map(|(total, spec)| TotalView {
            label: spec.label.clone(),
            formatted: format_number(&CellValue::Number(total.value)),
            column: total.column,
            value: total.value,
        })
        .collect()
}
