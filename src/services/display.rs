use crate::config::ColumnRoles;
use crate::error::SchemaMismatch;
use crate::models::{CellValue, CleanedTable, DisplayTable};
use crate::services::locale::{format_date, format_number};

/// Project the display columns, in order, and render them as text.
/// Fails only when the sheet itself has no such column; a column dropped
/// for being empty renders as blank cells.
pub fn project(table: &CleanedTable, roles: &ColumnRoles) -> Result<DisplayTable, SchemaMismatch> {
    let missing: Vec<String> = roles
        .display
        .iter()
        .filter(|column| !table.in_source(column))
        .cloned()
        .collect();
    if !missing.is_empty() {
        return Err(SchemaMismatch { missing });
    }

    let rows = table
        .records
        .iter()
        .map(|record| {
            roles
                .display
                .iter()
                .map(|column| render(column, CleanedTable::value(record, column), roles))
                .collect()
        })
        .collect();

    Ok(DisplayTable {
        columns: roles.display.clone(),
        rows,
    })
}

fn render(column: &str, value: &CellValue, roles: &ColumnRoles) -> String {
    if roles.is_numeric(column) {
        format_number(value)
    } else if roles.is_date(column) {
        format_date(value)
    } else {
        value.to_string()
    }
}
