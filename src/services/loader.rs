use std::time::Instant;
use tracing::{debug, info, warn};

use crate::config::ColumnRoles;
use crate::error::LoadError;
use crate::models::{CellValue, CleanedTable, RawGrid, Record, SheetRef};
use crate::services::locale::{parse_date, parse_number};
use crate::services::sources::SheetSource;

/// Fetch the tab and clean it. Every failure comes back as a [`LoadError`];
/// transport errors never leak past this point.
pub async fn load_table(
    source: &dyn SheetSource,
    sheet: &SheetRef,
    roles: &ColumnRoles,
) -> Result<CleanedTable, LoadError> {
    let start = Instant::now();
    info!("Loading tab '{}' from '{}'", sheet.tab, sheet.spreadsheet);

    let grid = source.fetch_rows(sheet).await.map_err(|e| {
        warn!("Load of '{}' failed: {}", sheet.a1_range(), e);
        e
    })?;

    if grid.is_empty() {
        warn!("Tab '{}' came back without a header row", sheet.tab);
        return Err(LoadError::EmptySource(sheet.tab.clone()));
    }

    let table = clean_grid(grid, roles);
    info!(
        "Loaded {} rows x {} columns in {:?}",
        table.len(),
        table.header.len(),
        start.elapsed()
    );
    Ok(table)
}

/// Header extraction, empty row/column removal, then typed parsing of the
/// declared numeric and date columns. Empty rows go before parsing.
pub fn clean_grid(grid: RawGrid, roles: &ColumnRoles) -> CleanedTable {
    let mut rows = grid.into_iter();
    let header: Vec<String> = match rows.next() {
        Some(header) => header.into_iter().map(|h| h.trim().to_string()).collect(),
        None => return CleanedTable::empty(),
    };
    let width = header.len();

    // Pad short rows, cut long ones
    let body: Vec<Vec<String>> = rows
        .map(|mut row| {
            row.resize(width, String::new());
            row
        })
        .filter(|row| !row.iter().all(|cell| is_blank(cell)))
        .collect();

    let kept: Vec<usize> = (0..width)
        .filter(|&idx| body.iter().any(|row| !is_blank(&row[idx])))
        .collect();
    let empty_columns: Vec<String> = (0..width)
        .filter(|idx| !kept.contains(idx))
        .map(|idx| header[idx].clone())
        .collect();
    if !empty_columns.is_empty() {
        debug!("Dropping empty columns: {:?}", empty_columns);
    }

    let records: Vec<Record> = body
        .iter()
        .map(|row| {
            kept.iter()
                .map(|&idx| {
                    let name = &header[idx];
                    (name.clone(), parse_cell(name, &row[idx], roles))
                })
                .collect()
        })
        .collect();

    let header = kept.iter().map(|&idx| header[idx].clone()).collect();
    CleanedTable::new(header, records).with_empty_columns(empty_columns)
}

fn parse_cell(column: &str, raw: &str, roles: &ColumnRoles) -> CellValue {
    if roles.is_numeric(column) {
        parse_number(raw)
    } else if roles.is_date(column) {
        parse_date(raw)
    } else {
        CellValue::from_text(raw)
    }
}

fn is_blank(cell: &str) -> bool {
    cell.trim().is_empty()
}

/// Replace missing values in the filter-key text columns with `sentinel`.
/// A key column dropped for being empty comes back filled entirely.
pub fn fill_missing_text(table: &mut CleanedTable, columns: &[String], sentinel: &str) {
    let present: Vec<&String> = columns.iter().filter(|c| table.in_source(c)).collect();
    for column in &present {
        if let Some(pos) = table.empty_columns.iter().position(|c| c == *column) {
            table.empty_columns.remove(pos);
            table.header.push((*column).clone());
        }
    }
    for record in table.records.iter_mut() {
        for column in &present {
            let slot = record
                .entry((*column).clone())
                .or_insert(CellValue::Missing);
            if slot.is_missing() {
                *slot = CellValue::Text(sentinel.to_string());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::sources::StaticSource;
    use chrono::NaiveDate;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    fn inventory_header() -> Vec<String> {
        row(&["TIPO", "RASTREIO", "NOTA FISCAL", "MATÉRIA-PRIMA", "PRODUTO", "KG", "CX"])
    }

    #[test]
    fn parses_declared_numeric_columns() {
        let grid = vec![
            inventory_header(),
            row(&["LOTE", "ABC123", "NF1", "Milho", "Ração X", "1.250,5", "10"]),
        ];
        let table = clean_grid(grid, &ColumnRoles::default());

        assert_eq!(table.len(), 1);
        let record = &table.records[0];
        assert_eq!(record["KG"], CellValue::Number(1250.5));
        assert_eq!(record["CX"], CellValue::Number(10.0));
        assert_eq!(record["RASTREIO"], CellValue::Text("ABC123".to_string()));
    }

    #[test]
    fn drops_empty_rows_and_columns() {
        let grid = vec![
            row(&["TIPO", "RASTREIO", "OBS", "KG"]),
            row(&["LOTE", "A1", "", "1"]),
            row(&["", " ", "", ""]),
            row(&["PALETE", "B2", "", "2"]),
        ];
        let table = clean_grid(grid, &ColumnRoles::default());

        assert_eq!(table.header, vec!["TIPO", "RASTREIO", "KG"]);
        assert_eq!(table.len(), 2);
        assert!(table.records.iter().all(|r| !r.contains_key("OBS")));
        assert_eq!(table.empty_columns, vec!["OBS"]);
        assert!(table.in_source("OBS"));
        assert!(!table.has_column("OBS"));
    }

    #[test]
    fn short_rows_are_padded_with_missing() {
        let grid = vec![
            row(&["TIPO", "RASTREIO", "KG"]),
            row(&["LOTE"]),
            row(&["LOTE", "A1", "5", "extra"]),
        ];
        let table = clean_grid(grid, &ColumnRoles::default());

        assert_eq!(table.len(), 2);
        assert_eq!(table.records[0]["RASTREIO"], CellValue::Missing);
        assert_eq!(table.records[0]["KG"], CellValue::Missing);
        assert_eq!(table.records[1]["KG"], CellValue::Number(5.0));
    }

    #[test]
    fn malformed_numbers_degrade_per_cell() {
        let grid = vec![
            row(&["RASTREIO", "KG"]),
            row(&["A1", "n/d"]),
            row(&["A2", "2,5"]),
        ];
        let table = clean_grid(grid, &ColumnRoles::default());

        assert_eq!(table.records[0]["KG"], CellValue::Missing);
        assert_eq!(table.records[1]["KG"], CellValue::Number(2.5));
    }

    #[test]
    fn declared_date_columns_become_dates() {
        let mut roles = ColumnRoles::default();
        roles.date.push("VALIDADE".to_string());
        let grid = vec![
            row(&["RASTREIO", "VALIDADE"]),
            row(&["A1", "05/03/2024"]),
            row(&["A2", "sem data"]),
        ];
        let table = clean_grid(grid, &roles);

        assert_eq!(
            table.records[0]["VALIDADE"],
            CellValue::Date(NaiveDate::from_ymd_opt(2024, 3, 5).unwrap())
        );
        assert_eq!(table.records[1]["VALIDADE"], CellValue::Missing);
    }

    #[test]
    fn header_only_grid_is_an_empty_table() {
        let table = clean_grid(vec![inventory_header()], &ColumnRoles::default());
        assert!(table.is_empty());
        assert!(table.header.is_empty());
    }

    #[test]
    fn fills_missing_filter_keys_with_sentinel() {
        let grid = vec![
            row(&["TIPO", "PRODUTO", "KG"]),
            row(&["", "Ração X", "1"]),
            row(&["LOTE", "", ""]),
        ];
        let mut table = clean_grid(grid, &ColumnRoles::default());
        fill_missing_text(&mut table, &ColumnRoles::default().filter_keys, "Não Informado");

        assert_eq!(table.records[0]["TIPO"], CellValue::Text("Não Informado".to_string()));
        assert_eq!(table.records[1]["PRODUTO"], CellValue::Text("Não Informado".to_string()));
        // numeric columns are left alone
        assert_eq!(table.records[1]["KG"], CellValue::Missing);
        // RASTREIO is absent from the header, so nothing is invented for it
        assert!(!table.records[0].contains_key("RASTREIO"));
    }

    #[test]
    fn all_empty_filter_key_is_filled_back() {
        let grid = vec![
            row(&["TIPO", "RASTREIO", "KG"]),
            row(&["", "A1", "1"]),
            row(&["", "A2", "2"]),
        ];
        let mut table = clean_grid(grid, &ColumnRoles::default());
        assert_eq!(table.empty_columns, vec!["TIPO"]);

        fill_missing_text(&mut table, &ColumnRoles::default().filter_keys, "Não Informado");
        assert!(table.has_column("TIPO"));
        assert!(table.empty_columns.is_empty());
        assert!(table
            .records
            .iter()
            .all(|r| r["TIPO"] == CellValue::Text("Não Informado".to_string())));
    }

    #[test]
    fn load_table_reports_empty_source() {
        let source = StaticSource::new(Vec::new());
        let sheet = SheetRef::new("Estoque", "ESTOQUETotal");
        let result = tokio_test::block_on(load_table(&source, &sheet, &ColumnRoles::default()));
        assert_eq!(result, Err(LoadError::EmptySource("ESTOQUETotal".to_string())));
    }

    #[test]
    fn load_table_passes_source_errors_through() {
        let source = StaticSource::failing(LoadError::Authentication("token rejected".to_string()));
        let sheet = SheetRef::new("Estoque", "ESTOQUETotal");
        let result = tokio_test::block_on(load_table(&source, &sheet, &ColumnRoles::default()));
        assert!(matches!(result, Err(LoadError::Authentication(_))));
    }

    #[test]
    fn load_table_cleans_fetched_rows() {
        let source = StaticSource::new(vec![
            inventory_header(),
            row(&["LOTE", "ABC123", "NF1", "Milho", "Ração X", "1.250,5", "10"]),
            row(&["", "", "", "", "", "", ""]),
        ]);
        let sheet = SheetRef::new("Estoque", "ESTOQUETotal");
        let table = tokio_test::block_on(load_table(&source, &sheet, &ColumnRoles::default())).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.header.len(), 7);
    }
}
