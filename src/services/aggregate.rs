use crate::models::{CleanedTable, ColumnTotal};

/// Sum of every numeric column; missing cells count as zero.
pub fn totals(table: &CleanedTable, numeric_columns: &[String]) -> Vec<ColumnTotal> {
    numeric_columns
        .iter()
        .map(|column| ColumnTotal {
            column: column.clone(),
            value: table
                .records
                .iter()
                .filter_map(|record| CleanedTable::value(record, column).as_number())
                .sum(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ColumnRoles;
    use crate::models::RawGrid;
    use crate::services::filter::{apply, Predicate};
    use crate::services::loader::clean_grid;
    use crate::services::locale::{format_number, parse_number};
    use crate::models::CellValue;

    fn numeric() -> Vec<String> {
        ColumnRoles::default().numeric
    }

    fn grid(rows: &[[&str; 3]]) -> RawGrid {
        rows.iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect()
    }

    #[test]
    fn empty_input_totals_zero() {
        let result = totals(&CleanedTable::empty(), &numeric());
        assert_eq!(result.len(), 2);
        assert!(result.iter().all(|t| t.value == 0.0));
    }

    #[test]
    fn missing_cells_contribute_nothing() {
        let raw = grid(&[
            ["RASTREIO", "KG", "CX"],
            ["A1", "1.250,5", "10"],
            ["A2", "", "3"],
            ["A3", "n/d", ""],
        ]);
        let result = totals(&clean_grid(raw, &ColumnRoles::default()), &numeric());
        assert_eq!(result[0], ColumnTotal { column: "KG".to_string(), value: 1250.5 });
        assert_eq!(result[1], ColumnTotal { column: "CX".to_string(), value: 13.0 });
    }

    #[test]
    fn totals_match_naive_sum_of_filtered_rows() {
        let cells = [
            ["RASTREIO", "KG", "CX"],
            ["ABC1", "1.000,25", "4"],
            ["XYZ", "12", "1"],
            ["abc2", "3,5", ""],
            ["ABC3", "", "2"],
        ];
        let table = clean_grid(grid(&cells), &ColumnRoles::default());
        let filtered = apply(&table, &[Predicate::contains("RASTREIO", "abc")]);

        let naive = |col: usize| -> f64 {
            cells[1..]
                .iter()
                .filter(|row| row[0].to_lowercase().contains("abc"))
                .filter_map(|row| parse_number(row[col]).as_number())
                .sum()
        };

        let result = totals(&filtered, &numeric());
        assert_eq!(result[0].value, naive(1));
        assert_eq!(result[1].value, naive(2));
        assert_eq!(format_number(&CellValue::Number(result[0].value)), "1.004");
    }

    #[test]
    fn absent_column_totals_zero() {
        let raw = grid(&[["RASTREIO", "KG", "OBS"], ["A1", "5", "x"], ["A2", "6", ""]]);
        let result = totals(&clean_grid(raw, &ColumnRoles::default()), &numeric());
        assert_eq!(result[0].value, 11.0);
        assert_eq!(result[1].value, 0.0);
    }
}
