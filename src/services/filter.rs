use std::collections::BTreeSet;

use crate::config::NO_FILTER;
use crate::models::{CellValue, CleanedTable, Record};

/// Selector state for an exact-match filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Choice {
    Any,
    Exactly(String),
}

impl Choice {
    /// Reads a selector value; blank or the "no filter" option means [`Choice::Any`].
    pub fn from_selection(selection: Option<&str>) -> Self {
        match selection.map(str::trim) {
            None | Some("") => Choice::Any,
            Some(value) if value == NO_FILTER => Choice::Any,
            Some(value) => Choice::Exactly(value.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Case-insensitive substring match. A blank needle matches everything.
    Contains { column: String, needle: String },
    Equals { column: String, choice: Choice },
}

impl Predicate {
    pub fn contains(column: impl Into<String>, needle: &str) -> Self {
        Predicate::Contains {
            column: column.into(),
            needle: needle.trim().to_lowercase(),
        }
    }

    pub fn equals(column: impl Into<String>, choice: Choice) -> Self {
        Predicate::Equals {
            column: column.into(),
            choice,
        }
    }

    pub fn matches(&self, record: &Record) -> bool {
        match self {
            Predicate::Contains { needle, .. } if needle.is_empty() => true,
            Predicate::Contains { column, needle } => match CleanedTable::value(record, column) {
                CellValue::Missing => false,
                value => value.to_string().to_lowercase().contains(needle.as_str()),
            },
            Predicate::Equals { choice: Choice::Any, .. } => true,
            Predicate::Equals {
                column,
                choice: Choice::Exactly(expected),
            } => match CleanedTable::value(record, column) {
                CellValue::Missing => false,
                value => value.to_string() == *expected,
            },
        }
    }
}

/// Records matching every predicate, in their original order.
pub fn apply(table: &CleanedTable, predicates: &[Predicate]) -> CleanedTable {
    let records = table
        .records
        .iter()
        .filter(|record| predicates.iter().all(|p| p.matches(record)))
        .cloned()
        .collect();
    CleanedTable::new(table.header.clone(), records).with_empty_columns(table.empty_columns.clone())
}

/// The "no filter" option followed by the sorted distinct values of `column`.
pub fn options(table: &CleanedTable, column: &str) -> Vec<String> {
    let distinct: BTreeSet<String> = table
        .records
        .iter()
        .map(|record| CleanedTable::value(record, column))
        .filter(|value| !value.is_missing())
        .map(|value| value.to_string())
        .collect();

    std::iter::once(NO_FILTER.to_string())
        .chain(distinct)
        .collect()
}
