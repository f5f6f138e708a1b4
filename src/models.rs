use chrono::NaiveDate;
use std::collections::HashMap;
use std::fmt;

/// A single typed spreadsheet cell after cleaning.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Number(f64),
    Date(NaiveDate),
    Missing,
}

impl CellValue {
    pub fn is_missing(&self) -> bool {
        matches!(self, CellValue::Missing)
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Raw text cell: blank text becomes `Missing`.
    pub fn from_text(raw: &str) -> Self {
        if raw.trim().is_empty() {
            CellValue::Missing
        } else {
            CellValue::Text(raw.to_string())
        }
    }
}

/// Plain stringification used for option lists and exact matching.
/// Missing renders as empty text.
impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Text(s) => write!(f, "{}", s),
            CellValue::Number(n) => write!(f, "{}", n),
            CellValue::Date(d) => write!(f, "{}", d.format("%d/%m/%Y")),
            CellValue::Missing => Ok(()),
        }
    }
}

pub type Record = HashMap<String, CellValue>;

/// Rows of text cells as returned by a source, header first.
pub type RawGrid = Vec<Vec<String>>;

/// Ordered records sharing one header.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CleanedTable {
    pub header: Vec<String>,
    pub records: Vec<Record>,
    /// Source columns removed because no row had a value in them.
    pub empty_columns: Vec<String>,
}

impl CleanedTable {
    pub fn new(header: Vec<String>, records: Vec<Record>) -> Self {
        Self {
            header,
            records,
            empty_columns: Vec::new(),
        }
    }

    pub fn with_empty_columns(mut self, empty_columns: Vec<String>) -> Self {
        self.empty_columns = empty_columns;
        self
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.header.iter().any(|h| h == name)
    }

    /// Whether the sheet carried `name`, even if every value was empty.
    pub fn in_source(&self, name: &str) -> bool {
        self.has_column(name) || self.empty_columns.iter().any(|c| c == name)
    }

    /// Value of `column` in `record`; absent keys read as `Missing`.
    pub fn value<'a>(record: &'a Record, column: &str) -> &'a CellValue {
        static MISSING: CellValue = CellValue::Missing;
        record.get(column).unwrap_or(&MISSING)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnTotal {
    pub column: String,
    pub value: f64,
}

/// Locale-formatted projection of a table, ready for rendering.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DisplayTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Which spreadsheet tab to read.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetRef {
    pub spreadsheet: String,
    pub spreadsheet_id: Option<String>,
    pub tab: String,
    pub range: Option<String>,
}

impl SheetRef {
    pub fn new(spreadsheet: impl Into<String>, tab: impl Into<String>) -> Self {
        Self {
            spreadsheet: spreadsheet.into(),
            spreadsheet_id: None,
            tab: tab.into(),
            range: None,
        }
    }

    /// A1 notation for the values request, e.g. `ESTOQUETotal!A:G`.
    pub fn a1_range(&self) -> String {
        match &self.range {
            Some(range) => format!("{}!{}", self.tab, range),
            None => self.tab.clone(),
        }
    }
}
