use futures::future::BoxFuture;

use crate::error::LoadError;
use crate::models::{RawGrid, SheetRef};

pub mod google;
pub mod workbook;
#[cfg(test)]
mod fixed;

pub use google::GoogleSheetsSource;
pub use workbook::WorkbookSource;
#[cfg(test)]
pub use fixed::StaticSource;

/// A remote grid of text cells, addressed by spreadsheet and tab.
pub trait SheetSource: Send + Sync {
    /// All rows of the tab as text, header first.
    fn fetch_rows<'a>(&'a self, sheet: &'a SheetRef) -> BoxFuture<'a, Result<RawGrid, LoadError>>;
}
