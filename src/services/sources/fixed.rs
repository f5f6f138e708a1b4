use futures::future::{BoxFuture, FutureExt};
use std::sync::atomic::{AtomicUsize, Ordering};

use super::SheetSource;
use crate::error::LoadError;
use crate::models::{RawGrid, SheetRef};

/// Fixed rows held in memory; counts how often it was asked.
pub struct StaticSource {
    result: Result<RawGrid, LoadError>,
    fetches: AtomicUsize,
}

impl StaticSource {
    pub fn new(rows: RawGrid) -> Self {
        Self {
            result: Ok(rows),
            fetches: AtomicUsize::new(0),
        }
    }

    pub fn failing(error: LoadError) -> Self {
        Self {
            result: Err(error),
            fetches: AtomicUsize::new(0),
        }
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

impl SheetSource for StaticSource {
    fn fetch_rows<'a>(&'a self, _sheet: &'a SheetRef) -> BoxFuture<'a, Result<RawGrid, LoadError>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        futures::future::ready(self.result.clone()).boxed()
    }
}
