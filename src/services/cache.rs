use parking_lot::RwLock;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::config::ColumnRoles;
use crate::error::LoadError;
use crate::models::{CleanedTable, SheetRef};
use crate::services::loader::load_table;
use crate::services::sources::SheetSource;

#[derive(Debug, Clone)]
struct CacheSlot {
    table: Arc<CleanedTable>,
    populated_at: Instant,
}

impl CacheSlot {
    fn is_expired(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.populated_at) >= ttl
    }
}

/// Single process-wide slot holding the last cleaned table.
/// Expiry is purely time based; racing writers simply overwrite each other.
#[derive(Debug)]
pub struct TableCache {
    ttl: Duration,
    slot: RwLock<Option<CacheSlot>>,
}

impl TableCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            slot: RwLock::new(None),
        }
    }

    pub fn get(&self, now: Instant) -> Option<Arc<CleanedTable>> {
        self.slot
            .read()
            .as_ref()
            .filter(|slot| !slot.is_expired(now, self.ttl))
            .map(|slot| Arc::clone(&slot.table))
    }

    pub fn store(&self, table: Arc<CleanedTable>, now: Instant) {
        *self.slot.write() = Some(CacheSlot {
            table,
            populated_at: now,
        });
    }
}

/// Loads the inventory tab through the cache.
pub struct InventoryService {
    source: Arc<dyn SheetSource>,
    sheet: SheetRef,
    roles: ColumnRoles,
    cache: TableCache,
}

impl InventoryService {
    pub fn new(source: Arc<dyn SheetSource>, sheet: SheetRef, roles: ColumnRoles, ttl: Duration) -> Self {
        Self {
            source,
            sheet,
            roles,
            cache: TableCache::new(ttl),
        }
    }

    pub fn roles(&self) -> &ColumnRoles {
        &self.roles
    }

    pub async fn table(&self) -> Result<Arc<CleanedTable>, LoadError> {
        self.table_at(Instant::now()).await
    }

    /// Failed loads are not cached, the next request tries again.
    pub async fn table_at(&self, now: Instant) -> Result<Arc<CleanedTable>, LoadError> {
        if let Some(table) = self.cache.get(now) {
            debug!("Serving cached table ({} rows)", table.len());
            return Ok(table);
        }

        let table = Arc::new(load_table(self.source.as_ref(), &self.sheet, &self.roles).await?);
        self.cache.store(Arc::clone(&table), now);
        info!("Cached {} rows for {:?}", table.len(), self.cache.ttl);
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::sources::StaticSource;

    fn rows() -> Vec<Vec<String>> {
        vec![
            vec!["RASTREIO".to_string(), "KG".to_string()],
            vec!["A1".to_string(), "1.000".to_string()],
        ]
    }

    fn service(source: Arc<StaticSource>, ttl: Duration) -> InventoryService {
        InventoryService::new(
            source,
            SheetRef::new("Estoque", "ESTOQUETotal"),
            ColumnRoles::default(),
            ttl,
        )
    }

    #[test]
    fn slot_expires_after_ttl() {
        let start = Instant::now();
        let slot = CacheSlot {
            table: Arc::new(CleanedTable::empty()),
            populated_at: start,
        };
        let ttl = Duration::from_secs(600);
        assert!(!slot.is_expired(start, ttl));
        assert!(!slot.is_expired(start + Duration::from_secs(599), ttl));
        assert!(slot.is_expired(start + ttl, ttl));
    }

    #[test]
    fn empty_cache_returns_nothing() {
        let cache = TableCache::new(Duration::from_secs(1));
        assert!(cache.get(Instant::now()).is_none());
    }

    #[tokio::test]
    async fn reuses_table_within_window() {
        let source = Arc::new(StaticSource::new(rows()));
        let service = service(source.clone(), Duration::from_secs(600));
        let start = Instant::now();

        let first = service.table_at(start).await.unwrap();
        let second = service.table_at(start + Duration::from_secs(300)).await.unwrap();

        assert_eq!(source.fetch_count(), 1);
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn reloads_after_expiry() {
        let source = Arc::new(StaticSource::new(rows()));
        let service = service(source.clone(), Duration::from_secs(600));
        let start = Instant::now();

        service.table_at(start).await.unwrap();
        service.table_at(start + Duration::from_secs(601)).await.unwrap();

        assert_eq!(source.fetch_count(), 2);
    }

    #[tokio::test]
    async fn failures_are_not_cached() {
        let source = Arc::new(StaticSource::failing(LoadError::SourceNotFound("tab".to_string())));
        let service = service(source.clone(), Duration::from_secs(600));
        let start = Instant::now();

        assert!(service.table_at(start).await.is_err());
        assert!(service.table_at(start).await.is_err());
        assert_eq!(source.fetch_count(), 2);
    }
}
