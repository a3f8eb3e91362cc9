//! Refresh orchestration: introspect, publish, rebuild the index, persist

use std::sync::Arc;

use dashmap::DashMap;
use pgdev_connection::PoolManager;
use pgdev_core::{PgDevError, Result};
use pgdev_index::{ObjectKind, SearchIndex, SearchRecord};
use pgdev_schema::{CatalogIntrospector, DatabaseCache, MetadataCache, RefreshEvent};
use tokio_util::sync::CancellationToken;

use crate::CacheStore;

/// Every searchable object of a cache: schemas, then per schema its tables
/// and views, functions and procedures
pub fn records_from_cache(cache: &DatabaseCache) -> Vec<SearchRecord> {
    let mut records = Vec::new();
    for (name, snapshot) in cache.schemas() {
        records.push(SearchRecord::schema(name.as_str()));
        for table in snapshot.tables() {
            records.push(SearchRecord::new(
                table.name.as_str(),
                ObjectKind::from(table.kind),
                name.as_str(),
            ));
        }
        for function in snapshot.functions() {
            records.push(SearchRecord::new(
                function.as_str(),
                ObjectKind::Function,
                name.as_str(),
            ));
        }
        for procedure in snapshot.procedures() {
            records.push(SearchRecord::new(
                procedure.as_str(),
                ObjectKind::Procedure,
                name.as_str(),
            ));
        }
    }
    records
}

/// Ties the per-connection metadata caches to the search index
///
/// There is one index; it always reflects the cache that was published
/// last, whichever connection it belongs to. A new cache is published only
/// after the index has been rebuilt from it, and publishing plus rebuilding
/// runs for one connection at a time.
pub struct CatalogService {
    manager: Arc<PoolManager>,
    index: Arc<SearchIndex>,
    store: Option<CacheStore>,
    caches: DashMap<String, Arc<MetadataCache>>,
    publish_lock: tokio::sync::Mutex<()>,
}

impl CatalogService {
    pub fn new(manager: Arc<PoolManager>, index: Arc<SearchIndex>) -> Self {
        Self {
            manager,
            index,
            store: None,
            caches: DashMap::new(),
            publish_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Persist every refreshed cache to `store`
    pub fn with_cache_store(mut self, store: CacheStore) -> Self {
        self.store = Some(store);
        self
    }

    pub fn manager(&self) -> &Arc<PoolManager> {
        &self.manager
    }

    pub fn index(&self) -> &Arc<SearchIndex> {
        &self.index
    }

    /// The metadata cache of a profile, created on first use
    pub fn metadata_cache(&self, name: &str) -> Arc<MetadataCache> {
        self.caches
            .entry(name.to_string())
            .or_insert_with(|| {
                let source = CatalogIntrospector::new(self.manager.clone(), name);
                Arc::new(MetadataCache::new(name, Arc::new(source)))
            })
            .clone()
    }

    fn active_name(&self) -> Result<String> {
        self.manager
            .active_profile_name()
            .ok_or(PgDevError::NoActiveProfile)
    }

    pub async fn refresh_active(&self) -> Result<Arc<DatabaseCache>> {
        let name = self.active_name()?;
        self.refresh(&name).await
    }

    pub async fn refresh(&self, name: &str) -> Result<Arc<DatabaseCache>> {
        self.refresh_with(name, &CancellationToken::new(), |_| {})
            .await
    }

    /// Refresh a profile's cache, then rebuild the index from it
    ///
    /// A failed or cancelled refresh, or a failed index rebuild, leaves both
    /// the cache and the index as they were. Persisting is best effort.
    #[tracing::instrument(skip(self, cancel, on_event))]
    pub async fn refresh_with<F>(
        &self,
        name: &str,
        cancel: &CancellationToken,
        on_event: F,
    ) -> Result<Arc<DatabaseCache>>
    where
        F: FnMut(RefreshEvent) + Send,
    {
        self.manager.store().require(name)?;
        let metadata = self.metadata_cache(name);
        let staged = metadata.stage_refresh(cancel, on_event).await?;

        let cache = {
            let _publish = self.publish_lock.lock().await;
            self.rebuild_index(staged.cache())
                .await
                .inspect_err(|e| tracing::warn!(error = %e, "index rebuild failed, keeping current cache"))?;
            staged.commit()
        };

        if let Some(store) = &self.store {
            if let Err(e) = store.save(&cache).await {
                tracing::warn!(error = %e, "failed to persist metadata cache");
            }
        }
        Ok(cache)
    }

    /// Publish the stored cache of a profile and index it
    ///
    /// Returns `None` when nothing is stored (or no store is configured).
    #[tracing::instrument(skip(self))]
    pub async fn restore(&self, name: &str) -> Result<Option<Arc<DatabaseCache>>> {
        let Some(store) = &self.store else {
            return Ok(None);
        };
        let Some(stored) = store.load(name).await? else {
            tracing::debug!("no stored cache");
            return Ok(None);
        };
        let metadata = self.metadata_cache(name);
        let staged = metadata.stage(stored).await?;
        let cache = {
            let _publish = self.publish_lock.lock().await;
            self.rebuild_index(staged.cache()).await?;
            staged.commit()
        };
        tracing::info!(schemas = cache.schemas().len(), captured_at = %cache.captured_at(), "cache restored");
        Ok(Some(cache))
    }

    /// Drop a profile's cache from memory and disk
    pub async fn forget(&self, name: &str) -> Result<()> {
        self.caches.remove(name);
        if let Some(store) = &self.store {
            store.remove(name).await?;
        }
        Ok(())
    }

    async fn rebuild_index(&self, cache: &DatabaseCache) -> Result<()> {
        let records = records_from_cache(cache);
        let index = self.index.clone();
        tokio::task::spawn_blocking(move || index.rebuild(&records))
            .await
            .map_err(|e| PgDevError::Index(format!("index rebuild task failed: {e}")))?
    }

    /// Search the index; see [`SearchIndex::search`]
    pub async fn search(&self, query: &str) -> Result<Vec<SearchRecord>> {
        let index = self.index.clone();
        let query = query.to_string();
        tokio::task::spawn_blocking(move || index.search(&query))
            .await
            .map_err(|e| PgDevError::Index(format!("search task failed: {e}")))?
    }
}
