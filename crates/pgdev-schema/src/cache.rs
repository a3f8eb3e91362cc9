//! Swap-on-completion metadata cache

use std::sync::Arc;

use parking_lot::RwLock;
use pgdev_core::{PgDevError, Result, TableRecord};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::introspect::{RefreshEvent, introspect_with};
use crate::{CatalogSource, DatabaseCache};

/// The current `DatabaseCache` of one connection
///
/// Readers clone the current `Arc` under a short read lock and never see a
/// half-built cache: a refresh builds the new value off to the side and
/// swaps it in only when it succeeded. Refreshes of one cache run one at a
/// time.
pub struct MetadataCache {
    connection_name: String,
    source: Arc<dyn CatalogSource>,
    current: RwLock<Option<Arc<DatabaseCache>>>,
    refresh_lock: tokio::sync::Mutex<()>,
}

impl MetadataCache {
    pub fn new(connection_name: impl Into<String>, source: Arc<dyn CatalogSource>) -> Self {
        Self {
            connection_name: connection_name.into(),
            source,
            current: RwLock::new(None),
            refresh_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn connection_name(&self) -> &str {
        &self.connection_name
    }

    /// The published cache, if any
    pub fn current(&self) -> Option<Arc<DatabaseCache>> {
        self.current.read().clone()
    }

    /// Install a cache built elsewhere, typically restored from disk
    pub fn publish(&self, cache: DatabaseCache) -> Result<Arc<DatabaseCache>> {
        self.check_owner(&cache)?;
        let cache = Arc::new(cache);
        self.swap(cache.clone());
        Ok(cache)
    }

    /// Drop the published cache; reads go live until the next refresh
    pub fn clear(&self) {
        self.current.write().take();
    }

    /// Introspect and publish, diffing against the current cache
    ///
    /// On failure the current cache stays as it was.
    pub async fn refresh(&self) -> Result<Arc<DatabaseCache>> {
        self.refresh_with(&CancellationToken::new(), |_| {}).await
    }

    /// `refresh` with progress events and cancellation
    #[tracing::instrument(skip_all, fields(connection = %self.connection_name))]
    pub async fn refresh_with<F>(
        &self,
        cancel: &CancellationToken,
        on_event: F,
    ) -> Result<Arc<DatabaseCache>>
    where
        F: FnMut(RefreshEvent) + Send,
    {
        Ok(self.stage_refresh(cancel, on_event).await?.commit())
    }

    /// Introspect without publishing
    ///
    /// The returned `StagedCache` holds this cache's refresh lock until it is
    /// committed or dropped; dropping it discards the new cache.
    pub async fn stage_refresh<F>(
        &self,
        cancel: &CancellationToken,
        on_event: F,
    ) -> Result<StagedCache<'_>>
    where
        F: FnMut(RefreshEvent) + Send,
    {
        let guard = self.refresh_lock.lock().await;
        let previous = self.current();

        let cache = introspect_with(
            self.source.as_ref(),
            &self.connection_name,
            previous.as_deref(),
            cancel,
            on_event,
        )
        .await
        .inspect_err(|e| tracing::warn!(error = %e, "refresh failed, keeping current cache"))?;

        Ok(StagedCache {
            owner: self,
            cache: Arc::new(cache),
            _guard: guard,
        })
    }

    /// Stage a cache built elsewhere, typically restored from disk
    pub async fn stage(&self, cache: DatabaseCache) -> Result<StagedCache<'_>> {
        self.check_owner(&cache)?;
        let guard = self.refresh_lock.lock().await;
        Ok(StagedCache {
            owner: self,
            cache: Arc::new(cache),
            _guard: guard,
        })
    }

    fn check_owner(&self, cache: &DatabaseCache) -> Result<()> {
        if cache.connection_name() != self.connection_name {
            return Err(PgDevError::Configuration(format!(
                "cache for {} cannot be published to {}",
                cache.connection_name(),
                self.connection_name
            )));
        }
        Ok(())
    }

    fn swap(&self, cache: Arc<DatabaseCache>) {
        tracing::debug!(connection = %self.connection_name, schemas = cache.schemas().len(), "cache published");
        *self.current.write() = Some(cache);
    }

    /// Run a refresh on the tokio runtime
    ///
    /// The returned handle yields progress events, can cancel the refresh
    /// between schemas, and resolves to the published cache.
    pub fn spawn_refresh(self: &Arc<Self>) -> RefreshHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();

        let task = {
            let cache = self.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move {
                cache
                    .refresh_with(&cancel, move |event| {
                        // The receiver may have been dropped; the refresh still completes
                        let _ = tx.send(event);
                    })
                    .await
            })
        };

        RefreshHandle {
            events: rx,
            cancel,
            task,
        }
    }

    /// Schema names, from the cache or live before the first refresh
    pub async fn get_schemas(&self) -> Result<Vec<String>> {
        match self.current() {
            Some(cache) => Ok(cache.schema_names()),
            None => self.source.list_schemas().await,
        }
    }

    /// Tables and views of a schema; unknown schemas yield an empty list
    pub async fn get_tables(&self, schema: &str) -> Result<Vec<TableRecord>> {
        match self.current() {
            Some(cache) => Ok(cache
                .schema(schema)
                .map(|s| s.tables().to_vec())
                .unwrap_or_default()),
            None => self.source.list_tables(schema).await,
        }
    }

    pub async fn get_functions(&self, schema: &str) -> Result<Vec<String>> {
        match self.current() {
            Some(cache) => Ok(cache
                .schema(schema)
                .map(|s| s.functions().to_vec())
                .unwrap_or_default()),
            None => self.source.list_functions(schema).await,
        }
    }

    pub async fn get_procedures(&self, schema: &str) -> Result<Vec<String>> {
        match self.current() {
            Some(cache) => Ok(cache
                .schema(schema)
                .map(|s| s.procedures().to_vec())
                .unwrap_or_default()),
            None => self.source.list_procedures(schema).await,
        }
    }
}

/// A new cache that is not yet visible to readers
///
/// Other refreshes of the same `MetadataCache` wait until it is committed or
/// dropped.
pub struct StagedCache<'a> {
    owner: &'a MetadataCache,
    cache: Arc<DatabaseCache>,
    _guard: tokio::sync::MutexGuard<'a, ()>,
}

impl StagedCache<'_> {
    pub fn cache(&self) -> &Arc<DatabaseCache> {
        &self.cache
    }

    /// Make the staged cache the current one
    pub fn commit(self) -> Arc<DatabaseCache> {
        self.owner.swap(self.cache.clone());
        self.cache
    }
}

/// A refresh running in the background
pub struct RefreshHandle {
    events: mpsc::UnboundedReceiver<RefreshEvent>,
    cancel: CancellationToken,
    task: JoinHandle<Result<Arc<DatabaseCache>>>,
}

impl RefreshHandle {
    /// Next progress event; `None` once the refresh has ended
    pub async fn next_event(&mut self) -> Option<RefreshEvent> {
        self.events.recv().await
    }

    /// Ask the refresh to stop before its next schema
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Wait for the refresh to finish
    pub async fn join(self) -> Result<Arc<DatabaseCache>> {
        match self.task.await {
            Ok(result) => result,
            Err(e) if e.is_cancelled() => Err(PgDevError::Cancelled),
            Err(e) => std::panic::resume_unwind(e.into_panic()),
        }
    }

    /// Gather every event until the refresh ends, then its result
    pub async fn collect(mut self) -> (Vec<RefreshEvent>, Result<Arc<DatabaseCache>>) {
        let mut events = Vec::new();
        while let Some(event) = self.events.recv().await {
            events.push(event);
        }
        let result = self.join().await;
        (events, result)
    }
}
