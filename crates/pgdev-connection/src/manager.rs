//! Pool manager: profiles, the active profile, and one pool per profile

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use parking_lot::RwLock;
use pgdev_core::{ConnectionProfile, DatabaseDriver, PgDevError, Result};

use crate::ProfileStore;
use crate::factory::ProfileConnectionFactory;
use crate::pool::{ConnectionPool, PoolConfig, PoolStats, PooledConnection};

/// Label reported when no profile is active
pub const NO_CONNECTION_LABEL: &str = "No Connection";

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Owns the profile store and the pools built from it
///
/// Pools are created lazily on the first `connect` for a profile and at most
/// once per name: lookups go through a concurrent map and a miss is resolved
/// under a per-name async mutex, so concurrent first connects share a single
/// pool. Adding, replacing or removing a profile takes the same mutex.
pub struct PoolManager {
    driver: Arc<dyn DatabaseDriver>,
    store: ProfileStore,
    pools: DashMap<String, ConnectionPool>,
    creation_locks: DashMap<String, Arc<tokio::sync::Mutex<()>>>,
    /// Always names a stored profile when set
    active: RwLock<Option<String>>,
    pool_config: PoolConfig,
    connect_timeout: Duration,
}

impl PoolManager {
    /// Create a manager over `store`
    ///
    /// The first stored profile, if any, becomes the active one.
    pub fn new(driver: Arc<dyn DatabaseDriver>, store: ProfileStore) -> Self {
        let active = store.first_name();
        tracing::debug!(profiles = store.len(), active = ?active, driver = driver.name(), "creating pool manager");
        Self {
            driver,
            store,
            pools: DashMap::new(),
            creation_locks: DashMap::new(),
            active: RwLock::new(active),
            pool_config: PoolConfig::default(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    /// Configuration used for pools created from now on
    pub fn with_pool_config(mut self, config: PoolConfig) -> Self {
        self.pool_config = config;
        self
    }

    /// Per-connection establishment timeout handed to the driver
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn driver(&self) -> &Arc<dyn DatabaseDriver> {
        &self.driver
    }

    pub fn store(&self) -> &ProfileStore {
        &self.store
    }

    /// Borrow a connection for the named profile, building its pool if needed
    #[tracing::instrument(skip(self))]
    pub async fn connect(&self, name: &str) -> Result<PooledConnection> {
        let pool = self.pool_for(name).await?;
        pool.get().await
    }

    /// Borrow a connection for the active profile
    pub async fn connect_active(&self) -> Result<PooledConnection> {
        let name = self.active_profile_name().ok_or(PgDevError::NoActiveProfile)?;
        self.connect(&name).await
    }

    /// Get the live pool for `name`, creating it on first use
    ///
    /// A registered pool that has been closed counts as missing and is
    /// replaced.
    async fn pool_for(&self, name: &str) -> Result<ConnectionPool> {
        if let Some(pool) = self.live_pool(name) {
            return Ok(pool);
        }

        let lock = self.creation_lock(name);
        let _guard = lock.lock().await;

        if let Some(pool) = self.live_pool(name) {
            return Ok(pool);
        }
        if self
            .pools
            .remove_if(name, |_, pool| pool.is_closed())
            .is_some()
        {
            tracing::info!(profile = %name, "dropping closed pool");
        }

        let profile = match self.store.require(name) {
            Ok(profile) => profile,
            Err(e) => {
                self.release_creation_lock(name, &lock);
                return Err(e);
            }
        };
        if profile.needs_password_prompt() {
            tracing::debug!(profile = %name, "profile has no stored password");
        }

        let factory =
            ProfileConnectionFactory::new(self.driver.clone(), profile, self.connect_timeout);
        let pool = ConnectionPool::open(name, self.pool_config.clone(), factory)
            .await
            .map_err(|e| {
                tracing::error!(profile = %name, error = %e, "failed to initialize pool");
                PgDevError::pool_initialization(name, e)
            })?;

        self.pools.insert(name.to_string(), pool.clone());
        Ok(pool)
    }

    fn live_pool(&self, name: &str) -> Option<ConnectionPool> {
        self.pools
            .get(name)
            .filter(|pool| !pool.is_closed())
            .map(|pool| pool.value().clone())
    }

    fn creation_lock(&self, name: &str) -> Arc<tokio::sync::Mutex<()>> {
        self.creation_locks
            .entry(name.to_string())
            .or_default()
            .value()
            .clone()
    }

    /// Forget the creation lock of a name that has no stored profile
    ///
    /// `held` is the caller's clone. The entry stays while any other task
    /// holds or waits on the same lock; cloning happens under the map's
    /// shard lock, so the count cannot change during the check.
    fn release_creation_lock(&self, name: &str, held: &Arc<tokio::sync::Mutex<()>>) {
        if self.store.contains(name) {
            return;
        }
        self.creation_locks
            .remove_if(name, |_, lock| Arc::ptr_eq(lock, held) && Arc::strong_count(lock) == 2);
    }

    /// Insert or replace a profile and persist the store
    ///
    /// Replacing a profile closes its pool, so the next `connect` uses the
    /// new parameters. The first profile added becomes active.
    #[tracing::instrument(skip(self, profile), fields(profile = %profile.name()))]
    pub async fn add_profile(&self, profile: ConnectionProfile) -> Result<()> {
        let name = profile.name().to_string();
        if name.trim().is_empty() {
            return Err(PgDevError::Configuration(
                "profile name must not be empty".into(),
            ));
        }

        let lock = self.creation_lock(&name);
        let _guard = lock.lock().await;

        let replaced = self.store.insert(profile).is_some();
        {
            let mut active = self.active.write();
            if active.is_none() {
                tracing::info!("profile becomes the active profile");
                *active = Some(name.clone());
            }
        }

        if replaced {
            if let Some((_, pool)) = self.pools.remove(&name) {
                tracing::info!("profile replaced, closing its pool");
                pool.close().await;
            }
        }

        self.store.save().await
    }

    /// Remove a profile, close its pool and persist the store
    ///
    /// If it was the active profile another stored profile takes over, or
    /// the active profile is cleared when none is left.
    #[tracing::instrument(skip(self))]
    pub async fn remove_profile(&self, name: &str) -> Result<()> {
        let lock = self.creation_lock(name);
        let _guard = lock.lock().await;

        {
            let mut active = self.active.write();
            if self.store.remove(name).is_none() {
                drop(active);
                self.release_creation_lock(name, &lock);
                return Err(PgDevError::ProfileNotFound(name.to_string()));
            }
            if active.as_deref() == Some(name) {
                *active = self.store.first_name();
                tracing::info!(active = ?*active, "active profile reassigned");
            }
        }

        if let Some((_, pool)) = self.pools.remove(name) {
            pool.close().await;
        }
        self.release_creation_lock(name, &lock);

        self.store.save().await
    }

    /// Make `name` the active profile
    pub fn set_active_profile(&self, name: &str) -> Result<()> {
        let mut active = self.active.write();
        if !self.store.contains(name) {
            return Err(PgDevError::ProfileNotFound(name.to_string()));
        }
        tracing::info!(profile = %name, "active profile set");
        *active = Some(name.to_string());
        Ok(())
    }

    pub fn active_profile_name(&self) -> Option<String> {
        self.active.read().clone()
    }

    pub fn active_profile(&self) -> Option<ConnectionProfile> {
        let name = self.active_profile_name()?;
        self.store.get(&name)
    }

    pub fn profile(&self, name: &str) -> Option<ConnectionProfile> {
        self.store.get(name)
    }

    /// All stored profiles keyed by name
    pub fn profiles(&self) -> BTreeMap<String, ConnectionProfile> {
        self.store
            .ordered()
            .into_iter()
            .map(|p| (p.name().to_string(), p))
            .collect()
    }

    /// Check that the profile can serve a `SELECT 1`
    ///
    /// Never fails: any error is logged and reported as `false`.
    #[tracing::instrument(skip(self))]
    pub async fn test_connection(&self, name: &str) -> bool {
        let conn = match self.connect(name).await {
            Ok(conn) => conn,
            Err(e) => {
                tracing::warn!(error = %e, "connection test failed");
                return false;
            }
        };
        match conn.ping().await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "connection probe failed");
                false
            }
        }
    }

    pub async fn test_active_connection(&self) -> bool {
        match self.active_profile_name() {
            Some(name) => self.test_connection(&name).await,
            None => false,
        }
    }

    /// Close and forget the pool of one profile, keeping the profile
    #[tracing::instrument(skip(self))]
    pub async fn disconnect(&self, name: &str) {
        let lock = self.creation_lock(name);
        let _guard = lock.lock().await;
        if let Some((_, pool)) = self.pools.remove(name) {
            pool.close().await;
        }
        self.release_creation_lock(name, &lock);
    }

    /// Close every pool
    #[tracing::instrument(skip(self))]
    pub async fn disconnect_all(&self) {
        let names: Vec<String> = self.pools.iter().map(|e| e.key().clone()).collect();
        tracing::info!(pools = names.len(), "closing all pools");
        for name in names {
            self.disconnect(&name).await;
        }
    }

    /// The live pool of a profile, if one has been built
    pub fn pool(&self, name: &str) -> Option<ConnectionPool> {
        self.pools.get(name).map(|p| p.value().clone())
    }

    pub fn pool_stats(&self, name: &str) -> Option<PoolStats> {
        self.pools.get(name).map(|p| p.stats())
    }

    /// "name [host/database]" for the active profile, or "No Connection"
    pub fn connection_label(&self) -> String {
        self.active_profile()
            .map(|p| p.label())
            .unwrap_or_else(|| NO_CONNECTION_LABEL.to_string())
    }
}
