//! Connection pool implementation

use std::collections::VecDeque;
use std::ops::Deref;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use pgdev_core::{Connection, PgDevError, Result};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::time::Instant;
use uuid::Uuid;

use super::config::PoolConfig;
use super::stats::PoolStats;

/// Factory trait for creating new connections
#[async_trait]
pub trait ConnectionFactory: Send + Sync + 'static {
    /// Create a new connection
    async fn create(&self) -> Result<Arc<dyn Connection>>;

    /// Validate that an idle connection is still usable before handing it out
    async fn validate(&self, conn: &dyn Connection) -> bool {
        !conn.is_closed()
    }
}

#[async_trait]
impl<T: ConnectionFactory> ConnectionFactory for Arc<T> {
    async fn create(&self) -> Result<Arc<dyn Connection>> {
        (**self).create().await
    }

    async fn validate(&self, conn: &dyn Connection) -> bool {
        (**self).validate(conn).await
    }
}

struct IdleConnection {
    connection: Arc<dyn Connection>,
    returned_at: Instant,
}

impl IdleConnection {
    fn new(connection: Arc<dyn Connection>) -> Self {
        Self {
            connection,
            returned_at: Instant::now(),
        }
    }
}

struct PoolInner {
    id: Uuid,
    name: String,
    config: PoolConfig,
    factory: Arc<dyn ConnectionFactory>,
    idle: Mutex<VecDeque<IdleConnection>>,
    /// Bounds idle + borrowed connections; closed together with the pool
    semaphore: Arc<Semaphore>,
    active_count: AtomicUsize,
    waiting_count: AtomicUsize,
    closed: AtomicBool,
}

impl PoolInner {
    fn return_connection(&self, connection: Arc<dyn Connection>) {
        self.active_count.fetch_sub(1, Ordering::SeqCst);

        if self.closed.load(Ordering::SeqCst) {
            close_detached(connection);
            return;
        }
        if connection.is_closed() {
            return;
        }

        self.idle.lock().push_back(IdleConnection::new(connection));
    }
}

/// Close a connection from synchronous code, if a runtime is available
fn close_detached(connection: Arc<dyn Connection>) {
    if let Ok(handle) = tokio::runtime::Handle::try_current() {
        handle.spawn(async move {
            if let Err(e) = connection.close().await {
                tracing::debug!(error = %e, "failed to close returned connection");
            }
        });
    }
}

/// A bounded pool of connections for one profile
///
/// Cloning is cheap and every clone refers to the same pool; `id()` tells
/// whether two handles share one. Once `close` has been called the pool
/// refuses further borrows and connections still out are closed when they
/// come back.
#[derive(Clone)]
pub struct ConnectionPool {
    inner: Arc<PoolInner>,
}

impl ConnectionPool {
    /// Build a pool and open its minimum number of connections
    ///
    /// Fails with the factory's error if any warm-up connection cannot be
    /// created; connections opened before the failure are closed again.
    #[tracing::instrument(skip(config, factory), fields(min = config.min_size(), max = config.max_size()))]
    pub async fn open<F: ConnectionFactory>(
        name: &str,
        config: PoolConfig,
        factory: F,
    ) -> Result<Self> {
        let factory: Arc<dyn ConnectionFactory> = Arc::new(factory);

        let mut warm = VecDeque::with_capacity(config.min_size());
        for _ in 0..config.min_size() {
            match factory.create().await {
                Ok(conn) => warm.push_back(IdleConnection::new(conn)),
                Err(e) => {
                    tracing::warn!(error = %e, opened = warm.len(), "pool warm-up failed");
                    for idle in warm {
                        let _ = idle.connection.close().await;
                    }
                    return Err(e);
                }
            }
        }

        let pool = Self {
            inner: Arc::new(PoolInner {
                id: Uuid::new_v4(),
                name: name.to_string(),
                semaphore: Arc::new(Semaphore::new(config.max_size())),
                config,
                factory,
                idle: Mutex::new(warm),
                active_count: AtomicUsize::new(0),
                waiting_count: AtomicUsize::new(0),
                closed: AtomicBool::new(false),
            }),
        };
        tracing::info!(pool_id = %pool.id(), "connection pool opened");
        Ok(pool)
    }

    /// Unique id of this pool
    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    /// Name of the profile the pool serves
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Borrow a connection
    ///
    /// Reuses an idle connection when one validates, otherwise opens a new
    /// one if the pool is below `max_size`, otherwise waits for a return.
    /// Gives up with `Timeout` after the acquire timeout, and fails with
    /// `PoolClosed` once the pool is closed.
    pub async fn get(&self) -> Result<PooledConnection> {
        if self.is_closed() {
            return Err(PgDevError::PoolClosed(self.inner.name.clone()));
        }

        let timeout = self.inner.config.acquire_timeout();
        self.inner.waiting_count.fetch_add(1, Ordering::SeqCst);
        let result = tokio::time::timeout(timeout, self.acquire()).await;
        self.inner.waiting_count.fetch_sub(1, Ordering::SeqCst);

        match result {
            Ok(conn) => conn,
            Err(_) => {
                tracing::warn!(pool = %self.inner.name, ?timeout, "timed out waiting for connection");
                Err(PgDevError::Timeout(format!(
                    "Timed out waiting for connection (timeout: {:?})",
                    timeout
                )))
            }
        }
    }

    async fn acquire(&self) -> Result<PooledConnection> {
        let permit = self
            .inner
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| PgDevError::PoolClosed(self.inner.name.clone()))?;

        let connection = match self.try_get_idle().await {
            Some(conn) => conn,
            None => self.inner.factory.create().await?,
        };

        self.inner.active_count.fetch_add(1, Ordering::SeqCst);
        Ok(PooledConnection {
            connection: Some(connection),
            pool: self.inner.clone(),
            _permit: permit,
        })
    }

    /// Pop idle connections until one passes the idle timeout and validation
    async fn try_get_idle(&self) -> Option<Arc<dyn Connection>> {
        loop {
            let idle = { self.inner.idle.lock().pop_front() }?;

            if idle.returned_at.elapsed() > self.inner.config.idle_timeout() {
                let _ = idle.connection.close().await;
                continue;
            }
            if !self.inner.factory.validate(&*idle.connection).await {
                let _ = idle.connection.close().await;
                continue;
            }
            return Some(idle.connection);
        }
    }

    /// Get current pool statistics
    pub fn stats(&self) -> PoolStats {
        PoolStats::new(
            self.inner.idle.lock().len(),
            self.inner.active_count.load(Ordering::SeqCst),
            self.inner.waiting_count.load(Ordering::SeqCst),
            self.is_closed(),
        )
    }

    pub fn config(&self) -> &PoolConfig {
        &self.inner.config
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    /// Close the pool
    ///
    /// Idle connections are closed right away; borrowed ones when they are
    /// returned. Calling this more than once is a no-op.
    pub async fn close(&self) {
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.inner.semaphore.close();

        let connections: Vec<_> = { self.inner.idle.lock().drain(..).collect() };
        tracing::info!(
            pool = %self.inner.name,
            pool_id = %self.inner.id,
            idle = connections.len(),
            "closing connection pool"
        );
        for idle in connections {
            if let Err(e) = idle.connection.close().await {
                tracing::debug!(error = %e, "failed to close idle connection");
            }
        }
    }
}

impl std::fmt::Debug for ConnectionPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionPool")
            .field("id", &self.inner.id)
            .field("name", &self.inner.name)
            .field("stats", &self.stats())
            .finish()
    }
}

/// A connection borrowed from the pool
///
/// When dropped, the connection is returned to the pool it came from.
pub struct PooledConnection {
    connection: Option<Arc<dyn Connection>>,
    pool: Arc<PoolInner>,
    _permit: OwnedSemaphorePermit,
}

impl PooledConnection {
    /// Get the underlying connection as an Arc
    pub fn inner(&self) -> &Arc<dyn Connection> {
        self.connection.as_ref().expect("connection taken")
    }

    /// Id of the pool this connection belongs to
    pub fn pool_id(&self) -> Uuid {
        self.pool.id
    }
}

impl std::fmt::Debug for PooledConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PooledConnection")
            .field("pool", &self.pool.name)
            .field("pool_id", &self.pool.id)
            .finish()
    }
}

impl Deref for PooledConnection {
    type Target = dyn Connection;

    fn deref(&self) -> &Self::Target {
        self.connection.as_ref().expect("connection taken").as_ref()
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        if let Some(conn) = self.connection.take() {
            self.pool.return_connection(conn);
        }
    }
}
