//! Mock connection factory

use async_trait::async_trait;
use parking_lot::Mutex;
use pgdev_core::{
    CatalogReflection, ColumnInfo, Connection, ConnectionProfile, DatabaseDriver, IndexInfo,
    PgDevError, QueryResult, Result, TableRecord,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use crate::MockDatabase;

/// Connection to a `MockDatabase`
pub struct MockConnection {
    id: usize,
    profile_name: String,
    database: MockDatabase,
    closed: AtomicBool,
}

impl MockConnection {
    pub fn id(&self) -> usize {
        self.id
    }

    pub fn profile_name(&self) -> &str {
        &self.profile_name
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            Err(PgDevError::Connection("connection is closed".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Connection for MockConnection {
    fn driver_name(&self) -> &str {
        "mock"
    }

    async fn execute(&self, sql: &str) -> Result<QueryResult> {
        self.ensure_open()?;
        self.database.execute(sql)
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn as_catalog(&self) -> Option<&dyn CatalogReflection> {
        Some(self)
    }
}

#[async_trait]
impl CatalogReflection for MockConnection {
    async fn list_schemas(&self) -> Result<Vec<String>> {
        self.ensure_open()?;
        self.database.list_schemas()
    }

    async fn list_tables(&self, schema: &str) -> Result<Vec<TableRecord>> {
        self.ensure_open()?;
        self.database.list_tables(schema)
    }

    async fn list_functions(&self, schema: &str) -> Result<Vec<String>> {
        self.ensure_open()?;
        self.database.list_functions(schema)
    }

    async fn list_procedures(&self, schema: &str) -> Result<Vec<String>> {
        self.ensure_open()?;
        self.database.list_procedures(schema)
    }

    async fn get_columns(&self, schema: &str, table: &str) -> Result<Vec<ColumnInfo>> {
        self.ensure_open()?;
        self.database.get_columns(schema, table)
    }

    async fn get_indexes(&self, schema: &str, table: &str) -> Result<Vec<IndexInfo>> {
        self.ensure_open()?;
        self.database.get_indexes(schema, table)
    }

    async fn get_routine_source(&self, schema: &str, name: &str) -> Result<Option<String>> {
        self.ensure_open()?;
        self.database.get_routine_source(schema, name)
    }
}

/// Mock driver that counts connections created
///
/// Connecting can be slowed down to widen races, or made to fail for every
/// profile (`fail_connections`) or for one host. Profiles whose database name
/// was registered with `with_database` see that catalog instead of the
/// default one.
pub struct MockDriver {
    database: MockDatabase,
    named: Mutex<Vec<(String, MockDatabase)>>,
    counter: AtomicUsize,
    connect_delay: Mutex<Duration>,
    fail_connections: AtomicBool,
    unreachable_host: Mutex<Option<String>>,
    connections: Mutex<Vec<Arc<MockConnection>>>,
}

impl MockDriver {
    pub fn new(database: MockDatabase) -> Self {
        Self {
            database,
            named: Mutex::new(Vec::new()),
            counter: AtomicUsize::new(0),
            connect_delay: Mutex::new(Duration::ZERO),
            fail_connections: AtomicBool::new(false),
            unreachable_host: Mutex::new(None),
            connections: Mutex::new(Vec::new()),
        }
    }

    pub fn with_connect_delay(self, delay: Duration) -> Self {
        *self.connect_delay.lock() = delay;
        self
    }

    /// Serve `database` to profiles connecting to the database `name`
    pub fn with_database(self, name: &str, database: MockDatabase) -> Self {
        self.named.lock().push((name.to_string(), database));
        self
    }

    fn database_for(&self, profile: &ConnectionProfile) -> MockDatabase {
        self.named
            .lock()
            .iter()
            .find(|(name, _)| name == profile.database())
            .map(|(_, db)| db.clone())
            .unwrap_or_else(|| self.database.clone())
    }

    pub fn fail_connections(&self, fail: bool) {
        self.fail_connections.store(fail, Ordering::SeqCst);
    }

    pub fn set_unreachable_host(&self, host: Option<&str>) {
        *self.unreachable_host.lock() = host.map(|h| h.to_string());
    }

    pub fn database(&self) -> &MockDatabase {
        &self.database
    }

    /// Number of successful connects
    pub fn count(&self) -> usize {
        self.counter.load(Ordering::SeqCst)
    }

    /// Every connection handed out so far
    pub fn connections(&self) -> Vec<Arc<MockConnection>> {
        self.connections.lock().clone()
    }

    pub fn open_connections(&self) -> usize {
        self.connections
            .lock()
            .iter()
            .filter(|c| !c.is_closed())
            .count()
    }
}

#[async_trait]
impl DatabaseDriver for MockDriver {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn default_port(&self) -> Option<u16> {
        Some(5432)
    }

    async fn connect(
        &self,
        profile: &ConnectionProfile,
        timeout: Duration,
    ) -> Result<Arc<dyn Connection>> {
        let delay = *self.connect_delay.lock();
        if delay > timeout {
            tokio::time::sleep(timeout).await;
            return Err(PgDevError::Timeout(format!(
                "connecting to {} timed out after {:?}",
                profile.host(),
                timeout
            )));
        }
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let unreachable = self.unreachable_host.lock().as_deref() == Some(profile.host());
        if unreachable || self.fail_connections.load(Ordering::SeqCst) {
            return Err(PgDevError::Connection(format!(
                "connection refused: {}:{}",
                profile.host(),
                profile.port()
            )));
        }

        let id = self.counter.fetch_add(1, Ordering::SeqCst);
        tracing::debug!(id, profile = %profile.name(), "mock connection opened");
        let conn = Arc::new(MockConnection {
            id,
            profile_name: profile.name().to_string(),
            database: self.database_for(profile),
            closed: AtomicBool::new(false),
        });
        self.connections.lock().push(conn.clone());
        Ok(conn)
    }
}
