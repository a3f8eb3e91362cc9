//! Connection trait

use crate::{CatalogReflection, QueryResult, Result};
use async_trait::async_trait;

/// Statement used to check that a connection can round-trip
pub const PROBE_SQL: &str = "SELECT 1";

/// A live database connection
#[async_trait]
pub trait Connection: Send + Sync {
    /// Get the driver name (e.g., "postgres")
    fn driver_name(&self) -> &str;

    /// Execute one ad-hoc statement
    ///
    /// Returns a row set for statements producing rows and an update count
    /// otherwise. Database failures surface as `PgDevError::QueryExecution`
    /// carrying the server message.
    async fn execute(&self, sql: &str) -> Result<QueryResult>;

    /// Issue a trivial round-trip
    async fn ping(&self) -> Result<()> {
        tracing::trace!(driver = %self.driver_name(), "probing connection");
        self.execute(PROBE_SQL).await.map(|_| ())
    }

    /// Close the connection
    async fn close(&self) -> Result<()>;

    /// Check if the connection is closed
    fn is_closed(&self) -> bool;

    /// Get the catalog reflection interface if supported
    fn as_catalog(&self) -> Option<&dyn CatalogReflection> {
        None
    }
}
