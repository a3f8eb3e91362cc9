//! The catalog lists a cache is built from

use async_trait::async_trait;
use pgdev_core::{Result, TableRecord};

/// Catalog lists needed to build a `DatabaseCache`
///
/// Implementations must leave system schemas out of `list_schemas`.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    async fn list_schemas(&self) -> Result<Vec<String>>;

    async fn list_tables(&self, schema: &str) -> Result<Vec<TableRecord>>;

    async fn list_functions(&self, schema: &str) -> Result<Vec<String>>;

    async fn list_procedures(&self, schema: &str) -> Result<Vec<String>>;
}
