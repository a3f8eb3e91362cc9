//! Live catalog reads through the pool manager

use std::sync::Arc;

use async_trait::async_trait;
use pgdev_connection::{PoolManager, PooledConnection};
use pgdev_core::{CatalogReflection, ColumnInfo, IndexInfo, PgDevError, Result, TableRecord};

use crate::CatalogSource;

/// Returned by `get_routine_source` when no definition could be read
pub const SOURCE_NOT_FOUND: &str = "-- Source not found";

/// Schemas hidden from every listing
pub fn is_system_schema(name: &str) -> bool {
    name == "information_schema" || name.starts_with("pg_")
}

/// Reads catalog metadata for one profile, or for whichever profile is active
///
/// Each call borrows a pooled connection for its own duration only; nothing
/// is cached here.
#[derive(Clone)]
pub struct CatalogIntrospector {
    manager: Arc<PoolManager>,
    profile: Option<String>,
}

impl CatalogIntrospector {
    /// Introspect a named profile
    pub fn new(manager: Arc<PoolManager>, profile: impl Into<String>) -> Self {
        Self {
            manager,
            profile: Some(profile.into()),
        }
    }

    /// Introspect the active profile at the time of each call
    pub fn for_active(manager: Arc<PoolManager>) -> Self {
        Self {
            manager,
            profile: None,
        }
    }

    /// The profile reads go to, resolved now
    pub fn connection_name(&self) -> Option<String> {
        self.profile
            .clone()
            .or_else(|| self.manager.active_profile_name())
    }

    async fn connect(&self) -> Result<PooledConnection> {
        match &self.profile {
            Some(name) => self.manager.connect(name).await,
            None => self.manager.connect_active().await,
        }
    }

    fn catalog(conn: &PooledConnection) -> Result<&dyn CatalogReflection> {
        conn.as_catalog().ok_or_else(|| {
            PgDevError::NotSupported(format!(
                "driver {} does not expose its catalog",
                conn.driver_name()
            ))
        })
    }

    /// Schemas of the current database, without system schemas
    #[tracing::instrument(skip(self), fields(profile = ?self.profile))]
    pub async fn list_schemas(&self) -> Result<Vec<String>> {
        let conn = self.connect().await?;
        let schemas = Self::catalog(&conn)?
            .list_schemas()
            .await
            .map_err(|e| PgDevError::introspection("list schemas", e))?;

        let schemas: Vec<String> = schemas
            .into_iter()
            .filter(|name| !is_system_schema(name))
            .collect();
        tracing::debug!(count = schemas.len(), "schemas listed");
        Ok(schemas)
    }

    #[tracing::instrument(skip(self), fields(profile = ?self.profile))]
    pub async fn list_tables(&self, schema: &str) -> Result<Vec<TableRecord>> {
        let conn = self.connect().await?;
        Self::catalog(&conn)?
            .list_tables(schema)
            .await
            .map_err(|e| PgDevError::introspection(format!("list tables of {}", schema), e))
    }

    #[tracing::instrument(skip(self), fields(profile = ?self.profile))]
    pub async fn list_functions(&self, schema: &str) -> Result<Vec<String>> {
        let conn = self.connect().await?;
        Self::catalog(&conn)?
            .list_functions(schema)
            .await
            .map_err(|e| PgDevError::introspection(format!("list functions of {}", schema), e))
    }

    #[tracing::instrument(skip(self), fields(profile = ?self.profile))]
    pub async fn list_procedures(&self, schema: &str) -> Result<Vec<String>> {
        let conn = self.connect().await?;
        Self::catalog(&conn)?
            .list_procedures(schema)
            .await
            .map_err(|e| PgDevError::introspection(format!("list procedures of {}", schema), e))
    }

    /// Columns of a table, always read live
    pub async fn get_columns(&self, schema: &str, table: &str) -> Result<Vec<ColumnInfo>> {
        let conn = self.connect().await?;
        Self::catalog(&conn)?
            .get_columns(schema, table)
            .await
            .map_err(|e| PgDevError::introspection(format!("columns of {}.{}", schema, table), e))
    }

    /// Indexes of a table, always read live
    pub async fn get_indexes(&self, schema: &str, table: &str) -> Result<Vec<IndexInfo>> {
        let conn = self.connect().await?;
        Self::catalog(&conn)?
            .get_indexes(schema, table)
            .await
            .map_err(|e| PgDevError::introspection(format!("indexes of {}.{}", schema, table), e))
    }

    /// Definition of a function or procedure
    ///
    /// Never fails: a missing routine or any error yields `SOURCE_NOT_FOUND`.
    #[tracing::instrument(skip(self), fields(profile = ?self.profile))]
    pub async fn get_routine_source(&self, schema: &str, name: &str) -> String {
        let result = async {
            let conn = self.connect().await?;
            Self::catalog(&conn)?.get_routine_source(schema, name).await
        }
        .await;

        match result {
            Ok(Some(source)) => source,
            Ok(None) => {
                tracing::debug!("routine not found");
                SOURCE_NOT_FOUND.to_string()
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to read routine source");
                SOURCE_NOT_FOUND.to_string()
            }
        }
    }
}

#[async_trait]
impl CatalogSource for CatalogIntrospector {
    async fn list_schemas(&self) -> Result<Vec<String>> {
        CatalogIntrospector::list_schemas(self).await
    }

    async fn list_tables(&self, schema: &str) -> Result<Vec<TableRecord>> {
        CatalogIntrospector::list_tables(self, schema).await
    }

    async fn list_functions(&self, schema: &str) -> Result<Vec<String>> {
        CatalogIntrospector::list_functions(self, schema).await
    }

    async fn list_procedures(&self, schema: &str) -> Result<Vec<String>> {
        CatalogIntrospector::list_procedures(self, schema).await
    }
}
