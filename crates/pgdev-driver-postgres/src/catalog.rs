//! PostgreSQL catalog reflection

use async_trait::async_trait;
use pgdev_core::{CatalogReflection, ColumnInfo, IndexInfo, Result, TableKind, TableRecord};

use crate::PostgresConnection;
use crate::connection::query_error;

const SCHEMAS_SQL: &str = "SELECT nspname::text FROM pg_catalog.pg_namespace ORDER BY nspname";

const TABLES_SQL: &str = "SELECT table_name::text, table_type::text
     FROM information_schema.tables
     WHERE table_schema::text = $1 AND table_type IN ('BASE TABLE', 'VIEW')
     ORDER BY table_name";

const ROUTINES_SQL: &str = "SELECT DISTINCT p.proname::text
     FROM pg_catalog.pg_proc p
     JOIN pg_catalog.pg_namespace n ON p.pronamespace = n.oid
     WHERE n.nspname::text = $1 AND p.prokind::text = $2
     ORDER BY 1";

const COLUMNS_SQL: &str = "SELECT
        column_name::text,
        ordinal_position::int4,
        data_type::text,
        is_nullable::text,
        column_default::text
     FROM information_schema.columns
     WHERE table_schema::text = $1 AND table_name::text = $2
     ORDER BY ordinal_position";

const INDEXES_SQL: &str = "SELECT
        i.relname::text AS index_name,
        ix.indisunique,
        ix.indisprimary,
        array_agg(a.attname::text ORDER BY array_position(ix.indkey::int2[], a.attnum)) AS columns
     FROM pg_catalog.pg_class t
     JOIN pg_catalog.pg_index ix ON t.oid = ix.indrelid
     JOIN pg_catalog.pg_class i ON i.oid = ix.indexrelid
     JOIN pg_catalog.pg_attribute a ON a.attrelid = t.oid AND a.attnum = ANY(ix.indkey)
     JOIN pg_catalog.pg_namespace n ON n.oid = t.relnamespace
     WHERE n.nspname::text = $1 AND t.relname::text = $2
     GROUP BY i.relname, ix.indisunique, ix.indisprimary
     ORDER BY i.relname";

const ROUTINE_SOURCE_SQL: &str = "SELECT pg_catalog.pg_get_functiondef(p.oid)
     FROM pg_catalog.pg_proc p
     JOIN pg_catalog.pg_namespace n ON p.pronamespace = n.oid
     WHERE n.nspname::text = $1 AND p.proname::text = $2 AND p.prokind IN ('f', 'p')
     ORDER BY p.oid
     LIMIT 1";

impl PostgresConnection {
    async fn list_routines(&self, schema: &str, prokind: &str) -> Result<Vec<String>> {
        let rows = self
            .client
            .query(ROUTINES_SQL, &[&schema, &prokind])
            .await
            .map_err(query_error)?;
        rows.iter()
            .map(|row| row.try_get::<_, String>(0).map_err(query_error))
            .collect()
    }
}

#[async_trait]
impl CatalogReflection for PostgresConnection {
    #[tracing::instrument(skip(self))]
    async fn list_schemas(&self) -> Result<Vec<String>> {
        let rows = self
            .client
            .query(SCHEMAS_SQL, &[])
            .await
            .map_err(query_error)?;
        rows.iter()
            .map(|row| row.try_get::<_, String>(0).map_err(query_error))
            .collect()
    }

    #[tracing::instrument(skip(self))]
    async fn list_tables(&self, schema: &str) -> Result<Vec<TableRecord>> {
        let rows = self
            .client
            .query(TABLES_SQL, &[&schema])
            .await
            .map_err(query_error)?;

        rows.iter()
            .map(|row| {
                let name: String = row.try_get(0).map_err(query_error)?;
                let table_type: String = row.try_get(1).map_err(query_error)?;
                Ok(TableRecord::new(name, TableKind::from_catalog_type(&table_type)))
            })
            .collect()
    }

    #[tracing::instrument(skip(self))]
    async fn list_functions(&self, schema: &str) -> Result<Vec<String>> {
        self.list_routines(schema, "f").await
    }

    #[tracing::instrument(skip(self))]
    async fn list_procedures(&self, schema: &str) -> Result<Vec<String>> {
        self.list_routines(schema, "p").await
    }

    async fn get_columns(&self, schema: &str, table: &str) -> Result<Vec<ColumnInfo>> {
        let rows = self
            .client
            .query(COLUMNS_SQL, &[&schema, &table])
            .await
            .map_err(query_error)?;

        rows.iter()
            .map(|row| {
                let ordinal: i32 = row.try_get(1).map_err(query_error)?;
                let is_nullable: String = row.try_get(3).map_err(query_error)?;
                Ok(ColumnInfo {
                    name: row.try_get(0).map_err(query_error)?,
                    ordinal: ordinal.max(0) as usize,
                    data_type: row.try_get(2).map_err(query_error)?,
                    nullable: is_nullable == "YES",
                    default_value: row.try_get(4).map_err(query_error)?,
                })
            })
            .collect()
    }

    #[tracing::instrument(skip(self))]
    async fn get_indexes(&self, schema: &str, table: &str) -> Result<Vec<IndexInfo>> {
        let rows = self
            .client
            .query(INDEXES_SQL, &[&schema, &table])
            .await
            .map_err(query_error)?;

        rows.iter()
            .map(|row| {
                Ok(IndexInfo {
                    name: row.try_get(0).map_err(query_error)?,
                    is_unique: row.try_get(1).map_err(query_error)?,
                    is_primary: row.try_get(2).map_err(query_error)?,
                    columns: row.try_get(3).map_err(query_error)?,
                })
            })
            .collect()
    }

    async fn get_routine_source(&self, schema: &str, name: &str) -> Result<Option<String>> {
        let row = self
            .client
            .query_opt(ROUTINE_SOURCE_SQL, &[&schema, &name])
            .await
            .map_err(query_error)?;
        row.map(|row| row.try_get::<_, String>(0).map_err(query_error))
            .transpose()
    }
}
