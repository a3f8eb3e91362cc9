//! Mutable in-memory catalog
//!
//! Tests mutate the database between introspection cycles to simulate DDL.

use parking_lot::RwLock;
use pgdev_core::{ColumnInfo, IndexInfo, PgDevError, QueryResult, Result, TableRecord};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Default, Clone)]
struct MockSchema {
    tables: Vec<TableRecord>,
    functions: Vec<String>,
    procedures: Vec<String>,
    routine_sources: HashMap<String, String>,
    columns: HashMap<String, Vec<ColumnInfo>>,
    indexes: HashMap<String, Vec<IndexInfo>>,
}

#[derive(Debug, Default)]
struct State {
    schemas: BTreeMap<String, MockSchema>,
    failing_schema: Option<String>,
    fail_schema_list: bool,
    fail_routine_source: bool,
    query_results: HashMap<String, QueryResult>,
    query_failures: HashMap<String, String>,
}

/// In-memory database catalog shared by all mock connections
#[derive(Debug, Clone, Default)]
pub struct MockDatabase {
    state: Arc<RwLock<State>>,
    catalog_calls: Arc<AtomicUsize>,
}

impl MockDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create (or keep) an empty schema
    pub fn add_schema(&self, schema: &str) -> &Self {
        self.state
            .write()
            .schemas
            .entry(schema.to_string())
            .or_default();
        self
    }

    pub fn drop_schema(&self, schema: &str) -> &Self {
        self.state.write().schemas.remove(schema);
        self
    }

    pub fn add_table(&self, schema: &str, table: TableRecord) -> &Self {
        self.state
            .write()
            .schemas
            .entry(schema.to_string())
            .or_default()
            .tables
            .push(table);
        self
    }

    pub fn set_tables(&self, schema: &str, tables: Vec<TableRecord>) -> &Self {
        self.state
            .write()
            .schemas
            .entry(schema.to_string())
            .or_default()
            .tables = tables;
        self
    }

    pub fn set_functions(&self, schema: &str, functions: &[&str]) -> &Self {
        self.state
            .write()
            .schemas
            .entry(schema.to_string())
            .or_default()
            .functions = functions.iter().map(|f| f.to_string()).collect();
        self
    }

    pub fn set_procedures(&self, schema: &str, procedures: &[&str]) -> &Self {
        self.state
            .write()
            .schemas
            .entry(schema.to_string())
            .or_default()
            .procedures = procedures.iter().map(|p| p.to_string()).collect();
        self
    }

    pub fn set_routine_source(&self, schema: &str, name: &str, source: &str) -> &Self {
        self.state
            .write()
            .schemas
            .entry(schema.to_string())
            .or_default()
            .routine_sources
            .insert(name.to_string(), source.to_string());
        self
    }

    pub fn set_columns(&self, schema: &str, table: &str, columns: Vec<ColumnInfo>) -> &Self {
        self.state
            .write()
            .schemas
            .entry(schema.to_string())
            .or_default()
            .columns
            .insert(table.to_string(), columns);
        self
    }

    pub fn set_indexes(&self, schema: &str, table: &str, indexes: Vec<IndexInfo>) -> &Self {
        self.state
            .write()
            .schemas
            .entry(schema.to_string())
            .or_default()
            .indexes
            .insert(table.to_string(), indexes);
        self
    }

    /// Make every catalog read touching `schema` fail (`None` to heal)
    pub fn fail_schema(&self, schema: Option<&str>) -> &Self {
        self.state.write().failing_schema = schema.map(|s| s.to_string());
        self
    }

    pub fn fail_schema_list(&self, fail: bool) -> &Self {
        self.state.write().fail_schema_list = fail;
        self
    }

    pub fn fail_routine_source(&self, fail: bool) -> &Self {
        self.state.write().fail_routine_source = fail;
        self
    }

    /// Answer `sql` with a canned result
    pub fn set_query_result(&self, sql: &str, result: QueryResult) -> &Self {
        self.state
            .write()
            .query_results
            .insert(sql.to_string(), result);
        self
    }

    /// Make `sql` fail with the given server message
    pub fn fail_query(&self, sql: &str, message: &str) -> &Self {
        self.state
            .write()
            .query_failures
            .insert(sql.to_string(), message.to_string());
        self
    }

    /// Number of catalog reflection calls served so far
    pub fn catalog_calls(&self) -> usize {
        self.catalog_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn execute(&self, sql: &str) -> Result<QueryResult> {
        let state = self.state.read();
        if let Some(message) = state.query_failures.get(sql) {
            return Err(PgDevError::QueryExecution(message.clone()));
        }
        if let Some(result) = state.query_results.get(sql) {
            return Ok(result.clone());
        }
        let is_select = sql.trim_start().to_ascii_lowercase().starts_with("select");
        if is_select {
            Ok(QueryResult::rows(
                vec!["?column?".to_string()],
                vec![pgdev_core::Row::new(vec![pgdev_core::Value::Int64(1)])],
            ))
        } else {
            Ok(QueryResult::update(0))
        }
    }

    pub(crate) fn list_schemas(&self) -> Result<Vec<String>> {
        self.catalog_calls.fetch_add(1, Ordering::SeqCst);
        let state = self.state.read();
        if state.fail_schema_list {
            return Err(PgDevError::Connection("schema listing failed".into()));
        }
        Ok(state.schemas.keys().cloned().collect())
    }

    fn with_schema<T>(&self, schema: &str, f: impl FnOnce(&MockSchema) -> T) -> Result<T>
    where
        T: Default,
    {
        self.catalog_calls.fetch_add(1, Ordering::SeqCst);
        let state = self.state.read();
        if state.failing_schema.as_deref() == Some(schema) {
            return Err(PgDevError::Connection(format!(
                "catalog read failed for schema {}",
                schema
            )));
        }
        Ok(state.schemas.get(schema).map(f).unwrap_or_default())
    }

    pub(crate) fn list_tables(&self, schema: &str) -> Result<Vec<TableRecord>> {
        self.with_schema(schema, |s| s.tables.clone())
    }

    pub(crate) fn list_functions(&self, schema: &str) -> Result<Vec<String>> {
        self.with_schema(schema, |s| s.functions.clone())
    }

    pub(crate) fn list_procedures(&self, schema: &str) -> Result<Vec<String>> {
        self.with_schema(schema, |s| s.procedures.clone())
    }

    pub(crate) fn get_columns(&self, schema: &str, table: &str) -> Result<Vec<ColumnInfo>> {
        self.with_schema(schema, |s| s.columns.get(table).cloned().unwrap_or_default())
    }

    pub(crate) fn get_indexes(&self, schema: &str, table: &str) -> Result<Vec<IndexInfo>> {
        self.with_schema(schema, |s| s.indexes.get(table).cloned().unwrap_or_default())
    }

    pub(crate) fn get_routine_source(&self, schema: &str, name: &str) -> Result<Option<String>> {
        if self.state.read().fail_routine_source {
            return Err(PgDevError::QueryExecution("permission denied".into()));
        }
        self.with_schema(schema, |s| s.routine_sources.get(name).cloned())
    }
}
