//! Immutable cache values

use std::collections::{BTreeMap, HashSet};
use std::hash::Hash;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use pgdev_core::TableRecord;
use serde::{Deserialize, Serialize};

/// Object lists of one schema, captured at introspection time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaSnapshot {
    name: String,
    tables: Vec<TableRecord>,
    functions: Vec<String>,
    procedures: Vec<String>,
}

impl SchemaSnapshot {
    pub fn new(
        name: impl Into<String>,
        tables: Vec<TableRecord>,
        functions: Vec<String>,
        procedures: Vec<String>,
    ) -> Self {
        Self {
            name: name.into(),
            tables,
            functions,
            procedures,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tables(&self) -> &[TableRecord] {
        &self.tables
    }

    pub fn functions(&self) -> &[String] {
        &self.functions
    }

    pub fn procedures(&self) -> &[String] {
        &self.procedures
    }

    /// Whether freshly read lists describe the same schema contents
    ///
    /// Tables and functions are compared as sets (after a count check),
    /// procedures as ordered lists.
    pub fn is_unchanged(
        &self,
        tables: &[TableRecord],
        functions: &[String],
        procedures: &[String],
    ) -> bool {
        self.tables.len() == tables.len()
            && self.functions.len() == functions.len()
            && same_set(&self.functions, functions)
            && same_set(&self.tables, tables)
            && self.procedures == procedures
    }
}

fn same_set<T: Eq + Hash>(a: &[T], b: &[T]) -> bool {
    a.iter().collect::<HashSet<_>>() == b.iter().collect::<HashSet<_>>()
}

/// Everything known about one connection's catalog at one point in time
///
/// Never mutated once built; a refresh produces a new value and unchanged
/// schemas share their `Arc` with the previous one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseCache {
    connection_name: String,
    captured_at: DateTime<Utc>,
    schemas: BTreeMap<String, Arc<SchemaSnapshot>>,
}

impl DatabaseCache {
    pub fn new(
        connection_name: impl Into<String>,
        captured_at: DateTime<Utc>,
        schemas: BTreeMap<String, Arc<SchemaSnapshot>>,
    ) -> Self {
        Self {
            connection_name: connection_name.into(),
            captured_at,
            schemas,
        }
    }

    pub fn connection_name(&self) -> &str {
        &self.connection_name
    }

    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    pub fn schemas(&self) -> &BTreeMap<String, Arc<SchemaSnapshot>> {
        &self.schemas
    }

    pub fn schema(&self, name: &str) -> Option<&Arc<SchemaSnapshot>> {
        self.schemas.get(name)
    }

    pub fn schema_names(&self) -> Vec<String> {
        self.schemas.keys().cloned().collect()
    }

    /// Number of tables and views over all schemas
    pub fn table_count(&self) -> usize {
        self.schemas.values().map(|s| s.tables().len()).sum()
    }
}
