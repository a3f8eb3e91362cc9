//! Catalog reflection traits and types

use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Catalog reflection interface exposed by a live connection
///
/// Every method is a fresh round-trip; nothing here is cached.
#[async_trait]
pub trait CatalogReflection: Send + Sync {
    /// List every schema in the current database, system schemas included
    async fn list_schemas(&self) -> Result<Vec<String>>;

    /// List the tables and views of a schema
    async fn list_tables(&self, schema: &str) -> Result<Vec<TableRecord>>;

    /// List function names of a schema
    async fn list_functions(&self, schema: &str) -> Result<Vec<String>>;

    /// List procedure names of a schema
    async fn list_procedures(&self, schema: &str) -> Result<Vec<String>>;

    /// Get columns for a table
    async fn get_columns(&self, schema: &str, table: &str) -> Result<Vec<ColumnInfo>>;

    /// Get indexes for a table
    async fn get_indexes(&self, schema: &str, table: &str) -> Result<Vec<IndexInfo>>;

    /// Textual definition of a function or procedure, `None` if it does not exist
    async fn get_routine_source(&self, schema: &str, name: &str) -> Result<Option<String>>;
}

/// Kind of a table-like relation
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum TableKind {
    #[strum(to_string = "TABLE", serialize = "BASE TABLE")]
    Table,
    View,
}

impl TableKind {
    /// Parse the `table_type` reported by a catalog
    ///
    /// Anything that is not a view is treated as a table.
    pub fn from_catalog_type(table_type: &str) -> Self {
        TableKind::from_str(table_type.trim()).unwrap_or(TableKind::Table)
    }
}

/// A table or view, identified by name and kind
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TableRecord {
    pub name: String,
    pub kind: TableKind,
}

impl TableRecord {
    pub fn new(name: impl Into<String>, kind: TableKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    pub fn table(name: impl Into<String>) -> Self {
        Self::new(name, TableKind::Table)
    }

    pub fn view(name: impl Into<String>) -> Self {
        Self::new(name, TableKind::View)
    }
}

/// Column information
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    pub ordinal: usize,
    pub data_type: String,
    pub nullable: bool,
    pub default_value: Option<String>,
}

/// Index information
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexInfo {
    pub name: String,
    pub columns: Vec<String>,
    pub is_unique: bool,
    pub is_primary: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_kind_from_catalog_type() {
        assert_eq!(TableKind::from_catalog_type("BASE TABLE"), TableKind::Table);
        assert_eq!(TableKind::from_catalog_type("TABLE"), TableKind::Table);
        assert_eq!(TableKind::from_catalog_type("VIEW"), TableKind::View);
        assert_eq!(TableKind::from_catalog_type("view"), TableKind::View);
        assert_eq!(TableKind::from_catalog_type("FOREIGN"), TableKind::Table);
        assert_eq!(TableKind::View.to_string(), "VIEW");
    }

    #[test]
    fn table_record_equality_uses_kind() {
        assert_eq!(TableRecord::table("a"), TableRecord::table("a"));
        assert_ne!(TableRecord::table("a"), TableRecord::view("a"));
    }
}
