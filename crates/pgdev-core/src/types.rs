//! Core types for pgdev

use serde::{Deserialize, Serialize};

/// A database value as surfaced to result grids
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// NULL value
    Null,
    /// Boolean
    Bool(bool),
    /// 64-bit signed integer
    Int64(i64),
    /// 64-bit floating point
    Float64(f64),
    /// UTF-8 string (also used for types without a dedicated variant)
    String(String),
}

impl Value {
    /// Check if the value is NULL
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Try to get as a string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get as i64
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int64(v) => Some(*v),
            Value::String(s) => s.parse::<i64>().ok(),
            _ => None,
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Bool(v) => write!(f, "{}", v),
            Value::Int64(v) => write!(f, "{}", v),
            Value::Float64(v) => write!(f, "{}", v),
            Value::String(v) => write!(f, "{}", v),
        }
    }
}

/// A row from a query result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    /// Column values, in column order
    pub values: Vec<Value>,
}

impl Row {
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    /// Get a value by column index
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }
}

/// Outcome of executing one ad-hoc statement
///
/// Either a row set (SELECT and friends) or an update count (DML/DDL), each
/// with a human-readable message. Results are never cached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QueryResult {
    Rows {
        columns: Vec<String>,
        rows: Vec<Row>,
        message: String,
    },
    Update {
        affected_rows: u64,
        message: String,
    },
}

impl QueryResult {
    /// Build a row-set result with the standard success message
    pub fn rows(columns: Vec<String>, rows: Vec<Row>) -> Self {
        QueryResult::Rows {
            columns,
            rows,
            message: "Query executed successfully.".to_string(),
        }
    }

    /// Build an update-count result with the standard message
    pub fn update(affected_rows: u64) -> Self {
        QueryResult::Update {
            affected_rows,
            message: format!("Statement executed. Rows affected: {}", affected_rows),
        }
    }

    pub fn is_row_set(&self) -> bool {
        matches!(self, QueryResult::Rows { .. })
    }

    pub fn message(&self) -> &str {
        match self {
            QueryResult::Rows { message, .. } | QueryResult::Update { message, .. } => message,
        }
    }

    /// Number of rows returned (row sets) or affected (updates)
    pub fn row_count(&self) -> u64 {
        match self {
            QueryResult::Rows { rows, .. } => rows.len() as u64,
            QueryResult::Update { affected_rows, .. } => *affected_rows,
        }
    }
}
