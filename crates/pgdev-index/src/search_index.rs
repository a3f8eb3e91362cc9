//! SQLite-backed search index

use std::path::{Path, PathBuf};
use std::str::FromStr;

use parking_lot::Mutex;
use pgdev_core::{PgDevError, Result};
use rusqlite::functions::FunctionFlags;
use rusqlite::{Connection, Transaction, params};

use crate::{ObjectKind, SearchRecord};

/// Maximum number of records a search returns
pub const SEARCH_LIMIT: usize = 50;

const CONTAINS_FN: &str = "pgdev_contains";

fn index_error(e: rusqlite::Error) -> PgDevError {
    PgDevError::Index(e.to_string())
}

/// Flat index of catalog objects queried by name substring
///
/// One writer is assumed. The connection sits behind a mutex, so a search
/// running during a rebuild sees the index either before the batch insert
/// or after it.
pub struct SearchIndex {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
}

impl SearchIndex {
    /// Create an index that lives only as long as this value
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(index_error)?;
        Self::init(conn, None)
    }

    /// Open (or create) an index file
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path).map_err(index_error)?;
        Self::init(conn, Some(path.to_path_buf()))
    }

    fn init(conn: Connection, path: Option<PathBuf>) -> Result<Self> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS search_index (
                name TEXT NOT NULL CHECK (length(name) > 0),
                type TEXT NOT NULL,
                schema TEXT NOT NULL,
                parent TEXT
            );
            CREATE INDEX IF NOT EXISTS idx_search_index_name ON search_index(name);",
        )
        .map_err(index_error)?;

        // SQLite's LIKE only folds ASCII
        conn.create_scalar_function(
            CONTAINS_FN,
            2,
            FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
            |ctx| {
                let haystack: String = ctx.get(0)?;
                let needle: String = ctx.get(1)?;
                Ok(haystack.to_lowercase().contains(&needle.to_lowercase()))
            },
        )
        .map_err(index_error)?;

        tracing::debug!(path = ?path, "search index opened");
        Ok(Self {
            conn: Mutex::new(conn),
            path,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Remove every record
    pub fn clear(&self) -> Result<()> {
        self.conn
            .lock()
            .execute("DELETE FROM search_index", [])
            .map_err(index_error)?;
        Ok(())
    }

    /// Append records in one transaction; on failure none of them are visible
    pub fn index_items(&self, records: &[SearchRecord]) -> Result<()> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction().map_err(index_error)?;
        insert_all(&tx, records)?;
        tx.commit().map_err(index_error)?;

        tracing::debug!(count = records.len(), "search records indexed");
        Ok(())
    }

    /// Clear and index `records` as a single transaction
    pub fn rebuild(&self, records: &[SearchRecord]) -> Result<()> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction().map_err(index_error)?;
        tx.execute("DELETE FROM search_index", [])
            .map_err(index_error)?;
        insert_all(&tx, records)?;
        tx.commit().map_err(index_error)?;

        tracing::info!(count = records.len(), "search index rebuilt");
        Ok(())
    }

    /// Records whose name contains `query`, ignoring case, in insertion order
    ///
    /// At most [`SEARCH_LIMIT`] records are returned. An empty query matches
    /// everything.
    pub fn search(&self, query: &str) -> Result<Vec<SearchRecord>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(&format!(
                "SELECT name, type, schema, parent FROM search_index
                 WHERE {CONTAINS_FN}(name, ?1)
                 ORDER BY rowid
                 LIMIT ?2"
            ))
            .map_err(index_error)?;
        let rows = stmt
            .query_map(params![query, SEARCH_LIMIT as i64], row_to_raw)
            .map_err(index_error)?;
        collect_records(rows)
    }

    /// Every record, in insertion order
    pub fn records(&self) -> Result<Vec<SearchRecord>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare("SELECT name, type, schema, parent FROM search_index ORDER BY rowid")
            .map_err(index_error)?;
        let rows = stmt.query_map([], row_to_raw).map_err(index_error)?;
        collect_records(rows)
    }

    pub fn len(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .lock()
            .query_row("SELECT COUNT(*) FROM search_index", [], |row| row.get(0))
            .map_err(index_error)?;
        Ok(count as usize)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

fn insert_all(tx: &Transaction<'_>, records: &[SearchRecord]) -> Result<()> {
    let mut stmt = tx
        .prepare("INSERT INTO search_index (name, type, schema, parent) VALUES (?1, ?2, ?3, ?4)")
        .map_err(index_error)?;
    for record in records {
        stmt.execute(params![
            record.name,
            record.kind.as_ref(),
            record.schema,
            record.parent,
        ])
        .map_err(index_error)?;
    }
    Ok(())
}

type RawRecord = (String, String, String, Option<String>);

fn row_to_raw(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawRecord> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
}

fn collect_records(
    rows: impl Iterator<Item = rusqlite::Result<RawRecord>>,
) -> Result<Vec<SearchRecord>> {
    rows.map(|row| {
        let (name, kind, schema, parent) = row.map_err(index_error)?;
        let kind = ObjectKind::from_str(&kind)
            .map_err(|_| PgDevError::Index(format!("unknown object type {kind:?}")))?;
        Ok(SearchRecord {
            name,
            kind,
            schema,
            parent,
        })
    })
    .collect()
}
