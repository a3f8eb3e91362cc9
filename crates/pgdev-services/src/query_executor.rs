//! Ad-hoc statement execution

use std::sync::Arc;

use pgdev_connection::PoolManager;
use pgdev_core::{QueryResult, Result};

/// Runs statements on a pooled connection, returning it afterwards
#[derive(Clone)]
pub struct QueryExecutor {
    manager: Arc<PoolManager>,
}

impl QueryExecutor {
    pub fn new(manager: Arc<PoolManager>) -> Self {
        Self { manager }
    }

    /// Execute on the active profile
    #[tracing::instrument(skip(self, sql))]
    pub async fn execute(&self, sql: &str) -> Result<QueryResult> {
        let conn = self.manager.connect_active().await?;
        run(&conn, sql).await
    }

    /// Execute on a named profile
    #[tracing::instrument(skip(self, sql))]
    pub async fn execute_on(&self, profile: &str, sql: &str) -> Result<QueryResult> {
        let conn = self.manager.connect(profile).await?;
        run(&conn, sql).await
    }
}

async fn run(conn: &pgdev_connection::PooledConnection, sql: &str) -> Result<QueryResult> {
    let started = std::time::Instant::now();
    let result = conn.execute(sql).await;
    match &result {
        Ok(result) => tracing::debug!(
            rows = result.row_count(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "statement executed"
        ),
        Err(e) => tracing::warn!(error = %e, "statement failed"),
    }
    result
}
