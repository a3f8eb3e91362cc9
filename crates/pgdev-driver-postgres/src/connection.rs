//! PostgreSQL connection implementation

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use pgdev_core::{CatalogReflection, Connection, PgDevError, QueryResult, Result, Row, Value};
use tokio::task::JoinHandle;
use tokio_postgres::config::SslMode;
use tokio_postgres::{Client, NoTls, SimpleQueryMessage};

use crate::tls::build_tls_connector;

/// Error text for a failed statement: the server message when there is one
pub(crate) fn format_postgres_error(error: &tokio_postgres::Error) -> String {
    let Some(db_error) = error.as_db_error() else {
        return error.to_string();
    };

    let mut message = db_error.message().to_string();
    if let Some(detail) = db_error.detail().filter(|d| !d.trim().is_empty()) {
        message.push_str(&format!(" (detail: {})", detail));
    }
    if let Some(hint) = db_error.hint().filter(|h| !h.trim().is_empty()) {
        message.push_str(&format!(" (hint: {})", hint));
    }
    message
}

pub(crate) fn query_error(error: tokio_postgres::Error) -> PgDevError {
    PgDevError::QueryExecution(format_postgres_error(&error))
}

/// PostgreSQL connection wrapper
pub struct PostgresConnection {
    pub(crate) client: Client,
    /// Drives the socket; aborted on close
    driver_task: JoinHandle<()>,
    closed: AtomicBool,
}

impl PostgresConnection {
    /// Connect with an already populated `tokio_postgres::Config`
    ///
    /// With `use_ssl` the session requires TLS (see `build_tls_connector`),
    /// otherwise TLS is disabled.
    pub async fn connect(mut config: tokio_postgres::Config, use_ssl: bool) -> Result<Self> {
        let connect_error = |e: tokio_postgres::Error| {
            PgDevError::Connection(format!("Failed to connect to PostgreSQL: {}", e))
        };

        let (client, driver_task) = if use_ssl {
            config.ssl_mode(SslMode::Require);
            let tls = build_tls_connector()?;
            let (client, connection) = config.connect(tls).await.map_err(connect_error)?;
            let task = tokio::spawn(async move {
                if let Err(e) = connection.await {
                    tracing::error!(error = %e, "PostgreSQL connection error");
                }
            });
            (client, task)
        } else {
            config.ssl_mode(SslMode::Disable);
            let (client, connection) = config.connect(NoTls).await.map_err(connect_error)?;
            let task = tokio::spawn(async move {
                if let Err(e) = connection.await {
                    tracing::error!(error = %e, "PostgreSQL connection error");
                }
            });
            (client, task)
        };

        Ok(Self {
            client,
            driver_task,
            closed: AtomicBool::new(false),
        })
    }
}

#[async_trait]
impl Connection for PostgresConnection {
    fn driver_name(&self) -> &str {
        "postgresql"
    }

    /// Run one statement over the simple query protocol
    ///
    /// The first result decides the shape: a row description means a row
    /// set, a bare command completion means an update count. Values are
    /// returned as text.
    #[tracing::instrument(skip(self, sql), fields(sql_preview = %sql.chars().take(100).collect::<String>()))]
    async fn execute(&self, sql: &str) -> Result<QueryResult> {
        if self.is_closed() {
            return Err(PgDevError::Connection("connection is closed".into()));
        }

        let messages = self.client.simple_query(sql).await.map_err(query_error)?;

        let mut columns: Option<Vec<String>> = None;
        let mut rows = Vec::new();
        for message in messages {
            match message {
                SimpleQueryMessage::RowDescription(description) => {
                    columns = Some(description.iter().map(|c| c.name().to_string()).collect());
                }
                SimpleQueryMessage::Row(row) => {
                    if columns.is_none() {
                        columns = Some(row.columns().iter().map(|c| c.name().to_string()).collect());
                    }
                    let values = (0..row.len())
                        .map(|idx| match row.get(idx) {
                            Some(text) => Value::String(text.to_string()),
                            None => Value::Null,
                        })
                        .collect();
                    rows.push(Row::new(values));
                }
                SimpleQueryMessage::CommandComplete(affected) => {
                    return Ok(match columns {
                        Some(columns) => {
                            tracing::debug!(row_count = rows.len(), "query returned rows");
                            QueryResult::rows(columns, rows)
                        }
                        None => {
                            tracing::debug!(affected_rows = affected, "statement executed");
                            QueryResult::update(affected)
                        }
                    });
                }
                _ => {}
            }
        }

        // Empty statement: no command completion
        Ok(match columns {
            Some(columns) => QueryResult::rows(columns, rows),
            None => QueryResult::update(0),
        })
    }

    async fn close(&self) -> Result<()> {
        if !self.closed.swap(true, Ordering::SeqCst) {
            tracing::debug!("closing PostgreSQL connection");
            self.driver_task.abort();
        }
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst) || self.client.is_closed()
    }

    fn as_catalog(&self) -> Option<&dyn CatalogReflection> {
        Some(self)
    }
}
