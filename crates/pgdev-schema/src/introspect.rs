//! Building a `DatabaseCache` from a catalog source

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use pgdev_core::{PgDevError, Result};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::{CatalogSource, DatabaseCache, SchemaSnapshot};

/// Progress of one introspection cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RefreshEvent {
    Started {
        connection: String,
    },
    SchemaListed {
        schemas: Vec<String>,
    },
    SchemaLoaded {
        schema: String,
        /// The previous snapshot was kept
        reused: bool,
        /// 1-based position in the schema list
        position: usize,
        total: usize,
    },
    Finished {
        schemas: usize,
        reused: usize,
    },
}

/// Introspect `source` and build a new cache
///
/// Snapshots of `previous` are carried over (same `Arc`) for every schema
/// whose lists did not change. Schemas no longer listed are dropped. Any
/// read failure aborts the whole cycle.
pub async fn introspect<S>(
    source: &S,
    connection_name: &str,
    previous: Option<&DatabaseCache>,
) -> Result<DatabaseCache>
where
    S: CatalogSource + ?Sized,
{
    introspect_with(
        source,
        connection_name,
        previous,
        &CancellationToken::new(),
        |_| {},
    )
    .await
}

/// `introspect` with progress reporting and cancellation
///
/// `cancel` is checked before the schema list is read and between schemas;
/// a cancelled cycle fails with `PgDevError::Cancelled`.
#[tracing::instrument(skip_all, fields(connection = %connection_name))]
pub async fn introspect_with<S, F>(
    source: &S,
    connection_name: &str,
    previous: Option<&DatabaseCache>,
    cancel: &CancellationToken,
    mut on_event: F,
) -> Result<DatabaseCache>
where
    S: CatalogSource + ?Sized,
    F: FnMut(RefreshEvent) + Send,
{
    if cancel.is_cancelled() {
        return Err(PgDevError::Cancelled);
    }
    on_event(RefreshEvent::Started {
        connection: connection_name.to_string(),
    });

    let schema_names = source.list_schemas().await?;
    on_event(RefreshEvent::SchemaListed {
        schemas: schema_names.clone(),
    });

    let total = schema_names.len();
    let mut schemas = BTreeMap::new();
    let mut reused_count = 0;

    for (idx, name) in schema_names.into_iter().enumerate() {
        if cancel.is_cancelled() {
            tracing::info!(loaded = idx, total, "introspection cancelled");
            return Err(PgDevError::Cancelled);
        }

        let tables = source.list_tables(&name).await?;
        let functions = source.list_functions(&name).await?;
        let procedures = source.list_procedures(&name).await?;

        let prior = previous.and_then(|cache| cache.schema(&name));
        let (snapshot, reused) = match prior {
            Some(prior) if prior.is_unchanged(&tables, &functions, &procedures) => {
                (prior.clone(), true)
            }
            _ => (
                Arc::new(SchemaSnapshot::new(
                    name.clone(),
                    tables,
                    functions,
                    procedures,
                )),
                false,
            ),
        };
        if reused {
            reused_count += 1;
        }
        tracing::trace!(schema = %name, reused, "schema loaded");

        on_event(RefreshEvent::SchemaLoaded {
            schema: name.clone(),
            reused,
            position: idx + 1,
            total,
        });
        schemas.insert(name, snapshot);
    }

    on_event(RefreshEvent::Finished {
        schemas: schemas.len(),
        reused: reused_count,
    });
    tracing::info!(schemas = schemas.len(), reused = reused_count, "introspection finished");

    Ok(DatabaseCache::new(connection_name, Utc::now(), schemas))
}
