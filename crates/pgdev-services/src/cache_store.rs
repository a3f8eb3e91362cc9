//! Metadata cache documents on disk

use std::path::{Path, PathBuf};

use pgdev_core::Result;
use pgdev_schema::DatabaseCache;

/// Replace every character outside `[A-Za-z0-9_-]` with `_`
pub fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// One pretty-printed JSON document per connection, `<dir>/<sanitized>.json`
///
/// Distinct connection names may sanitize to the same file; the document
/// records its connection name and a mismatching one is treated as absent.
#[derive(Debug, Clone)]
pub struct CacheStore {
    dir: PathBuf,
}

impl CacheStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, connection_name: &str) -> PathBuf {
        self.dir
            .join(format!("{}.json", sanitize_file_name(connection_name)))
    }

    #[tracing::instrument(skip(self, cache), fields(connection = %cache.connection_name()))]
    pub async fn save(&self, cache: &DatabaseCache) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.path_for(cache.connection_name());
        let content = serde_json::to_string_pretty(cache)?;
        tokio::fs::write(&path, content).await?;
        tracing::debug!(?path, schemas = cache.schemas().len(), "cache saved");
        Ok(())
    }

    /// The stored cache of a connection, `None` when there is none
    #[tracing::instrument(skip(self))]
    pub async fn load(&self, connection_name: &str) -> Result<Option<DatabaseCache>> {
        let path = self.path_for(connection_name);
        if !tokio::fs::try_exists(&path).await? {
            return Ok(None);
        }
        let content = tokio::fs::read_to_string(&path).await?;
        let cache: DatabaseCache = serde_json::from_str(&content)?;
        if cache.connection_name() != connection_name {
            tracing::warn!(
                stored = %cache.connection_name(),
                "cache file belongs to another connection"
            );
            return Ok(None);
        }
        Ok(Some(cache))
    }

    pub async fn remove(&self, connection_name: &str) -> Result<()> {
        match tokio::fs::remove_file(self.path_for(connection_name)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
