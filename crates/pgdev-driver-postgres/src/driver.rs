//! PostgreSQL driver implementation

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use pgdev_core::{Connection, ConnectionProfile, DatabaseDriver, PgDevError, Result};

use crate::PostgresConnection;

/// PostgreSQL database driver
#[derive(Debug, Clone, Default)]
pub struct PostgresDriver;

impl PostgresDriver {
    pub fn new() -> Self {
        Self
    }

    /// Translate a profile into `tokio_postgres` connection settings
    pub fn config_for(profile: &ConnectionProfile, timeout: Duration) -> tokio_postgres::Config {
        let mut config = tokio_postgres::Config::new();
        config
            .host(profile.host())
            .port(profile.port())
            .dbname(profile.database())
            .user(profile.username())
            .application_name("pgdev")
            .connect_timeout(timeout);
        if let Some(password) = profile.password() {
            config.password(password);
        }
        config
    }
}

#[async_trait]
impl DatabaseDriver for PostgresDriver {
    fn name(&self) -> &'static str {
        "postgresql"
    }

    fn default_port(&self) -> Option<u16> {
        Some(5432)
    }

    #[tracing::instrument(skip(self, profile), fields(profile = %profile.name(), host = %profile.host(), database = %profile.database(), ssl = profile.use_ssl()))]
    async fn connect(
        &self,
        profile: &ConnectionProfile,
        timeout: Duration,
    ) -> Result<Arc<dyn Connection>> {
        let config = Self::config_for(profile, timeout);

        let conn = tokio::time::timeout(timeout, PostgresConnection::connect(config, profile.use_ssl()))
            .await
            .map_err(|_| {
                tracing::error!(?timeout, "timed out connecting to PostgreSQL");
                PgDevError::Timeout(format!(
                    "connecting to {}:{} timed out after {:?}",
                    profile.host(),
                    profile.port(),
                    timeout
                ))
            })?
            .inspect_err(|e| tracing::error!(error = %e, "failed to connect to PostgreSQL"))?;

        tracing::info!("PostgreSQL connection established");
        Ok(Arc::new(conn))
    }
}
