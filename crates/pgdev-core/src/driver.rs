//! Database driver trait definition

use crate::{Connection, ConnectionProfile, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Connection factory implemented by each database driver
#[async_trait]
pub trait DatabaseDriver: Send + Sync {
    /// Unique identifier for this driver (e.g., "postgres")
    fn name(&self) -> &'static str;

    /// Default connection port
    fn default_port(&self) -> Option<u16> {
        None
    }

    /// Open a new connection for a profile
    ///
    /// Establishment must give up after `timeout` and report
    /// `PgDevError::Timeout` instead of hanging.
    async fn connect(
        &self,
        profile: &ConnectionProfile,
        timeout: Duration,
    ) -> Result<Arc<dyn Connection>>;
}
