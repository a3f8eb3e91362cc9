//! Connection factory bound to a profile

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use pgdev_core::{Connection, ConnectionProfile, DatabaseDriver, Result};

use crate::pool::ConnectionFactory;

/// Opens connections for one profile through a driver
///
/// The profile is captured by value: a pool keeps connecting with the
/// parameters it was built with even if the stored profile is replaced.
pub struct ProfileConnectionFactory {
    driver: Arc<dyn DatabaseDriver>,
    profile: ConnectionProfile,
    connect_timeout: Duration,
}

impl ProfileConnectionFactory {
    pub fn new(
        driver: Arc<dyn DatabaseDriver>,
        profile: ConnectionProfile,
        connect_timeout: Duration,
    ) -> Self {
        Self {
            driver,
            profile,
            connect_timeout,
        }
    }

    pub fn profile(&self) -> &ConnectionProfile {
        &self.profile
    }
}

#[async_trait]
impl ConnectionFactory for ProfileConnectionFactory {
    async fn create(&self) -> Result<Arc<dyn Connection>> {
        tracing::debug!(
            profile = %self.profile.name(),
            driver = self.driver.name(),
            host = %self.profile.host(),
            "opening connection"
        );
        self.driver
            .connect(&self.profile, self.connect_timeout)
            .await
    }
}
