use anyhow::{Context, Result, ensure};
use pgdev_connection::PoolConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Contents of `settings.toml`
///
/// Every key is optional; missing keys take their default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub pool_min_size: usize,
    pub pool_max_size: usize,
    pub acquire_timeout_ms: u64,
    pub idle_timeout_ms: u64,
    pub connect_timeout_ms: u64,
    /// Write each refreshed metadata cache to disk and restore it on startup
    pub persist_cache: bool,
    /// Also write JSON logs to a daily file under the log directory
    pub log_json: bool,
    /// Profile selected with `pgdev profile use`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_profile: Option<String>,
}

impl Default for AppSettings {
    fn default() -> Self {
        let pool = PoolConfig::default();
        Self {
            pool_min_size: pool.min_size(),
            pool_max_size: pool.max_size(),
            acquire_timeout_ms: pool.acquire_timeout().as_millis() as u64,
            idle_timeout_ms: pool.idle_timeout().as_millis() as u64,
            connect_timeout_ms: 5_000,
            persist_cache: true,
            log_json: false,
            active_profile: None,
        }
    }
}

impl AppSettings {
    /// Load settings, falling back to defaults when the file does not exist
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {:?}", path))?;
        let settings: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse settings TOML at {:?}", path))?;
        settings.validate()?;
        tracing::debug!(?path, "settings loaded");
        Ok(settings)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.pool_max_size > 0,
            "pool_max_size must be greater than 0, got {}",
            self.pool_max_size
        );
        ensure!(
            self.pool_min_size <= self.pool_max_size,
            "pool_min_size ({}) cannot exceed pool_max_size ({})",
            self.pool_min_size,
            self.pool_max_size
        );
        ensure!(self.acquire_timeout_ms > 0, "acquire_timeout_ms must be positive");
        ensure!(self.connect_timeout_ms > 0, "connect_timeout_ms must be positive");
        Ok(())
    }

    pub fn pool_config(&self) -> Result<PoolConfig> {
        self.validate()?;
        Ok(PoolConfig::new(self.pool_min_size, self.pool_max_size)
            .with_acquire_timeout_ms(self.acquire_timeout_ms)
            .with_idle_timeout_ms(self.idle_timeout_ms))
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

#[cfg(test)]
mod tests;
