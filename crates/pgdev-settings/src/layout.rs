use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

const APP_DIR: &str = "pgdev";

/// Where pgdev reads and writes its files
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    config_dir: PathBuf,
    data_dir: PathBuf,
}

impl Layout {
    /// The platform's config and data directories
    pub fn system() -> Result<Self> {
        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?
            .join(APP_DIR);
        let data_dir = dirs::data_dir()
            .context("Could not determine data directory")?
            .join(APP_DIR);
        Ok(Self {
            config_dir,
            data_dir,
        })
    }

    /// Both roots under one directory, as `<root>/config` and `<root>/data`
    pub fn rooted(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            config_dir: root.join("config"),
            data_dir: root.join("data"),
        }
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn settings_file(&self) -> PathBuf {
        self.config_dir.join("settings.toml")
    }

    pub fn profiles_file(&self) -> PathBuf {
        self.config_dir.join("connections.json")
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.data_dir.join("cache")
    }

    pub fn workspace_dir(&self) -> PathBuf {
        self.data_dir.join("workspace")
    }

    pub fn index_file(&self) -> PathBuf {
        self.data_dir.join("search_index.db")
    }

    pub fn log_dir(&self) -> PathBuf {
        self.data_dir.join("logs")
    }

    pub fn ensure_directories(&self) -> Result<()> {
        let dirs = [
            self.config_dir.clone(),
            self.data_dir.clone(),
            self.cache_dir(),
            self.workspace_dir(),
            self.log_dir(),
        ];
        for dir in dirs {
            if !dir.exists() {
                std::fs::create_dir_all(&dir)
                    .with_context(|| format!("Failed to create directory: {:?}", dir))?;
            }
        }
        Ok(())
    }
}
