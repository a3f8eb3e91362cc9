//! Console tabs persisted between sessions
//!
//! The tab list lives in `workspace.json`; each tab's SQL body lives next to
//! it in `<id>.sql`.

use std::path::{Path, PathBuf};

use pgdev_core::Result;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Name given to freshly created consoles
pub const DEFAULT_CONSOLE_NAME: &str = "console.sql";

const STATE_FILE: &str = "workspace.json";

/// One console tab
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsoleState {
    pub id: String,
    pub name: String,
    pub connection_name: Option<String>,
    /// Kept in `<id>.sql`, not in the tab list
    #[serde(skip)]
    pub content: String,
}

#[derive(Debug, Clone)]
pub struct ConsoleStore {
    dir: PathBuf,
}

impl ConsoleStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// A new, empty console bound to `connection_name`
    pub fn new_console(connection_name: Option<&str>) -> ConsoleState {
        ConsoleState {
            id: Uuid::new_v4().to_string(),
            name: DEFAULT_CONSOLE_NAME.to_string(),
            connection_name: connection_name.map(str::to_string),
            content: String::new(),
        }
    }

    fn content_path(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{id}.sql"))
    }

    /// Write the tab list and every tab's body
    #[tracing::instrument(skip_all, fields(consoles = consoles.len()))]
    pub async fn save_state(&self, consoles: &[ConsoleState]) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        for console in consoles {
            self.save_console_content(&console.id, &console.content)
                .await?;
        }
        let content = serde_json::to_string_pretty(consoles)?;
        tokio::fs::write(self.dir.join(STATE_FILE), content).await?;
        Ok(())
    }

    pub async fn save_console_content(&self, id: &str, content: &str) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(self.content_path(id), content).await?;
        Ok(())
    }

    /// The saved tabs with their bodies; no saved state yields no tabs
    ///
    /// A tab whose body file is missing comes back empty.
    #[tracing::instrument(skip(self))]
    pub async fn load_state(&self) -> Result<Vec<ConsoleState>> {
        let state_path = self.dir.join(STATE_FILE);
        if !tokio::fs::try_exists(&state_path).await? {
            return Ok(Vec::new());
        }

        let list = tokio::fs::read_to_string(&state_path).await?;
        let mut consoles: Vec<ConsoleState> = serde_json::from_str(&list)?;
        for console in &mut consoles {
            let path = self.content_path(&console.id);
            if tokio::fs::try_exists(&path).await? {
                console.content = tokio::fs::read_to_string(&path).await?;
            }
        }
        tracing::debug!(count = consoles.len(), "console state loaded");
        Ok(consoles)
    }

    /// Delete a console's body file
    pub async fn remove_console(&self, id: &str) -> Result<()> {
        match tokio::fs::remove_file(self.content_path(id)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
