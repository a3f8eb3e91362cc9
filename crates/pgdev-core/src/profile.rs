//! Connection profiles

use serde::{Deserialize, Serialize};
use std::fmt;


/// A named set of connection parameters for one database target.
///
/// Profiles are immutable values: editing a profile means building a new one
/// and replacing the stored profile wholesale. The serialized field names match
/// the `connections.json` document written by earlier releases.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionProfile {
    name: String,
    host: String,
    port: u16,
    database: String,
    username: String,
    /// Empty or missing means "prompt at connect time"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    password: Option<String>,
    #[serde(default)]
    use_ssl: bool,
}

impl ConnectionProfile {
    /// Create a profile without a stored password and with TLS disabled
    pub fn new(
        name: impl Into<String>,
        host: impl Into<String>,
        port: u16,
        database: impl Into<String>,
        username: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            host: host.into(),
            port,
            database: database.into(),
            username: username.into(),
            password: None,
            use_ssl: false,
        }
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn with_ssl(mut self, use_ssl: bool) -> Self {
        self.use_ssl = use_ssl;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// Stored password, `None` when absent or empty
    pub fn password(&self) -> Option<&str> {
        self.password.as_deref().filter(|p| !p.is_empty())
    }

    /// Whether the caller has to ask the user for a password before connecting
    pub fn needs_password_prompt(&self) -> bool {
        self.password().is_none()
    }

    pub fn use_ssl(&self) -> bool {
        self.use_ssl
    }

    /// Short "name [host/database]" label used by status displays
    pub fn label(&self) -> String {
        format!("{} [{}/{}]", self.name, self.host, self.database)
    }
}

impl fmt::Display for ConnectionProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}@{})", self.name, self.username, self.host)
    }
}
