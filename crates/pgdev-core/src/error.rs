//! Error types for pgdev

use thiserror::Error;

/// Core error type for pgdev operations
#[derive(Error, Debug)]
pub enum PgDevError {
    #[error("Profile not found: {0}")]
    ProfileNotFound(String),

    #[error("No active connection profile selected")]
    NoActiveProfile,

    #[error("Failed to initialize pool for profile {profile}: {source}")]
    PoolInitialization {
        profile: String,
        #[source]
        source: Box<PgDevError>,
    },

    #[error("Introspection failed ({operation}): {source}")]
    Introspection {
        operation: String,
        #[source]
        source: Box<PgDevError>,
    },

    /// Statement failure, carrying the database's message verbatim
    #[error("{0}")]
    QueryExecution(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Pool closed: {0}")]
    PoolClosed(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Index error: {0}")]
    Index(String),

    #[error("Not supported: {0}")]
    NotSupported(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PgDevError {
    /// Wrap a connectivity failure that happened while building a profile's pool
    pub fn pool_initialization(profile: impl Into<String>, source: PgDevError) -> Self {
        Self::PoolInitialization {
            profile: profile.into(),
            source: Box::new(source),
        }
    }

    /// Wrap a failed catalog read
    pub fn introspection(operation: impl Into<String>, source: PgDevError) -> Self {
        Self::Introspection {
            operation: operation.into(),
            source: Box::new(source),
        }
    }
}

/// Result type alias for pgdev operations
pub type Result<T> = std::result::Result<T, PgDevError>;
