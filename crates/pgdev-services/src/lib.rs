//! pgdev Services Layer
//!
//! Orchestration that sits between a front end and the domain crates.
//!
//! ```text
//! Front end (pgdev-cli)
//!     ↓
//! Service Layer (pgdev-services) ← This crate
//!     ↓
//! Domain Layer (pgdev-connection, pgdev-schema, pgdev-index)
//!     ↓
//! Infrastructure Layer (pgdev-core, pgdev-driver-postgres)
//! ```
//!
//! # Services
//!
//! - [`CatalogService`] - refresh, publish, index rebuild and cache persistence
//! - [`QueryExecutor`] - ad-hoc statements against the active profile
//! - [`CacheStore`] - metadata cache documents on disk
//! - [`ConsoleStore`] - console tabs and their SQL bodies

mod cache_store;
mod catalog_service;
mod console_store;
mod query_executor;

pub use cache_store::{CacheStore, sanitize_file_name};
pub use catalog_service::{CatalogService, records_from_cache};
pub use console_store::{ConsoleState, ConsoleStore, DEFAULT_CONSOLE_NAME};
pub use query_executor::QueryExecutor;
