//! pgdev Core - Core abstractions and traits for the database IDE backend
//!
//! This crate provides the fundamental traits and types that all other
//! pgdev crates depend on. It defines:
//!
//! - `DatabaseDriver` - Connection factory implemented by database drivers
//! - `Connection` - Trait for a live database connection
//! - `CatalogReflection` - Catalog metadata access (schemas, tables, routines)
//! - `ConnectionProfile` - Named connection parameters
//! - Common types like `Value`, `Row`, `QueryResult`, `TableRecord`

mod catalog;
mod connection;
mod driver;
mod error;
mod profile;
mod types;

pub use catalog::*;
pub use connection::*;
pub use driver::*;
pub use error::*;
pub use profile::*;
pub use types::*;
