//! Testing utilities for pgdev
//!
//! This crate provides common testing components:
//! - `MockDatabase` - mutable in-memory catalog shared by every connection
//! - `MockDriver` - connection factory counting connects, with injectable failures
//! - `MockConnection` - `Connection` + `CatalogReflection` over a `MockDatabase`

pub mod mock_database;
pub mod mock_driver;

pub use mock_database::MockDatabase;
pub use mock_driver::{MockConnection, MockDriver};

use pgdev_core::ConnectionProfile;

/// Profile pointing at the mock driver
pub fn profile(name: &str) -> ConnectionProfile {
    ConnectionProfile::new(name, "localhost", 5432, "app", "postgres").with_password("secret")
}
