//! pgdev connection - profile registry and connection pooling
//!
//! `PoolManager` is the single entry point: it owns the profile store, tracks
//! the active profile and lazily builds at most one `ConnectionPool` per
//! profile name.

mod factory;
mod manager;
pub mod pool;
mod profile_store;

pub use factory::ProfileConnectionFactory;
pub use manager::{NO_CONNECTION_LABEL, PoolManager};
pub use pool::{ConnectionFactory, ConnectionPool, PoolConfig, PoolStats, PooledConnection};
pub use profile_store::ProfileStore;
