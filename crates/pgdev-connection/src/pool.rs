//! Connection pooling for database connections
//!
//! One pool per profile. Pools are bounded by a semaphore, open their
//! minimum connections eagerly and hand out `PooledConnection` guards that
//! return the connection on drop.
//!
//! # Example
//!
//! ```ignore
//! use pgdev_connection::pool::{ConnectionPool, PoolConfig};
//!
//! let config = PoolConfig::new(1, 5).with_acquire_timeout_ms(5000);
//! let pool = ConnectionPool::open("dev", config, factory).await?;
//! let conn = pool.get().await?;
//! // Use connection...
//! // Connection returned to pool on drop
//! ```

mod config;
mod pool;
mod stats;

#[cfg(test)]
mod tests;

pub use config::PoolConfig;
pub use pool::{ConnectionFactory, ConnectionPool, PooledConnection};
pub use stats::PoolStats;
