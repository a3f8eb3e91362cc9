//! PostgreSQL driver implementation

mod catalog;
mod connection;
mod driver;
mod tls;

pub use connection::PostgresConnection;
pub use driver::PostgresDriver;
pub use tls::build_tls_connector;
