//! PostgreSQL TLS support

use native_tls::TlsConnector;
use pgdev_core::{PgDevError, Result};
use postgres_native_tls::MakeTlsConnector;

/// Build the connector used for profiles with SSL enabled
///
/// The channel is encrypted but the server certificate and host name are not
/// verified, matching `sslmode=require`.
pub fn build_tls_connector() -> Result<MakeTlsConnector> {
    tracing::debug!("building TLS connector without certificate verification");

    let connector = TlsConnector::builder()
        .danger_accept_invalid_certs(true)
        .danger_accept_invalid_hostnames(true)
        .build()
        .map_err(|e| PgDevError::Connection(format!("Failed to build TLS connector: {}", e)))?;

    Ok(MakeTlsConnector::new(connector))
}
