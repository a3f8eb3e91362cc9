//! Tests for connection pool functionality

use std::sync::Arc;
use std::time::Duration;

use pgdev_core::{Connection, PgDevError};
use pgdev_test_utils::{MockDatabase, MockDriver, profile};

use super::config::PoolConfig;
use super::pool::ConnectionPool;
use super::stats::PoolStats;
use crate::ProfileConnectionFactory;

fn driver() -> Arc<MockDriver> {
    Arc::new(MockDriver::new(MockDatabase::new()))
}

fn factory(driver: &Arc<MockDriver>) -> ProfileConnectionFactory {
    ProfileConnectionFactory::new(driver.clone(), profile("dev"), Duration::from_secs(1))
}

// =============================================================================
// PoolConfig tests
// =============================================================================

#[test]
fn test_pool_config_default() {
    let config = PoolConfig::default();
    assert_eq!(config.min_size(), 1);
    assert_eq!(config.max_size(), 5);
    assert_eq!(config.acquire_timeout(), Duration::from_millis(5_000));
    assert_eq!(config.idle_timeout(), Duration::from_millis(600_000));
}

#[test]
fn test_pool_config_with_timeouts() {
    let config = PoolConfig::new(0, 2)
        .with_acquire_timeout_ms(250)
        .with_idle_timeout_ms(1_000);
    assert_eq!(config.acquire_timeout(), Duration::from_millis(250));
    assert_eq!(config.idle_timeout(), Duration::from_millis(1_000));
}

#[test]
#[should_panic(expected = "max_size must be greater than 0")]
fn test_pool_config_invalid_max_size() {
    PoolConfig::new(0, 0);
}

#[test]
#[should_panic(expected = "min_size (10) cannot exceed max_size (5)")]
fn test_pool_config_min_exceeds_max() {
    PoolConfig::new(10, 5);
}

// =============================================================================
// PoolStats tests
// =============================================================================

#[test]
fn test_pool_stats() {
    let stats = PoolStats::new(0, 3, 1, false);
    assert_eq!(stats.total(), 3);
    assert!(stats.is_full());
    assert!(!PoolStats::default().is_full());
}

// =============================================================================
// ConnectionPool tests
// =============================================================================

#[tokio::test]
async fn test_open_warms_min_connections() {
    let driver = driver();
    let pool = ConnectionPool::open("dev", PoolConfig::new(2, 5), factory(&driver))
        .await
        .expect("open");

    assert_eq!(driver.count(), 2);
    let stats = pool.stats();
    assert_eq!(stats.idle(), 2);
    assert_eq!(stats.active(), 0);
    assert_eq!(pool.name(), "dev");
}

#[tokio::test]
async fn test_get_reuses_idle_connection() {
    let driver = driver();
    let pool = ConnectionPool::open("dev", PoolConfig::new(1, 5), factory(&driver))
        .await
        .expect("open");

    {
        let conn = pool.get().await.expect("first get");
        assert_eq!(conn.pool_id(), pool.id());
        assert_eq!(pool.stats().active(), 1);
        conn.ping().await.expect("ping");
    }
    assert_eq!(pool.stats().idle(), 1);

    let _conn = pool.get().await.expect("second get");
    assert_eq!(driver.count(), 1);
}

#[tokio::test]
async fn test_get_grows_up_to_max() {
    let driver = driver();
    let pool = ConnectionPool::open("dev", PoolConfig::new(0, 3), factory(&driver))
        .await
        .expect("open");
    assert_eq!(driver.count(), 0);

    let a = pool.get().await.expect("a");
    let b = pool.get().await.expect("b");
    let c = pool.get().await.expect("c");
    assert_eq!(driver.count(), 3);
    assert!(pool.stats().is_full());
    drop((a, b, c));
    assert_eq!(pool.stats().idle(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_get_times_out_when_exhausted() {
    let driver = driver();
    let config = PoolConfig::new(1, 1).with_acquire_timeout_ms(100);
    let pool = ConnectionPool::open("dev", config, factory(&driver))
        .await
        .expect("open");

    let _held = pool.get().await.expect("held");
    let err = pool.get().await.unwrap_err();
    assert!(matches!(err, PgDevError::Timeout(_)), "got {err:?}");
    assert_eq!(pool.stats().waiting(), 0);
}

#[tokio::test]
async fn test_waiter_gets_returned_connection() {
    let driver = driver();
    let pool = ConnectionPool::open("dev", PoolConfig::new(1, 1), factory(&driver))
        .await
        .expect("open");

    let held = pool.get().await.expect("held");
    let waiter = {
        let pool = pool.clone();
        tokio::spawn(async move { pool.get().await.map(|c| c.pool_id()) })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    drop(held);

    let pool_id = waiter.await.expect("join").expect("waiter get");
    assert_eq!(pool_id, pool.id());
    assert_eq!(driver.count(), 1);
}

#[tokio::test]
async fn test_open_failure_returns_cause() {
    let driver = driver();
    driver.fail_connections(true);
    let err = ConnectionPool::open("dev", PoolConfig::new(1, 2), factory(&driver))
        .await
        .unwrap_err();
    assert!(matches!(err, PgDevError::Connection(_)));
    assert_eq!(driver.count(), 0);
}

#[tokio::test]
async fn test_min_zero_pool_defers_connecting() {
    let driver = driver();
    driver.fail_connections(true);
    let pool = ConnectionPool::open("dev", PoolConfig::new(0, 2), factory(&driver))
        .await
        .expect("open without warm-up");

    let err = pool.get().await.unwrap_err();
    assert!(matches!(err, PgDevError::Connection(_)));
    assert_eq!(pool.stats().active(), 0);
    assert_eq!(pool.stats().waiting(), 0);
}

#[tokio::test]
async fn test_closed_connection_is_not_returned() {
    let driver = driver();
    let pool = ConnectionPool::open("dev", PoolConfig::new(1, 2), factory(&driver))
        .await
        .expect("open");

    {
        let conn = pool.get().await.expect("get");
        conn.close().await.expect("close");
    }
    assert_eq!(pool.stats().idle(), 0);
    assert_eq!(pool.stats().active(), 0);

    let conn = pool.get().await.expect("get after close");
    assert!(!conn.is_closed());
    assert_eq!(driver.count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_idle_timeout_discards_stale_connection() {
    let driver = driver();
    let config = PoolConfig::new(1, 2).with_idle_timeout_ms(1_000);
    let pool = ConnectionPool::open("dev", config, factory(&driver))
        .await
        .expect("open");

    tokio::time::advance(Duration::from_secs(2)).await;
    let _conn = pool.get().await.expect("get");

    assert_eq!(driver.count(), 2);
    let connections = driver.connections();
    assert!(connections[0].is_closed());
    assert!(!connections[1].is_closed());
}

#[tokio::test]
async fn test_close_refuses_borrows_and_is_idempotent() {
    let driver = driver();
    let pool = ConnectionPool::open("dev", PoolConfig::new(2, 3), factory(&driver))
        .await
        .expect("open");

    let borrowed = pool.get().await.expect("get");
    pool.close().await;
    pool.close().await;

    assert!(pool.is_closed());
    assert!(pool.stats().is_closed());
    let err = pool.get().await.unwrap_err();
    assert!(matches!(err, PgDevError::PoolClosed(name) if name == "dev"));

    // The idle connection is closed at once, the borrowed one on return
    assert_eq!(driver.open_connections(), 1);
    drop(borrowed);
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(driver.open_connections(), 0);
}

#[tokio::test]
async fn test_close_wakes_waiters() {
    let driver = driver();
    let pool = ConnectionPool::open("dev", PoolConfig::new(1, 1), factory(&driver))
        .await
        .expect("open");

    let _held = pool.get().await.expect("held");
    let waiter = {
        let pool = pool.clone();
        tokio::spawn(async move { pool.get().await.map(|_| ()) })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    pool.close().await;

    let err = waiter.await.expect("join").unwrap_err();
    assert!(matches!(err, PgDevError::PoolClosed(_)));
}
