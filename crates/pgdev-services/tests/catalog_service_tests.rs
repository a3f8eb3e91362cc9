//! Refresh → publish → index rebuild → persist

use std::sync::Arc;

use pgdev_connection::{PoolManager, ProfileStore};
use pgdev_core::{ConnectionProfile, PgDevError, TableRecord};
use pgdev_index::{ObjectKind, SearchIndex, SearchRecord};
use pgdev_services::{CacheStore, CatalogService, records_from_cache};
use pgdev_test_utils::{MockDatabase, MockDriver, profile};
use pretty_assertions::assert_eq;

fn database() -> MockDatabase {
    let db = MockDatabase::new();
    db.set_tables(
        "public",
        vec![TableRecord::table("users"), TableRecord::table("orders")],
    )
    .set_functions("public", &["order_total"])
    .set_procedures("public", &["archive_orders"]);
    db
}

fn service(db: &MockDatabase) -> CatalogService {
    let driver = Arc::new(MockDriver::new(db.clone()));
    let manager = Arc::new(PoolManager::new(
        driver,
        ProfileStore::from_profiles([profile("dev")]),
    ));
    let index = Arc::new(SearchIndex::in_memory().expect("index"));
    CatalogService::new(manager, index)
}

#[tokio::test]
async fn refresh_rebuilds_the_index() {
    let db = database();
    let service = service(&db);
    assert!(service.index().is_empty().expect("is_empty"));

    let cache = service.refresh_active().await.expect("refresh");
    assert_eq!(
        service.index().records().expect("records"),
        records_from_cache(&cache)
    );

    let found = service.search("ord").await.expect("search");
    assert_eq!(
        found,
        vec![
            SearchRecord::new("orders", ObjectKind::Table, "public"),
            SearchRecord::new("order_total", ObjectKind::Function, "public"),
            SearchRecord::new("archive_orders", ObjectKind::Procedure, "public"),
        ]
    );
}

#[tokio::test]
async fn index_follows_dropped_objects() {
    let db = database();
    let service = service(&db);
    service.refresh("dev").await.expect("refresh");

    db.set_tables("public", vec![TableRecord::table("users")]);
    db.add_table("public", TableRecord::view("recent_users"));
    service.refresh("dev").await.expect("refresh");

    let names: Vec<_> = service
        .index()
        .records()
        .expect("records")
        .into_iter()
        .map(|r| (r.name, r.kind))
        .collect();
    assert_eq!(
        names,
        vec![
            ("public".to_string(), ObjectKind::Schema),
            ("users".to_string(), ObjectKind::Table),
            ("recent_users".to_string(), ObjectKind::View),
            ("order_total".to_string(), ObjectKind::Function),
            ("archive_orders".to_string(), ObjectKind::Procedure),
        ]
    );
}

#[tokio::test]
async fn failed_refresh_keeps_cache_and_index() {
    let db = database();
    let service = service(&db);
    let published = service.refresh("dev").await.expect("refresh");
    let before = service.index().records().expect("records");

    db.add_table("public", TableRecord::table("invoices"));
    db.fail_schema(Some("public"));
    let err = service.refresh("dev").await.unwrap_err();
    assert!(matches!(err, PgDevError::Introspection { .. }));

    assert_eq!(service.index().records().expect("records"), before);
    let current = service.metadata_cache("dev").current().expect("current");
    assert!(Arc::ptr_eq(&current, &published));
}

#[tokio::test]
async fn failed_index_rebuild_keeps_cache_index_and_stored_copy() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db = database();
    let service = service(&db).with_cache_store(CacheStore::new(dir.path()));
    let published = service.refresh("dev").await.expect("refresh");
    let before = service.index().records().expect("records");

    // The index refuses records with an empty name
    db.add_table("public", TableRecord::table("invoices"));
    db.add_table("public", TableRecord::table(""));
    let err = service.refresh("dev").await.unwrap_err();
    assert!(matches!(err, PgDevError::Index(_)));

    let current = service.metadata_cache("dev").current().expect("current");
    assert!(Arc::ptr_eq(&current, &published));
    assert_eq!(service.index().records().expect("records"), before);
    assert!(service.search("invoices").await.expect("search").is_empty());

    let stored = CacheStore::new(dir.path())
        .load("dev")
        .await
        .expect("load")
        .expect("stored");
    assert_eq!(stored, *published);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_refreshes_leave_the_index_on_one_cache() {
    let sales = MockDatabase::new();
    sales
        .set_tables("sales", vec![TableRecord::table("invoices")])
        .set_functions("sales", &["invoice_total"]);
    let driver = Arc::new(MockDriver::new(database()).with_database("sales", sales));
    let manager = Arc::new(PoolManager::new(
        driver,
        ProfileStore::from_profiles([
            profile("dev"),
            ConnectionProfile::new("sales", "localhost", 5432, "sales", "postgres"),
        ]),
    ));
    let service = Arc::new(CatalogService::new(
        manager,
        Arc::new(SearchIndex::in_memory().expect("index")),
    ));

    for _ in 0..10 {
        let dev = tokio::spawn({
            let service = service.clone();
            async move { service.refresh("dev").await }
        });
        let sales = tokio::spawn({
            let service = service.clone();
            async move { service.refresh("sales").await }
        });
        let dev = dev.await.expect("join").expect("refresh dev");
        let sales = sales.await.expect("join").expect("refresh sales");

        let indexed = service.index().records().expect("records");
        assert!(
            indexed == records_from_cache(&dev) || indexed == records_from_cache(&sales),
            "index mixes two caches: {indexed:?}"
        );
    }

    service.refresh("sales").await.expect("refresh");
    assert_eq!(
        service.search("invoice").await.expect("search"),
        vec![
            SearchRecord::new("invoices", ObjectKind::Table, "sales"),
            SearchRecord::new("invoice_total", ObjectKind::Function, "sales"),
        ]
    );
}

#[tokio::test]
async fn refresh_requires_a_profile() {
    let db = database();
    let service = service(&db);

    let err = service.refresh("ghost").await.unwrap_err();
    assert!(matches!(err, PgDevError::ProfileNotFound(_)));

    service.manager().remove_profile("dev").await.expect("remove");
    let err = service.refresh_active().await.unwrap_err();
    assert!(matches!(err, PgDevError::NoActiveProfile));
}

#[tokio::test]
async fn persisted_cache_is_restored_into_a_new_session() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db = database();

    let first = service(&db).with_cache_store(CacheStore::new(dir.path()));
    let refreshed = first.refresh("dev").await.expect("refresh");

    let second = service(&db).with_cache_store(CacheStore::new(dir.path()));
    let restored = second.restore("dev").await.expect("restore").expect("stored");
    assert_eq!(*restored, *refreshed);
    assert_eq!(
        second.search("users").await.expect("search"),
        vec![SearchRecord::new("users", ObjectKind::Table, "public")]
    );

    // Tables are served from the restored cache without touching the database
    let calls = db.catalog_calls();
    let tables = second
        .metadata_cache("dev")
        .get_tables("public")
        .await
        .expect("tables");
    assert_eq!(tables.len(), 2);
    assert_eq!(db.catalog_calls(), calls);

    second.forget("dev").await.expect("forget");
    assert!(second.restore("dev").await.expect("restore").is_none());
}

#[tokio::test]
async fn restore_without_store_is_a_no_op() {
    let db = database();
    let service = service(&db);
    assert!(service.restore("dev").await.expect("restore").is_none());
}
