//! Tests for incremental introspection and the metadata cache

mod common;

use std::sync::Arc;

use common::Fixture;
use pgdev_core::{PgDevError, TableRecord};
use pgdev_schema::{DatabaseCache, RefreshEvent, introspect, introspect_with};
use tokio_util::sync::CancellationToken;
use pretty_assertions::assert_eq;

#[tokio::test]
async fn second_introspection_reuses_unchanged_snapshots() {
    let fx = Fixture::new();
    fx.db.set_tables("sales", vec![TableRecord::table("orders")]);

    let first = introspect(&fx.introspector, "dev", None).await.expect("first");
    assert_eq!(first.schemas().len(), 2);
    assert_eq!(first.schema("public").expect("public").tables().len(), 2);

    let second = introspect(&fx.introspector, "dev", Some(&first))
        .await
        .expect("second");

    assert_eq!(second.schema_names(), first.schema_names());
    for (name, snapshot) in first.schemas() {
        let again = second.schema(name).expect("schema kept");
        assert!(Arc::ptr_eq(snapshot, again), "{name} was rebuilt");
    }
    assert!(second.captured_at() >= first.captured_at());
}

#[tokio::test]
async fn new_table_replaces_only_its_schema() {
    let fx = Fixture::new();
    fx.db.set_tables("sales", vec![TableRecord::table("orders")]);
    let first = introspect(&fx.introspector, "dev", None).await.expect("first");

    fx.db.add_table("sales", TableRecord::table("invoices"));
    let second = introspect(&fx.introspector, "dev", Some(&first))
        .await
        .expect("second");

    let old_sales = first.schema("sales").expect("sales");
    let new_sales = second.schema("sales").expect("sales");
    assert!(!Arc::ptr_eq(old_sales, new_sales));
    assert!(new_sales.tables().contains(&TableRecord::table("invoices")));
    assert!(Arc::ptr_eq(
        first.schema("public").expect("public"),
        second.schema("public").expect("public"),
    ));
}

#[tokio::test]
async fn reordered_functions_are_reused_but_reordered_procedures_are_not() {
    let fx = Fixture::new();
    fx.db
        .set_functions("public", &["a", "b"])
        .set_procedures("public", &["p", "q"]);
    let first = introspect(&fx.introspector, "dev", None).await.expect("first");

    fx.db.set_functions("public", &["b", "a"]);
    let second = introspect(&fx.introspector, "dev", Some(&first))
        .await
        .expect("second");
    assert!(Arc::ptr_eq(
        first.schema("public").expect("public"),
        second.schema("public").expect("public"),
    ));

    fx.db.set_procedures("public", &["q", "p"]);
    let third = introspect(&fx.introspector, "dev", Some(&second))
        .await
        .expect("third");
    let public = third.schema("public").expect("public");
    assert!(!Arc::ptr_eq(second.schema("public").expect("public"), public));
    assert_eq!(public.procedures().to_vec(), vec!["q", "p"]);
}

#[tokio::test]
async fn dropped_schemas_disappear_and_new_ones_appear() {
    let fx = Fixture::new();
    fx.db.add_schema("staging");
    let first = introspect(&fx.introspector, "dev", None).await.expect("first");
    assert!(first.schema("staging").is_some());

    fx.db.drop_schema("staging").add_schema("reporting");
    let second = introspect(&fx.introspector, "dev", Some(&first))
        .await
        .expect("second");

    assert_eq!(second.schema_names(), vec!["public", "reporting"]);
    assert!(second.schema("reporting").expect("reporting").tables().is_empty());
}

#[tokio::test]
async fn refresh_failure_keeps_current_cache() {
    let fx = Fixture::new();
    let cache = fx.metadata_cache();
    let published = cache.refresh().await.expect("refresh");

    fx.db.add_table("public", TableRecord::table("C"));
    fx.db.fail_schema(Some("public"));
    let err = cache.refresh().await.unwrap_err();
    assert!(matches!(err, PgDevError::Introspection { .. }));

    let current = cache.current().expect("still published");
    assert!(Arc::ptr_eq(&current, &published));
    assert_eq!(
        cache.get_tables("public").await.expect("tables"),
        vec![TableRecord::table("A"), TableRecord::table("B")]
    );

    fx.db.fail_schema(None);
    let refreshed = cache.refresh().await.expect("refresh after recovery");
    assert_eq!(refreshed.schema("public").expect("public").tables().len(), 3);
}

#[tokio::test]
async fn reads_fall_back_to_live_before_first_refresh() {
    let fx = Fixture::new();
    let cache = fx.metadata_cache();
    assert!(cache.current().is_none());

    assert_eq!(cache.get_schemas().await.expect("schemas"), vec!["public"]);
    assert_eq!(
        cache.get_functions("public").await.expect("functions"),
        vec!["now_utc"]
    );
    let live_calls = fx.db.catalog_calls();

    cache.refresh().await.expect("refresh");
    let after_refresh = fx.db.catalog_calls();
    assert!(after_refresh > live_calls);

    assert_eq!(cache.get_tables("public").await.expect("tables").len(), 2);
    assert_eq!(
        cache.get_procedures("public").await.expect("procedures"),
        vec!["archive"]
    );
    assert!(cache.get_tables("nowhere").await.expect("tables").is_empty());
    assert!(cache.get_functions("nowhere").await.expect("functions").is_empty());
    assert_eq!(fx.db.catalog_calls(), after_refresh, "cached reads hit the database");
}

#[tokio::test]
async fn publish_checks_connection_name() {
    let fx = Fixture::new();
    let cache = fx.metadata_cache();

    let restored = introspect(&fx.introspector, "dev", None).await.expect("introspect");
    let published = cache.publish(restored).expect("publish");
    assert!(Arc::ptr_eq(&cache.current().expect("current"), &published));

    let foreign = DatabaseCache::new("prod", chrono::Utc::now(), Default::default());
    let err = cache.publish(foreign).unwrap_err();
    assert!(matches!(err, PgDevError::Configuration(_)));

    // A refresh after a restore diffs against the restored snapshots
    let refreshed = cache.refresh().await.expect("refresh");
    assert!(Arc::ptr_eq(
        published.schema("public").expect("public"),
        refreshed.schema("public").expect("public"),
    ));

    cache.clear();
    assert!(cache.current().is_none());
}

#[tokio::test]
async fn background_refresh_reports_progress() {
    let fx = Fixture::new();
    fx.db.add_schema("sales");
    let cache = fx.metadata_cache();

    let (events, result) = cache.spawn_refresh().collect().await;
    let published = result.expect("refresh");
    assert!(Arc::ptr_eq(&published, &cache.current().expect("current")));

    assert_eq!(
        events,
        vec![
            RefreshEvent::Started {
                connection: "dev".into()
            },
            RefreshEvent::SchemaListed {
                schemas: vec!["public".into(), "sales".into()]
            },
            RefreshEvent::SchemaLoaded {
                schema: "public".into(),
                reused: false,
                position: 1,
                total: 2,
            },
            RefreshEvent::SchemaLoaded {
                schema: "sales".into(),
                reused: false,
                position: 2,
                total: 2,
            },
            RefreshEvent::Finished {
                schemas: 2,
                reused: 0
            },
        ]
    );

    let (events, result) = cache.spawn_refresh().collect().await;
    result.expect("second refresh");
    assert_eq!(
        events.last(),
        Some(&RefreshEvent::Finished {
            schemas: 2,
            reused: 2
        })
    );
}

#[tokio::test]
async fn cancelled_refresh_keeps_current_cache() {
    let fx = Fixture::new();
    let cache = fx.metadata_cache();
    let published = cache.refresh().await.expect("refresh");

    fx.db.add_table("public", TableRecord::table("C"));
    let handle = cache.spawn_refresh();
    handle.cancel();
    let err = handle.join().await.unwrap_err();

    assert!(matches!(err, PgDevError::Cancelled));
    assert!(Arc::ptr_eq(&cache.current().expect("current"), &published));
}

#[tokio::test]
async fn cancellation_between_schemas() {
    let fx = Fixture::new();
    fx.db.add_schema("sales").add_schema("staging");
    let cancel = CancellationToken::new();

    let mut loaded = Vec::new();
    let result = introspect_with(&fx.introspector, "dev", None, &cancel, |event| match event {
        RefreshEvent::SchemaLoaded { schema, .. } => {
            loaded.push(schema);
            cancel.cancel();
        }
        _ => {}
    })
    .await;

    assert!(matches!(result, Err(PgDevError::Cancelled)));
    assert_eq!(loaded, vec!["public"]);
}

#[tokio::test]
async fn staged_cache_is_invisible_until_committed() {
    let fx = Fixture::new();
    let cache = fx.metadata_cache();
    let published = cache.refresh().await.expect("refresh");

    fx.db.add_table("public", TableRecord::table("C"));
    let staged = cache
        .stage_refresh(&CancellationToken::new(), |_| {})
        .await
        .expect("stage");
    assert_eq!(staged.cache().schema("public").expect("public").tables().len(), 3);
    let current = cache.current().expect("current");
    assert!(Arc::ptr_eq(&current, &published));

    // Dropping discards the new cache
    drop(staged);
    let current = cache.current().expect("current");
    assert!(Arc::ptr_eq(&current, &published));

    let staged = cache
        .stage_refresh(&CancellationToken::new(), |_| {})
        .await
        .expect("stage");
    let committed = staged.commit();
    let current = cache.current().expect("current");
    assert!(Arc::ptr_eq(&current, &committed));
    assert_eq!(cache.get_tables("public").await.expect("tables").len(), 3);
}

#[tokio::test]
async fn staging_a_foreign_cache_is_rejected() {
    let fx = Fixture::new();
    let cache = fx.metadata_cache();
    let foreign = DatabaseCache::new("prod", chrono::Utc::now(), Default::default());

    let err = cache.stage(foreign).await.err().expect("foreign cache rejected");
    assert!(matches!(err, PgDevError::Configuration(_)));
    assert!(cache.current().is_none());
}
