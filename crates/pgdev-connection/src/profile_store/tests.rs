//! Tests for the profile store

use super::*;
use pretty_assertions::assert_eq;

fn profile(name: &str, host: &str) -> ConnectionProfile {
    ConnectionProfile::new(name, host, 5432, "app", "postgres")
}

#[test]
fn test_insert_replaces_and_keeps_order() {
    let store = ProfileStore::in_memory();
    assert!(store.insert(profile("dev", "localhost")).is_none());
    assert!(store.insert(profile("prod", "db.internal")).is_none());

    let replaced = store.insert(profile("dev", "127.0.0.1"));
    assert_eq!(replaced.map(|p| p.host().to_string()), Some("localhost".into()));

    let names: Vec<_> = store.ordered().iter().map(|p| p.name().to_string()).collect();
    assert_eq!(names, vec!["dev", "prod"]);
    assert_eq!(store.get("dev").map(|p| p.host().to_string()), Some("127.0.0.1".into()));
    assert_eq!(store.first_name().as_deref(), Some("dev"));
}

#[test]
fn test_first_name_after_removal() {
    let store = ProfileStore::from_profiles([
        profile("a", "h1"),
        profile("b", "h2"),
        profile("c", "h3"),
    ]);
    store.remove("a");
    assert_eq!(store.first_name().as_deref(), Some("b"));
    store.remove("b");
    store.remove("c");
    assert_eq!(store.first_name(), None);
    assert!(store.is_empty());
}

#[test]
fn test_require_missing_profile() {
    let store = ProfileStore::in_memory();
    let err = store.require("ghost").unwrap_err();
    assert!(matches!(err, PgDevError::ProfileNotFound(name) if name == "ghost"));
}

#[test]
fn test_nameless_profile_is_ignored() {
    let store = ProfileStore::in_memory();
    store.insert(profile("  ", "localhost"));
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_save_and_load_round_trip() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("nested").join("connections.json");

    let store = ProfileStore::load(&path).await.expect("load missing file");
    assert!(store.is_empty());
    store.insert(profile("dev", "localhost").with_password("pw"));
    store.insert(profile("prod", "db.internal").with_ssl(true));
    store.save().await.expect("save");

    let reloaded = ProfileStore::load(&path).await.expect("reload");
    assert_eq!(reloaded.ordered(), store.ordered());
    assert_eq!(reloaded.first_name().as_deref(), Some("dev"));
    assert_eq!(reloaded.path(), Some(path.as_path()));
}

#[tokio::test]
async fn test_load_rejects_malformed_document() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("connections.json");
    tokio::fs::write(&path, "{not json").await.expect("write");

    let err = ProfileStore::load(&path).await.unwrap_err();
    assert!(matches!(err, PgDevError::Serialization(_)));
}

#[tokio::test]
async fn test_in_memory_save_is_noop() {
    let store = ProfileStore::from_profiles([profile("dev", "localhost")]);
    store.save().await.expect("save");
    assert!(store.path().is_none());
}
