use super::*;
use pretty_assertions::assert_eq;

#[test]
fn missing_file_gives_defaults() {
    let dir = tempfile::tempdir().expect("tempdir");
    let settings = AppSettings::load(&dir.path().join("settings.toml")).expect("load");
    assert_eq!(settings, AppSettings::default());
    assert_eq!(settings.pool_config().expect("pool"), PoolConfig::default());
    assert!(settings.persist_cache);
}

#[test]
fn partial_file_keeps_other_defaults() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("settings.toml");
    std::fs::write(&path, "pool_max_size = 12\nlog_json = true\n").expect("write");

    let settings = AppSettings::load(&path).expect("load");
    assert_eq!(settings.pool_max_size, 12);
    assert!(settings.log_json);
    assert_eq!(settings.pool_min_size, 1);
    assert_eq!(settings.connect_timeout(), Duration::from_secs(5));

    let pool = settings.pool_config().expect("pool");
    assert_eq!(pool.max_size(), 12);
    assert_eq!(pool.acquire_timeout(), Duration::from_secs(5));
}

#[test]
fn save_then_load() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("nested").join("settings.toml");
    let settings = AppSettings {
        pool_min_size: 2,
        pool_max_size: 8,
        persist_cache: false,
        active_profile: Some("dev".into()),
        ..AppSettings::default()
    };
    settings.save(&path).expect("save");
    assert_eq!(AppSettings::load(&path).expect("load"), settings);
}

#[test]
fn invalid_pool_bounds_are_rejected() {
    let settings = AppSettings {
        pool_min_size: 6,
        pool_max_size: 3,
        ..AppSettings::default()
    };
    let err = settings.pool_config().unwrap_err();
    assert_eq!(err.to_string(), "pool_min_size (6) cannot exceed pool_max_size (3)");

    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("settings.toml");
    std::fs::write(&path, "pool_max_size = 0\n").expect("write");
    assert!(AppSettings::load(&path).is_err());
}

#[test]
fn malformed_file_is_an_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("settings.toml");
    std::fs::write(&path, "pool_max_size = \"many\"\n").expect("write");
    let err = AppSettings::load(&path).unwrap_err();
    assert!(err.to_string().contains("Failed to parse settings TOML"));
}
