//! Shared fixtures: a pool manager over the mock driver

#![allow(dead_code)]

use std::sync::Arc;

use pgdev_connection::{PoolManager, ProfileStore};
use pgdev_core::TableRecord;
use pgdev_schema::{CatalogIntrospector, MetadataCache};
use pgdev_test_utils::{MockDatabase, MockDriver, profile};

pub struct Fixture {
    pub db: MockDatabase,
    pub driver: Arc<MockDriver>,
    pub manager: Arc<PoolManager>,
    pub introspector: CatalogIntrospector,
}

impl Fixture {
    /// Profile "dev" over a database with schema "public" holding tables A and B
    pub fn new() -> Self {
        let db = MockDatabase::new();
        db.set_tables(
            "public",
            vec![TableRecord::table("A"), TableRecord::table("B")],
        )
        .set_functions("public", &["now_utc"])
        .set_procedures("public", &["archive"]);

        let driver = Arc::new(MockDriver::new(db.clone()));
        let manager = Arc::new(PoolManager::new(
            driver.clone(),
            ProfileStore::from_profiles([profile("dev")]),
        ));
        let introspector = CatalogIntrospector::new(manager.clone(), "dev");

        Self {
            db,
            driver,
            manager,
            introspector,
        }
    }

    pub fn metadata_cache(&self) -> Arc<MetadataCache> {
        Arc::new(MetadataCache::new(
            "dev",
            Arc::new(self.introspector.clone()),
        ))
    }
}
