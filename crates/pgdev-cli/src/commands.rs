//! Command handlers

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use pgdev_connection::{PoolManager, ProfileStore};
use pgdev_core::{ConnectionProfile, PgDevError};
use pgdev_driver_postgres::PostgresDriver;
use pgdev_index::SearchIndex;
use pgdev_schema::{CatalogIntrospector, RefreshEvent};
use pgdev_services::{CacheStore, CatalogService, QueryExecutor};
use pgdev_settings::{AppSettings, Layout};
use tokio_util::sync::CancellationToken;

use crate::output;

pub struct App {
    layout: Layout,
    settings: AppSettings,
    manager: Arc<PoolManager>,
    catalog: CatalogService,
}

impl App {
    pub async fn open(layout: Layout, settings: AppSettings) -> Result<Self> {
        let store = ProfileStore::load(&layout.profiles_file())
            .await
            .context("Failed to load connection profiles")?;
        let manager = PoolManager::new(Arc::new(PostgresDriver::new()), store)
            .with_pool_config(settings.pool_config()?)
            .with_connect_timeout(settings.connect_timeout());

        if let Some(active) = settings.active_profile.as_deref() {
            if let Err(e) = manager.set_active_profile(active) {
                tracing::warn!(error = %e, "saved active profile no longer exists");
            }
        }
        let manager = Arc::new(manager);

        let index = SearchIndex::open(layout.index_file())
            .context("Failed to open the search index")?;
        let mut catalog = CatalogService::new(manager.clone(), Arc::new(index));
        if settings.persist_cache {
            catalog = catalog.with_cache_store(CacheStore::new(layout.cache_dir()));
        }

        Ok(Self {
            layout,
            settings,
            manager,
            catalog,
        })
    }

    pub async fn shutdown(&self) {
        self.manager.disconnect_all().await;
    }

    fn resolve(&self, name: Option<&str>) -> Result<String> {
        match name {
            Some(name) => Ok(name.to_string()),
            None => self
                .manager
                .active_profile_name()
                .ok_or(PgDevError::NoActiveProfile)
                .context("Pass a profile name or select one with `pgdev profile use`"),
        }
    }

    pub async fn add_profile(&self, profile: ConnectionProfile) -> Result<ExitCode> {
        let name = profile.name().to_string();
        let replaced = self.manager.profile(&name).is_some();
        self.manager.add_profile(profile).await?;
        if replaced {
            // The catalog may belong to a different database now
            self.catalog.forget(&name).await?;
            println!("Updated profile {name}");
        } else {
            println!("Added profile {name}");
        }
        Ok(ExitCode::SUCCESS)
    }

    pub fn list_profiles(&self) -> ExitCode {
        let profiles = self.manager.profiles();
        if profiles.is_empty() {
            println!("No profiles. Add one with `pgdev profile add`.");
            return ExitCode::SUCCESS;
        }
        let active = self.manager.active_profile_name();
        println!("{}", output::profiles_table(profiles.values(), active.as_deref()));
        ExitCode::SUCCESS
    }

    pub async fn remove_profile(&self, name: &str) -> Result<ExitCode> {
        self.manager.remove_profile(name).await?;
        self.catalog.forget(name).await?;
        println!("Removed profile {name}");
        Ok(ExitCode::SUCCESS)
    }

    pub fn use_profile(&self, name: &str) -> Result<ExitCode> {
        self.manager.set_active_profile(name)?;
        let settings = AppSettings {
            active_profile: Some(name.to_string()),
            ..self.settings.clone()
        };
        settings.save(&self.layout.settings_file())?;
        println!("Active profile: {}", self.manager.connection_label());
        Ok(ExitCode::SUCCESS)
    }

    pub async fn test(&self, name: Option<&str>) -> Result<ExitCode> {
        let name = self.resolve(name)?;
        self.manager.store().require(&name)?;
        if self.manager.test_connection(&name).await {
            println!("{name}: OK");
            Ok(ExitCode::SUCCESS)
        } else {
            println!("{name}: FAILED");
            Ok(ExitCode::FAILURE)
        }
    }

    pub async fn refresh(&self, name: Option<&str>) -> Result<ExitCode> {
        let name = self.resolve(name)?;
        let cancel = CancellationToken::new();
        let ctrl_c = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    eprintln!("cancelling after the current schema...");
                    cancel.cancel();
                }
            })
        };

        let result = self
            .catalog
            .refresh_with(&name, &cancel, |event| {
                if let RefreshEvent::SchemaLoaded {
                    schema,
                    reused,
                    position,
                    total,
                } = event
                {
                    let state = if reused { "unchanged" } else { "loaded" };
                    eprintln!("[{position}/{total}] {schema} {state}");
                }
            })
            .await;
        ctrl_c.abort();

        match result {
            Ok(cache) => {
                println!(
                    "Refreshed {name}: {} schemas, {} tables and views",
                    cache.schemas().len(),
                    cache.table_count()
                );
                Ok(ExitCode::SUCCESS)
            }
            Err(PgDevError::Cancelled) => {
                println!("Refresh cancelled; the previous cache is kept");
                Ok(ExitCode::FAILURE)
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn search(&self, query: &str) -> Result<ExitCode> {
        let records = self.catalog.search(query).await?;
        if records.is_empty() {
            println!("No matches for {query:?}");
        } else {
            println!("{}", output::search_table(&records));
        }
        Ok(ExitCode::SUCCESS)
    }

    pub async fn query(&self, sql: &str, profile: Option<&str>) -> Result<ExitCode> {
        let executor = QueryExecutor::new(self.manager.clone());
        let result = match profile {
            Some(profile) => executor.execute_on(profile, sql).await,
            None => executor.execute(sql).await,
        };
        match result {
            Ok(result) => {
                output::print_query_result(&result);
                Ok(ExitCode::SUCCESS)
            }
            Err(PgDevError::QueryExecution(message)) => {
                eprintln!("{message}");
                Ok(ExitCode::FAILURE)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Schemas from the stored cache when there is one, else live
    pub async fn schemas(&self, name: Option<&str>) -> Result<ExitCode> {
        let name = self.resolve(name)?;
        self.manager.store().require(&name)?;
        self.catalog.restore(&name).await?;

        let cache = self.catalog.metadata_cache(&name);
        let mut rows = Vec::new();
        for schema in cache.get_schemas().await? {
            let tables = cache.get_tables(&schema).await?.len();
            let functions = cache.get_functions(&schema).await?.len();
            let procedures = cache.get_procedures(&schema).await?.len();
            rows.push((schema, tables, functions, procedures));
        }
        println!("{}", output::schemas_table(&rows));
        if let Some(current) = cache.current() {
            println!("Cached at {}", current.captured_at().to_rfc3339());
        }
        Ok(ExitCode::SUCCESS)
    }

    pub async fn describe(&self, schema: &str, table: &str, profile: Option<&str>) -> Result<ExitCode> {
        let introspector = CatalogIntrospector::new(self.manager.clone(), self.resolve(profile)?);
        let columns = introspector.get_columns(schema, table).await?;
        if columns.is_empty() {
            println!("No table {schema}.{table}");
            return Ok(ExitCode::FAILURE);
        }
        println!("{}", output::columns_table(&columns));

        let indexes = introspector.get_indexes(schema, table).await?;
        if !indexes.is_empty() {
            println!("{}", output::indexes_table(&indexes));
        }
        Ok(ExitCode::SUCCESS)
    }

    pub async fn source(&self, schema: &str, routine: &str, profile: Option<&str>) -> Result<ExitCode> {
        let introspector = CatalogIntrospector::new(self.manager.clone(), self.resolve(profile)?);
        println!("{}", introspector.get_routine_source(schema, routine).await);
        Ok(ExitCode::SUCCESS)
    }
}
