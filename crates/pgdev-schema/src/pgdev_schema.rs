//! Catalog introspection and metadata caching
//!
//! `CatalogIntrospector` reads catalog lists through pooled connections.
//! `introspect` turns those lists into an immutable `DatabaseCache`, reusing
//! every schema snapshot that did not change since the previous cache, and
//! `MetadataCache` publishes the result by swapping a single pointer.

mod cache;
mod introspect;
mod introspector;
mod model;
mod source;

pub use cache::{MetadataCache, RefreshHandle, StagedCache};
pub use introspect::{RefreshEvent, introspect, introspect_with};
pub use introspector::{CatalogIntrospector, SOURCE_NOT_FOUND, is_system_schema};
pub use model::{DatabaseCache, SchemaSnapshot};
pub use source::CatalogSource;
