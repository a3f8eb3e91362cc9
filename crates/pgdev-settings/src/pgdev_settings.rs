//! Settings and on-disk layout for pgdev
//!
//! Everything pgdev keeps between runs lives under two roots: the config
//! directory (profiles and `settings.toml`) and the data directory
//! (metadata caches, console workspace, search index, logs).

mod layout;
mod settings;

pub use layout::Layout;
pub use settings::AppSettings;
