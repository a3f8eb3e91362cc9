//! Local search index over catalog objects
//!
//! The index is a flat, derived store: it is cleared and rebuilt from the
//! current metadata cache after every refresh and never patched in place.

mod record;
mod search_index;

pub use record::{ObjectKind, SearchRecord};
pub use search_index::{SEARCH_LIMIT, SearchIndex};
