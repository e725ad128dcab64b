//! Catalog backends
//!
//! Providers answer from a [`GameCatalog`]. Lookups are synchronous and must be
//! quick: they run inside a behavior step on the provider's run-loop.

pub mod game;
pub mod memory;

pub use game::{normalize_title, sort_by_title, Game};
pub use memory::MemoryCatalog;

use crate::error::Result;

/// Source label stamped on records from the primary backend.
pub const PRIMARY_SOURCE_LABEL: &str = "SQLite Database";
/// Source label stamped on records from the secondary backend.
pub const SECONDARY_SOURCE_LABEL: &str = "Ontology Database";

/// A read-only record store.
#[cfg_attr(test, mockall::automock)]
pub trait GameCatalog: Send + Sync {
    /// First record whose title matches `title` (see [`Game::title_matches`]).
    fn find_by_title(&self, title: &str) -> Result<Option<Game>>;

    /// Every record, sorted by title.
    fn list_all(&self) -> Result<Vec<Game>>;

    /// Human-readable name of this backend.
    fn source_label(&self) -> String;
}
