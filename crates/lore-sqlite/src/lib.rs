//! SQLite integration for Lore.
//!
//! This crate provides [`SqliteMetadataStore`], a SQLite-backed implementation
//! of the [`MetadataStore`](lore_core::MetadataStore) trait holding one row per
//! stored unit of knowledge.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use lore_sqlite::SqliteMetadataStore;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // In-memory store (great for testing)
//! let store = SqliteMetadataStore::in_memory()?;
//!
//! // File-based store
//! let store = SqliteMetadataStore::new("/var/lib/lore/lore.db")?;
//! # Ok(())
//! # }
//! ```

mod metadata_store;

pub use metadata_store::SqliteMetadataStore;

// Re-export core traits for convenience.
pub use lore_core::{KnowledgeEntry, MetadataStore};
