//! Lore: a retrieval-augmented knowledge base.
//!
//! This crate re-exports the Lore sub-crates for single-import usage.
//! Enable features to control which modules are available.
//!
//! # Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `default` | `knowledge`, `embeddings`, `vectorindex`, `sqlite` |
//! | `knowledge` | `KnowledgeCoordinator`: save, update, delete, search, listing |
//! | `embeddings` | `FakeEmbeddings` and OpenAI-compatible `OpenAiEmbeddings` |
//! | `openai` | `OpenAiAnswerModel` and `ScriptedAnswerModel` |
//! | `vectorindex` | `InMemoryVectorIndex` |
//! | `milvus` | `MilvusVectorIndex` |
//! | `sqlite` | `SqliteMetadataStore` |
//! | `server` | axum router, config and serve loop |
//! | `full` | All features enabled |
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use lore::embeddings::FakeEmbeddings;
//! use lore::knowledge::KnowledgeCoordinator;
//! use lore::openai::ScriptedAnswerModel;
//! use lore::sqlite::SqliteMetadataStore;
//! use lore::vectorindex::InMemoryVectorIndex;
//!
//! let coordinator = KnowledgeCoordinator::new(
//!     Arc::new(FakeEmbeddings::new(8)),
//!     Arc::new(InMemoryVectorIndex::new()),
//!     Arc::new(SqliteMetadataStore::in_memory()?),
//!     Arc::new(ScriptedAnswerModel::always("X is a thing")),
//! );
//! ```

/// Core traits and types: `Embeddings`, `VectorIndex`, `MetadataStore`,
/// `AnswerModel`, `KnowledgeEntry`, `LoreError`. Always available.
pub use lore_core as core;

/// The coordinator keeping vector index and metadata store in step.
#[cfg(feature = "knowledge")]
pub use lore_knowledge as knowledge;

/// Embedding providers: fake and OpenAI-compatible.
#[cfg(feature = "embeddings")]
pub use lore_embeddings as embeddings;

/// Answer synthesis over an OpenAI-compatible chat API.
#[cfg(feature = "openai")]
pub use lore_openai as openai;

/// Brute-force in-memory vector index.
#[cfg(feature = "vectorindex")]
pub use lore_vectorindex as vectorindex;

/// Milvus vector index over the REST v2 API.
#[cfg(feature = "milvus")]
pub use lore_milvus as milvus;

/// SQLite metadata store.
#[cfg(feature = "sqlite")]
pub use lore_sqlite as sqlite;

/// HTTP surface and server process.
#[cfg(feature = "server")]
pub use lore_server as server;
