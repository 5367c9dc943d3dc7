//! Knowledge coordination for Lore.
//!
//! [`KnowledgeCoordinator`] drives every write and query across the two
//! independent stores: text is embedded, indexed in the [`VectorIndex`] and
//! described by a row in the [`MetadataStore`]. There is no transaction
//! spanning both stores, so a failure midway can leave them out of step; such
//! failures are logged with the ids left behind.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use lore_knowledge::KnowledgeCoordinator;
//!
//! let coordinator = KnowledgeCoordinator::new(embeddings, index, store, answerer);
//! coordinator
//!     .save_q_and_a(&["What is X?".to_string()], "X is a thing")
//!     .await?;
//! let outcome = coordinator.search("What is X?", 3).await?;
//! println!("{:?}", outcome.answer);
//! ```

mod coordinator;

pub use coordinator::{KnowledgeCoordinator, KnowledgePage, SearchOutcome};

// Re-export core types for convenience.
pub use lore_core::{
    AnswerModel, Embeddings, KnowledgeEntry, KnowledgeKind, LoreError, MetadataStore,
    ScoredKnowledge, VectorIndex,
};
