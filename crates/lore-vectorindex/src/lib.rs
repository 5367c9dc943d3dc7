mod in_memory;

pub use in_memory::{l2_distance, InMemoryVectorIndex};

// Re-export core traits/types for convenience.
pub use lore_core::{VectorHit, VectorIndex};
