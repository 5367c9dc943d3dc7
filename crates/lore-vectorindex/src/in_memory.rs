use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::OnceLock;

use async_trait::async_trait;
use lore_core::{check_batch, check_dimension, LoreError, VectorHit, VectorIndex};
use tokio::sync::{OnceCell, RwLock};

/// Stored vector with its label.
struct StoredVector {
    label: String,
    embedding: Vec<f32>,
}

struct IndexState {
    entries: BTreeMap<i64, StoredVector>,
    next_id: i64,
}

/// In-memory vector index using brute-force Euclidean (L2) distance.
///
/// Ids are assigned from a counter starting at 1 and are never reused, so a
/// delete-then-insert update always yields fresh ids, as an auto-id engine
/// would.
pub struct InMemoryVectorIndex {
    state: RwLock<IndexState>,
    dimension: OnceLock<usize>,
    activated: OnceCell<()>,
    activations: AtomicUsize,
}

impl InMemoryVectorIndex {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(IndexState {
                entries: BTreeMap::new(),
                next_id: 1,
            }),
            dimension: OnceLock::new(),
            activated: OnceCell::new(),
            activations: AtomicUsize::new(0),
        }
    }

    /// Create an index whose dimension is fixed up front.
    pub fn with_dimension(dimension: usize) -> Self {
        let index = Self::new();
        let _ = index.dimension.set(dimension);
        index
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn contains(&self, id: i64) -> bool {
        self.state.read().await.entries.contains_key(&id)
    }

    /// How many times activation actually ran (at most once).
    pub fn activation_count(&self) -> usize {
        self.activations.load(Ordering::SeqCst)
    }
}

impl Default for InMemoryVectorIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VectorIndex for InMemoryVectorIndex {
    async fn activate(&self) -> Result<(), LoreError> {
        self.activated
            .get_or_init(|| async {
                self.activations.fetch_add(1, Ordering::SeqCst);
                tracing::debug!("in-memory vector index activated");
            })
            .await;
        Ok(())
    }

    fn dimension(&self) -> Option<usize> {
        self.dimension.get().copied()
    }

    async fn insert(&self, texts: &[&str], vectors: Vec<Vec<f32>>) -> Result<Vec<i64>, LoreError> {
        check_batch(texts, &vectors)?;
        let Some(first) = vectors.first() else {
            return Ok(Vec::new());
        };
        let dim = match self.dimension.get() {
            Some(dim) => *dim,
            None if first.is_empty() => {
                return Err(LoreError::invalid("cannot index an empty vector"));
            }
            None => *self.dimension.get_or_init(|| first.len()),
        };
        check_dimension(dim, &vectors)?;

        let mut state = self.state.write().await;
        let mut ids = Vec::with_capacity(vectors.len());
        for (text, embedding) in texts.iter().zip(vectors) {
            let id = state.next_id;
            state.next_id += 1;
            state.entries.insert(
                id,
                StoredVector {
                    label: text.to_string(),
                    embedding,
                },
            );
            ids.push(id);
        }
        Ok(ids)
    }

    async fn delete(&self, ids: &[i64]) -> Result<(), LoreError> {
        let mut state = self.state.write().await;
        for id in ids {
            state.entries.remove(id);
        }
        Ok(())
    }

    async fn search(&self, vector: &[f32], top_k: usize) -> Result<Vec<VectorHit>, LoreError> {
        let Some(dim) = self.dimension() else {
            return Ok(Vec::new());
        };
        if vector.len() != dim {
            return Err(LoreError::DimensionMismatch {
                expected: dim,
                actual: vector.len(),
            });
        }
        let state = self.state.read().await;

        let mut scored: Vec<VectorHit> = state
            .entries
            .iter()
            .map(|(id, stored)| VectorHit {
                id: *id,
                distance: l2_distance(vector, &stored.embedding),
                label: stored.label.clone(),
            })
            .collect();

        // Sort by distance ascending, ties by id
        scored.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.id.cmp(&b.id))
        });
        scored.truncate(top_k);

        Ok(scored)
    }
}

/// Squared Euclidean distance, the score Milvus reports for the `L2` metric.
pub fn l2_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum()
}
