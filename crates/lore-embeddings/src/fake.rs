use async_trait::async_trait;
use lore_core::{Embeddings, LoreError};

/// Deterministic embeddings for tests and local runs.
///
/// Identical texts always map to identical unit-length vectors, so saving a
/// text and then searching for it yields a zero-distance hit.
#[derive(Debug, Clone)]
pub struct FakeEmbeddings {
    dimensions: usize,
}

impl FakeEmbeddings {
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn vector_for(&self, text: &str) -> Vec<f32> {
        let mut vec = vec![0.0f32; self.dimensions];
        if self.dimensions == 0 {
            return vec;
        }
        for (i, byte) in text.bytes().enumerate() {
            vec[i % self.dimensions] += byte as f32 / 255.0;
        }
        let norm: f32 = vec.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vec {
                *v /= norm;
            }
        }
        vec
    }
}

impl Default for FakeEmbeddings {
    fn default() -> Self {
        Self::new(4)
    }
}

#[async_trait]
impl Embeddings for FakeEmbeddings {
    async fn embed_documents(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, LoreError> {
        Ok(texts.iter().map(|t| self.vector_for(t)).collect())
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, LoreError> {
        Ok(self.vector_for(text))
    }
}
