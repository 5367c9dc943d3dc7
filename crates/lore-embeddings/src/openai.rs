use async_trait::async_trait;
use lore_core::{Embeddings, LoreError};
use serde::Deserialize;
use serde_json::json;

/// Configuration for an OpenAI-compatible `/embeddings` endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiEmbeddingsConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
}

impl OpenAiEmbeddingsConfig {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: "https://api.openai.com/v1".to_string(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingItem {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

/// Embeddings served by any OpenAI-compatible API.
///
/// No retries: a failed request surfaces as [`LoreError::Embedding`].
pub struct OpenAiEmbeddings {
    config: OpenAiEmbeddingsConfig,
    client: reqwest::Client,
}

impl OpenAiEmbeddings {
    pub fn new(config: OpenAiEmbeddingsConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    pub fn config(&self) -> &OpenAiEmbeddingsConfig {
        &self.config
    }

    fn endpoint(&self) -> String {
        format!("{}/embeddings", self.config.base_url.trim_end_matches('/'))
    }

    async fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, LoreError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let body = json!({
            "model": self.config.model,
            "input": texts,
        });
        let resp = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| LoreError::Embedding(format!("embedding request: {e}")))?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(LoreError::Embedding(format!(
                "embedding API error ({}): {}",
                status.as_u16(),
                text
            )));
        }
        let parsed: EmbeddingResponse = resp
            .json()
            .await
            .map_err(|e| LoreError::Embedding(format!("embedding parse: {e}")))?;
        tracing::debug!(
            model = %self.config.model,
            inputs = texts.len(),
            outputs = parsed.data.len(),
            "embedded texts"
        );
        Ok(into_ordered_vectors(parsed.data))
    }
}

/// Providers may return items out of order; `index` is authoritative.
fn into_ordered_vectors(mut items: Vec<EmbeddingItem>) -> Vec<Vec<f32>> {
    items.sort_by_key(|item| item.index);
    items.into_iter().map(|item| item.embedding).collect()
}

#[async_trait]
impl Embeddings for OpenAiEmbeddings {
    async fn embed_documents(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, LoreError> {
        self.embed(texts).await
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, LoreError> {
        let mut results = self.embed(&[text]).await?;
        results
            .pop()
            .ok_or_else(|| LoreError::VectorTransform("empty embedding response".to_string()))
    }
}
