//! Server configuration, read from TOML.
//!
//! Every field has a default, so an empty file (or no file at all) yields a
//! working configuration pointed at a local Milvus and the OpenAI API.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use lore_core::LoreError;
use lore_embeddings::OpenAiEmbeddingsConfig;
use lore_milvus::MilvusConfig;
use lore_openai::OpenAiAnswerConfig;
use serde::{Deserialize, Serialize};

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoreConfig {
    /// Log at `debug` instead of `info` unless `LORE_LOG` overrides it.
    #[serde(default)]
    pub debug: bool,
    #[serde(default = "default_address")]
    pub address: String,
    /// `top_k` used when a query omits it or sends a non-positive value.
    #[serde(default = "default_top_k")]
    pub default_top_k: usize,
    #[serde(default = "default_page_size")]
    pub default_page_size: usize,
    /// Upper bound on the time one request may take.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub db: DbConfig,
    #[serde(default)]
    pub vector_index: VectorIndexConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
}

fn default_address() -> String {
    "0.0.0.0:8080".into()
}

fn default_top_k() -> usize {
    3
}

fn default_page_size() -> usize {
    10
}

fn default_request_timeout_secs() -> u64 {
    60
}

impl Default for LoreConfig {
    fn default() -> Self {
        Self {
            debug: false,
            address: default_address(),
            default_top_k: default_top_k(),
            default_page_size: default_page_size(),
            request_timeout_secs: default_request_timeout_secs(),
            db: DbConfig::default(),
            vector_index: VectorIndexConfig::default(),
            llm: LlmConfig::default(),
            embedding: EmbeddingConfig::default(),
        }
    }
}

impl LoreConfig {
    /// Load from `path` if given, else from [`default_path`](Self::default_path)
    /// when that file exists, else fall back to defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, LoreError> {
        match path {
            Some(path) => Self::load_from(path),
            None => {
                let path = Self::default_path();
                if path.exists() {
                    Self::load_from(&path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self, LoreError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            LoreError::Config(format!("Failed to read config {}: {e}", path.display()))
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, LoreError> {
        toml::from_str(content)
            .map_err(|e| LoreError::Config(format!("Failed to parse config: {e}")))
    }

    pub fn default_path() -> PathBuf {
        PathBuf::from("config").join("lore.toml")
    }

    /// Reject settings the server cannot start with.
    pub fn validate(&self) -> Result<(), LoreError> {
        self.address
            .parse::<SocketAddr>()
            .map_err(|e| LoreError::Config(format!("invalid address {:?}: {e}", self.address)))?;
        if self.default_top_k == 0 {
            return Err(LoreError::Config("default_top_k must be positive".into()));
        }
        if self.default_page_size == 0 {
            return Err(LoreError::Config("default_page_size must be positive".into()));
        }
        if self.request_timeout_secs == 0 {
            return Err(LoreError::Config("request_timeout_secs must be positive".into()));
        }
        if self.vector_index.dim == 0 {
            return Err(LoreError::Config("vector_index.dim must be positive".into()));
        }
        IndexBackend::parse(&self.vector_index.backend)?;
        EmbeddingProvider::parse(&self.embedding.provider)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

/// Relational metadata store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DbConfig {
    /// SQLite file path; `:memory:` keeps everything in process.
    #[serde(default = "default_db_path")]
    pub path: String,
}

fn default_db_path() -> String {
    "lore.db".into()
}

impl Default for DbConfig {
    fn default() -> Self {
        Self { path: default_db_path() }
    }
}

/// Which [`VectorIndex`](lore_core::VectorIndex) backs the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexBackend {
    Milvus,
    Memory,
}

impl IndexBackend {
    pub fn parse(name: &str) -> Result<Self, LoreError> {
        match name {
            "milvus" => Ok(Self::Milvus),
            "memory" => Ok(Self::Memory),
            other => Err(LoreError::Config(format!(
                "unknown vector_index.backend {other:?} (expected \"milvus\" or \"memory\")"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorIndexConfig {
    #[serde(default = "default_backend")]
    pub backend: String,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_collection")]
    pub collection: String,
    #[serde(default = "default_dim")]
    pub dim: usize,
    #[serde(default)]
    pub api_key: String,
}

fn default_backend() -> String {
    "milvus".into()
}

fn default_endpoint() -> String {
    "http://localhost:19530".into()
}

fn default_collection() -> String {
    "knowledge".into()
}

fn default_dim() -> usize {
    1024
}

impl Default for VectorIndexConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            endpoint: default_endpoint(),
            collection: default_collection(),
            dim: default_dim(),
            api_key: String::new(),
        }
    }
}

impl VectorIndexConfig {
    pub fn milvus_config(&self) -> MilvusConfig {
        let config = MilvusConfig::new(&self.endpoint, &self.collection, self.dim);
        if self.api_key.is_empty() {
            config
        } else {
            config.with_api_key(&self.api_key)
        }
    }
}

/// Chat model used to synthesize answers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_llm_model")]
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f64>,
}

fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".into()
}

fn default_llm_model() -> String {
    "gpt-4o-mini".into()
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_openai_base_url(),
            api_key: String::new(),
            model: default_llm_model(),
            temperature: None,
            max_tokens: None,
            top_p: None,
            frequency_penalty: None,
            presence_penalty: None,
        }
    }
}

impl LlmConfig {
    pub fn answer_config(&self) -> OpenAiAnswerConfig {
        let mut config =
            OpenAiAnswerConfig::new(&self.api_key, &self.model).with_base_url(&self.base_url);
        if let Some(t) = self.temperature {
            config = config.with_temperature(t);
        }
        if let Some(n) = self.max_tokens {
            config = config.with_max_tokens(n);
        }
        if let Some(p) = self.top_p {
            config = config.with_top_p(p);
        }
        if let Some(p) = self.frequency_penalty {
            config = config.with_frequency_penalty(p);
        }
        if let Some(p) = self.presence_penalty {
            config = config.with_presence_penalty(p);
        }
        config
    }
}

/// Which [`Embeddings`](lore_core::Embeddings) provider backs the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingProvider {
    OpenAi,
    /// Deterministic local vectors, for development without an API key.
    Fake,
}

impl EmbeddingProvider {
    pub fn parse(name: &str) -> Result<Self, LoreError> {
        match name {
            "openai" => Ok(Self::OpenAi),
            "fake" => Ok(Self::Fake),
            other => Err(LoreError::Config(format!(
                "unknown embedding.provider {other:?} (expected \"openai\" or \"fake\")"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_provider")]
    pub provider: String,
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_embedding_model")]
    pub model: String,
}

fn default_embedding_provider() -> String {
    "openai".into()
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".into()
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            base_url: default_openai_base_url(),
            api_key: String::new(),
            model: default_embedding_model(),
        }
    }
}

impl EmbeddingConfig {
    pub fn embeddings_config(&self) -> OpenAiEmbeddingsConfig {
        OpenAiEmbeddingsConfig::new(&self.api_key, &self.model).with_base_url(&self.base_url)
    }
}
