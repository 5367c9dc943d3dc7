//! Milvus vector index integration for Lore.
//!
//! This crate provides [`MilvusVectorIndex`], an implementation of the
//! [`VectorIndex`](lore_core::VectorIndex) trait backed by
//! [Milvus](https://milvus.io/) using its REST API v2.
//!
//! The collection holds an auto-generated `Int64` primary key, the embedded
//! text as a `VarChar` label and the `FloatVector` itself, indexed with
//! `IVF_FLAT` under the `L2` metric.
//!
//! # Example
//!
//! ```rust,no_run
//! use lore_milvus::{MilvusConfig, MilvusVectorIndex};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = MilvusConfig::new("http://localhost:19530", "knowledge", 1024);
//! let index = MilvusVectorIndex::new(config);
//! index.initialize().await?;
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use lore_core::{check_batch, check_dimension, LoreError, VectorHit, VectorIndex};
use serde_json::{json, Value};
use tokio::sync::OnceCell;

const ID_FIELD: &str = "ID";
const LABEL_FIELD: &str = "question";
const VECTOR_FIELD: &str = "embeddings";
/// Maximum byte length of the stored label.
pub const LABEL_MAX_LENGTH: usize = 1024;

/// Configuration for connecting to a Milvus instance.
#[derive(Debug, Clone)]
pub struct MilvusConfig {
    /// Milvus endpoint URL (e.g., `http://localhost:19530`).
    pub endpoint: String,
    /// Collection name to store vectors in.
    pub collection: String,
    /// Optional API key for Zilliz Cloud authentication.
    pub api_key: Option<String>,
    /// Vector dimension (must match your embedding model).
    pub dim: usize,
    /// Number of IVF clusters built at index creation.
    pub nlist: u32,
    /// Number of clusters probed per search.
    pub nprobe: u32,
}

impl MilvusConfig {
    /// Create a new configuration with required fields.
    pub fn new(endpoint: impl Into<String>, collection: impl Into<String>, dim: usize) -> Self {
        Self {
            endpoint: endpoint.into(),
            collection: collection.into(),
            api_key: None,
            dim,
            nlist: 128,
            nprobe: 16,
        }
    }

    /// Set the API key for Zilliz Cloud or secured Milvus instances.
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_nlist(mut self, nlist: u32) -> Self {
        self.nlist = nlist;
        self
    }

    pub fn with_nprobe(mut self, nprobe: u32) -> Self {
        self.nprobe = nprobe;
        self
    }
}

/// A [`VectorIndex`] implementation backed by [Milvus](https://milvus.io/).
///
/// Call [`initialize`](MilvusVectorIndex::initialize) once at startup to
/// create the collection. The collection is loaded into memory lazily, on the
/// first [`activate`](VectorIndex::activate), and only once per process.
pub struct MilvusVectorIndex {
    config: MilvusConfig,
    client: reqwest::Client,
    loaded: OnceCell<()>,
}

impl MilvusVectorIndex {
    /// Create a new index with the given configuration.
    pub fn new(config: MilvusConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
            loaded: OnceCell::new(),
        }
    }

    /// Return a reference to the configuration.
    pub fn config(&self) -> &MilvusConfig {
        &self.config
    }

    /// Create the Milvus collection and its vector index if they do not
    /// already exist.
    ///
    /// Calling it when the collection already exists is a no-op.
    pub async fn initialize(&self) -> Result<(), LoreError> {
        let resp = self
            .request("/v2/vectordb/collections/create", &self.create_collection_body())
            .await?;

        if let Err(e) = check_code(&resp) {
            let msg = resp["message"].as_str().unwrap_or("");
            // Treat "already exist" as success.
            if !msg.to_lowercase().contains("already exist") {
                return Err(e);
            }
            tracing::debug!(
                collection = %self.config.collection,
                "milvus collection already exists"
            );
        } else {
            tracing::info!(
                collection = %self.config.collection,
                dim = self.config.dim,
                "created milvus collection"
            );
        }
        Ok(())
    }

    fn create_collection_body(&self) -> Value {
        json!({
            "collectionName": self.config.collection,
            "schema": {
                "autoId": true,
                "enableDynamicField": false,
                "fields": [
                    {
                        "fieldName": ID_FIELD,
                        "dataType": "Int64",
                        "isPrimary": true,
                    },
                    {
                        "fieldName": LABEL_FIELD,
                        "dataType": "VarChar",
                        "elementTypeParams": {"max_length": LABEL_MAX_LENGTH},
                    },
                    {
                        "fieldName": VECTOR_FIELD,
                        "dataType": "FloatVector",
                        "elementTypeParams": {"dim": self.config.dim},
                    },
                ],
            },
            "indexParams": [
                {
                    "fieldName": VECTOR_FIELD,
                    "indexName": VECTOR_FIELD,
                    "metricType": "L2",
                    "indexType": "IVF_FLAT",
                    "params": {"nlist": self.config.nlist},
                },
            ],
        })
    }

    /// Send a JSON request to the Milvus REST API.
    async fn request(&self, path: &str, body: &Value) -> Result<Value, LoreError> {
        let url = format!("{}{}", self.config.endpoint.trim_end_matches('/'), path);
        let mut req = self
            .client
            .post(&url)
            .header("Content-Type", "application/json");
        if let Some(ref key) = self.config.api_key {
            req = req.header("Authorization", format!("Bearer {}", key));
        }
        let resp = req
            .json(body)
            .send()
            .await
            .map_err(|e| LoreError::StoreUnavailable(format!("Milvus request error: {e}")))?;
        let status = resp.status().as_u16();
        let json: Value = resp.json().await.map_err(|e| {
            LoreError::StoreUnavailable(format!("Milvus response parse error: {e}"))
        })?;
        if status >= 400 {
            return Err(LoreError::StoreUnavailable(format!(
                "Milvus HTTP error ({status}): {json}"
            )));
        }
        Ok(json)
    }

    /// Send a request and fail on a non-zero Milvus status code.
    async fn call(&self, path: &str, body: &Value) -> Result<Value, LoreError> {
        let resp = self.request(path, body).await?;
        check_code(&resp)?;
        Ok(resp)
    }
}

#[async_trait]
impl VectorIndex for MilvusVectorIndex {
    async fn activate(&self) -> Result<(), LoreError> {
        self.loaded
            .get_or_try_init(|| async {
                let body = json!({"collectionName": self.config.collection});
                self.call("/v2/vectordb/collections/load", &body).await?;
                tracing::info!(collection = %self.config.collection, "milvus collection loaded");
                Ok::<(), LoreError>(())
            })
            .await?;
        Ok(())
    }

    fn dimension(&self) -> Option<usize> {
        Some(self.config.dim)
    }

    async fn insert(&self, texts: &[&str], vectors: Vec<Vec<f32>>) -> Result<Vec<i64>, LoreError> {
        check_batch(texts, &vectors)?;
        if vectors.is_empty() {
            return Ok(Vec::new());
        }
        check_dimension(self.config.dim, &vectors)?;

        let data: Vec<Value> = texts
            .iter()
            .zip(vectors.iter())
            .map(|(text, vec)| {
                json!({
                    LABEL_FIELD: truncate_label(text),
                    VECTOR_FIELD: vec,
                })
            })
            .collect();
        let body = json!({
            "collectionName": self.config.collection,
            "data": data,
        });
        let resp = self.call("/v2/vectordb/entities/insert", &body).await?;
        let ids = parse_insert_ids(&resp)?;
        tracing::debug!(
            collection = %self.config.collection,
            count = ids.len(),
            "inserted vectors"
        );
        Ok(ids)
    }

    async fn delete(&self, ids: &[i64]) -> Result<(), LoreError> {
        if ids.is_empty() {
            return Ok(());
        }
        let body = json!({
            "collectionName": self.config.collection,
            "filter": id_filter(ids),
        });
        self.call("/v2/vectordb/entities/delete", &body).await?;
        Ok(())
    }

    async fn search(&self, vector: &[f32], top_k: usize) -> Result<Vec<VectorHit>, LoreError> {
        if top_k == 0 {
            return Ok(Vec::new());
        }
        if vector.len() != self.config.dim {
            return Err(LoreError::DimensionMismatch {
                expected: self.config.dim,
                actual: vector.len(),
            });
        }
        let body = json!({
            "collectionName": self.config.collection,
            "data": [vector],
            "annsField": VECTOR_FIELD,
            "limit": top_k,
            "outputFields": [ID_FIELD, LABEL_FIELD],
            "searchParams": {
                "metricType": "L2",
                "params": {"nprobe": self.config.nprobe},
            },
        });
        let resp = self.call("/v2/vectordb/entities/search", &body).await?;
        parse_hits(&resp)
    }
}

fn check_code(resp: &Value) -> Result<(), LoreError> {
    let code = resp["code"].as_i64().unwrap_or(0);
    if code != 0 {
        let msg = resp["message"].as_str().unwrap_or("");
        return Err(LoreError::StoreUnavailable(format!(
            "Milvus error (code {code}): {msg}"
        )));
    }
    Ok(())
}

/// Int64 primary keys may come back as JSON numbers or numeric strings.
fn value_to_id(value: &Value) -> Option<i64> {
    value
        .as_i64()
        .or_else(|| value.as_str().and_then(|s| s.parse().ok()))
}

fn parse_insert_ids(resp: &Value) -> Result<Vec<i64>, LoreError> {
    let raw = resp["data"]["insertIds"]
        .as_array()
        .ok_or_else(|| LoreError::StoreUnavailable("Milvus insert: missing insertIds".into()))?;
    raw.iter()
        .map(|v| {
            value_to_id(v).ok_or_else(|| {
                LoreError::StoreUnavailable(format!("Milvus insert: bad id {v}"))
            })
        })
        .collect()
}

fn parse_hits(resp: &Value) -> Result<Vec<VectorHit>, LoreError> {
    let rows = resp["data"].as_array().cloned().unwrap_or_default();
    let mut hits = rows
        .iter()
        .map(|row| {
            let id = value_to_id(&row[ID_FIELD]).ok_or_else(|| {
                LoreError::StoreUnavailable(format!("Milvus search: row without id: {row}"))
            })?;
            let distance = row["distance"].as_f64().ok_or_else(|| {
                LoreError::StoreUnavailable(format!("Milvus search: row without distance: {row}"))
            })?;
            Ok(VectorHit {
                id,
                distance: distance as f32,
                label: row[LABEL_FIELD].as_str().unwrap_or_default().to_string(),
            })
        })
        .collect::<Result<Vec<_>, LoreError>>()?;
    hits.sort_by(|a, b| {
        a.distance
            .partial_cmp(&b.distance)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    Ok(hits)
}

fn id_filter(ids: &[i64]) -> String {
    format!(
        "{ID_FIELD} in [{}]",
        ids.iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(",")
    )
}

/// Cut a label to at most [`LABEL_MAX_LENGTH`] bytes on a char boundary.
fn truncate_label(text: &str) -> &str {
    if text.len() <= LABEL_MAX_LENGTH {
        return text;
    }
    let mut end = LABEL_MAX_LENGTH;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}
