use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Unified error type for Lore. Each variant is a distinct failure kind and
/// carries enough context (ids, counts) to be asserted on and logged.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LoreError {
    #[error("invalid params: {0}")]
    InvalidParams(String),
    #[error("count mismatch at {stage}: expected {expected}, got {actual}")]
    CountMismatch {
        stage: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("vector transform failed: {0}")]
    VectorTransform(String),
    #[error("data not found: ids {ids:?}")]
    DataNotFound { ids: Vec<i64> },
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("embedding error: {0}")]
    Embedding(String),
    #[error("model error: {0}")]
    Model(String),
    #[error("timeout: {0}")]
    Timeout(String),
    #[error("config error: {0}")]
    Config(String),
}

impl LoreError {
    /// Stable label for the error kind, used as a structured log field.
    pub fn kind(&self) -> &'static str {
        match self {
            LoreError::InvalidParams(_) => "invalid_params",
            LoreError::CountMismatch { .. } => "count_mismatch",
            LoreError::VectorTransform(_) => "vector_transform",
            LoreError::DataNotFound { .. } => "data_not_found",
            LoreError::StoreUnavailable(_) => "store_unavailable",
            LoreError::DimensionMismatch { .. } => "dimension_mismatch",
            LoreError::Embedding(_) => "embedding",
            LoreError::Model(_) => "model",
            LoreError::Timeout(_) => "timeout",
            LoreError::Config(_) => "config",
        }
    }

    /// Shorthand for [`LoreError::InvalidParams`].
    pub fn invalid(msg: impl Into<String>) -> Self {
        LoreError::InvalidParams(msg.into())
    }

    /// Returns `Err(CountMismatch)` unless `actual == expected`.
    pub fn check_count(
        stage: &'static str,
        expected: usize,
        actual: usize,
    ) -> Result<(), LoreError> {
        if expected == actual {
            Ok(())
        } else {
            Err(LoreError::CountMismatch {
                stage,
                expected,
                actual,
            })
        }
    }
}

// ---------------------------------------------------------------------------
// Knowledge model
// ---------------------------------------------------------------------------

/// The kind of a knowledge entry.
///
/// Persisted and exchanged as a numeric code. Code `0` is reserved for the
/// "all kinds" list filter and is never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KnowledgeKind {
    QuestionAnswer,
    Pure,
}

impl KnowledgeKind {
    pub fn code(self) -> i32 {
        match self {
            KnowledgeKind::QuestionAnswer => 1,
            KnowledgeKind::Pure => 2,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            1 => Some(KnowledgeKind::QuestionAnswer),
            2 => Some(KnowledgeKind::Pure),
            _ => None,
        }
    }

    /// Interpret a list filter code: `0` (or negative) means all kinds.
    pub fn from_filter(code: i64) -> Result<Option<Self>, LoreError> {
        if code <= 0 {
            return Ok(None);
        }
        i32::try_from(code)
            .ok()
            .and_then(Self::from_code)
            .map(Some)
            .ok_or_else(|| LoreError::invalid(format!("unknown knowledge type {code}")))
    }
}

impl fmt::Display for KnowledgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KnowledgeKind::QuestionAnswer => write!(f, "question_answer"),
            KnowledgeKind::Pure => write!(f, "pure"),
        }
    }
}

/// The retrievable content of an entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KnowledgeContent {
    /// One phrasing of a question together with the answer shared by its group.
    QuestionAnswer { question: String, answer: String },
    /// Free-form knowledge text.
    Pure { text: String },
}

impl KnowledgeContent {
    pub fn question_answer(question: impl Into<String>, answer: impl Into<String>) -> Self {
        KnowledgeContent::QuestionAnswer {
            question: question.into(),
            answer: answer.into(),
        }
    }

    pub fn pure(text: impl Into<String>) -> Self {
        KnowledgeContent::Pure { text: text.into() }
    }

    pub fn kind(&self) -> KnowledgeKind {
        match self {
            KnowledgeContent::QuestionAnswer { .. } => KnowledgeKind::QuestionAnswer,
            KnowledgeContent::Pure { .. } => KnowledgeKind::Pure,
        }
    }

    /// The text that was embedded for this entry: the question or the raw text.
    pub fn embedded_text(&self) -> &str {
        match self {
            KnowledgeContent::QuestionAnswer { question, .. } => question,
            KnowledgeContent::Pure { text } => text,
        }
    }
}

/// A persisted unit of retrievable knowledge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "KnowledgeRecord", try_from = "KnowledgeRecord")]
pub struct KnowledgeEntry {
    pub id: i64,
    pub vector_id: i64,
    pub content: KnowledgeContent,
    pub group_key: String,
    pub created_at: i64,
    pub updated_at: i64,
}

impl KnowledgeEntry {
    pub fn kind(&self) -> KnowledgeKind {
        self.content.kind()
    }
}

/// Flat row shape of a [`KnowledgeEntry`], shared by the relational schema and
/// the JSON wire format.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeRecord {
    pub id: i64,
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub answer: String,
    #[serde(default)]
    pub text: String,
    pub vector_id: i64,
    #[serde(rename = "type")]
    pub kind: i32,
    #[serde(default)]
    pub group_key: String,
    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub updated_at: i64,
}

impl From<KnowledgeEntry> for KnowledgeRecord {
    fn from(entry: KnowledgeEntry) -> Self {
        let kind = entry.kind().code();
        let (question, answer, text) = match entry.content {
            KnowledgeContent::QuestionAnswer { question, answer } => {
                (question, answer, String::new())
            }
            KnowledgeContent::Pure { text } => (String::new(), String::new(), text),
        };
        Self {
            id: entry.id,
            question,
            answer,
            text,
            vector_id: entry.vector_id,
            kind,
            group_key: entry.group_key,
            created_at: entry.created_at,
            updated_at: entry.updated_at,
        }
    }
}

impl TryFrom<KnowledgeRecord> for KnowledgeEntry {
    type Error = LoreError;

    fn try_from(record: KnowledgeRecord) -> Result<Self, Self::Error> {
        let content = match KnowledgeKind::from_code(record.kind) {
            Some(KnowledgeKind::QuestionAnswer) => KnowledgeContent::QuestionAnswer {
                question: record.question,
                answer: record.answer,
            },
            Some(KnowledgeKind::Pure) => KnowledgeContent::Pure { text: record.text },
            None => {
                return Err(LoreError::StoreUnavailable(format!(
                    "row {} has unknown knowledge type {}",
                    record.id, record.kind
                )))
            }
        };
        Ok(Self {
            id: record.id,
            vector_id: record.vector_id,
            content,
            group_key: record.group_key,
            created_at: record.created_at,
            updated_at: record.updated_at,
        })
    }
}

/// A row to be created by [`MetadataStore::batch_create`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewKnowledge {
    pub vector_id: i64,
    pub content: KnowledgeContent,
    pub group_key: String,
}

/// Field changes applied by [`MetadataStore::update_by_id`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KnowledgeChanges {
    pub content: KnowledgeContent,
    pub vector_id: i64,
}

// ---------------------------------------------------------------------------
// Retrieval types
// ---------------------------------------------------------------------------

/// One ranked result of a vector search. Smaller distance is closer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorHit {
    pub id: i64,
    pub distance: f32,
    pub label: String,
}

/// A context passage handed to the [`AnswerModel`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Passage {
    pub content: String,
    /// Distance of the passage's vector; `None` when the entry had no match in
    /// the ranked results.
    pub score: Option<f32>,
}

impl Passage {
    /// Render an entry as a context passage.
    pub fn from_entry(entry: &KnowledgeEntry, score: Option<f32>) -> Self {
        let content = match &entry.content {
            KnowledgeContent::QuestionAnswer { question, answer } => {
                format!("Q: {question}\nA: {answer}")
            }
            KnowledgeContent::Pure { text } => text.clone(),
        };
        Self { content, score }
    }
}

/// A knowledge entry joined with its search score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredKnowledge {
    #[serde(flatten)]
    pub entry: KnowledgeEntry,
    /// `None` marks an entry absent from the ranked vector results, which
    /// means the two stores disagree. A real match always has `Some`.
    pub score: Option<f32>,
}

// ---------------------------------------------------------------------------
// Embeddings trait
// ---------------------------------------------------------------------------

/// Trait for embedding text into vectors.
#[async_trait]
pub trait Embeddings: Send + Sync {
    /// Embed multiple texts (for batch document embedding).
    async fn embed_documents(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, LoreError>;

    /// Embed a single query text.
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, LoreError>;
}

// ---------------------------------------------------------------------------
// VectorIndex trait
// ---------------------------------------------------------------------------

/// Storage and top-K retrieval of embedding vectors.
///
/// An index has a fixed dimension, established at first use or by
/// configuration, and every stored vector carries a short text label.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Load the index into serving state. Must be idempotent and safe to call
    /// concurrently; only the first call does any work.
    async fn activate(&self) -> Result<(), LoreError> {
        Ok(())
    }

    /// The fixed dimension, if already established.
    fn dimension(&self) -> Option<usize>;

    /// Insert vectors, returning one new id per input in call order.
    async fn insert(&self, texts: &[&str], vectors: Vec<Vec<f32>>) -> Result<Vec<i64>, LoreError>;

    /// Replace vectors by deleting `ids` and inserting fresh ones.
    ///
    /// The returned ids are new. This is not atomic: if the insert fails
    /// after the delete succeeded, the old vectors are gone.
    async fn update(
        &self,
        ids: &[i64],
        texts: &[&str],
        vectors: Vec<Vec<f32>>,
    ) -> Result<Vec<i64>, LoreError> {
        check_batch(texts, &vectors)?;
        if let Some(dim) = self.dimension() {
            check_dimension(dim, &vectors)?;
        }
        self.delete(ids).await?;
        self.insert(texts, vectors).await
    }

    /// Delete vectors by id. Absent ids are ignored.
    async fn delete(&self, ids: &[i64]) -> Result<(), LoreError>;

    /// Return up to `top_k` hits ordered by increasing distance.
    async fn search(&self, vector: &[f32], top_k: usize) -> Result<Vec<VectorHit>, LoreError>;
}

/// Validate that a text batch and its vectors line up.
pub fn check_batch(texts: &[&str], vectors: &[Vec<f32>]) -> Result<(), LoreError> {
    if texts.len() != vectors.len() {
        return Err(LoreError::invalid(format!(
            "{} texts but {} vectors",
            texts.len(),
            vectors.len()
        )));
    }
    Ok(())
}

/// Validate that every vector has the expected dimension.
pub fn check_dimension(expected: usize, vectors: &[Vec<f32>]) -> Result<(), LoreError> {
    match vectors.iter().find(|v| v.len() != expected) {
        Some(v) => Err(LoreError::DimensionMismatch {
            expected,
            actual: v.len(),
        }),
        None => Ok(()),
    }
}

// ---------------------------------------------------------------------------
// MetadataStore trait
// ---------------------------------------------------------------------------

/// Relational records describing each stored unit of knowledge.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Create all rows or none. Returns the created entries in input order.
    async fn batch_create(&self, rows: Vec<NewKnowledge>)
        -> Result<Vec<KnowledgeEntry>, LoreError>;

    /// Entries whose `vector_id` is in `vector_ids`. Missing ids are omitted.
    async fn batch_get_by_vector_ids(
        &self,
        vector_ids: &[i64],
    ) -> Result<Vec<KnowledgeEntry>, LoreError>;

    /// Entries whose `id` is in `ids`. Missing ids are omitted.
    async fn batch_get_by_ids(&self, ids: &[i64]) -> Result<Vec<KnowledgeEntry>, LoreError>;

    async fn get_by_id(&self, id: i64) -> Result<Option<KnowledgeEntry>, LoreError>;

    /// Apply `changes` and refresh `updated_at`. `DataNotFound` if no row matches.
    async fn update_by_id(&self, id: i64, changes: KnowledgeChanges) -> Result<(), LoreError>;

    /// One page (1-based) ordered by id descending, plus the total row count
    /// for the filter.
    async fn list_page(
        &self,
        page: usize,
        page_size: usize,
        kind: Option<KnowledgeKind>,
    ) -> Result<(Vec<KnowledgeEntry>, u64), LoreError>;

    /// All entries of one save batch, in creation order.
    async fn list_by_group_key(&self, group_key: &str) -> Result<Vec<KnowledgeEntry>, LoreError>;

    /// Delete rows by id, returning how many were removed.
    async fn delete_by_ids(&self, ids: &[i64]) -> Result<u64, LoreError>;
}

// ---------------------------------------------------------------------------
// AnswerModel trait
// ---------------------------------------------------------------------------

/// Synthesizes an answer to a question from ranked context passages.
#[async_trait]
pub trait AnswerModel: Send + Sync {
    async fn answer(&self, question: &str, passages: &[Passage]) -> Result<String, LoreError>;
}
