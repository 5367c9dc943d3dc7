use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use lore_core::{
    AnswerModel, Embeddings, KnowledgeChanges, KnowledgeContent, KnowledgeEntry, KnowledgeKind,
    LoreError, MetadataStore, NewKnowledge, Passage, ScoredKnowledge, VectorIndex,
};
use serde::Serialize;

/// Result of [`KnowledgeCoordinator::search`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchOutcome {
    /// `None` when nothing matched and the answer model was not consulted.
    pub answer: Option<String>,
    /// Matched entries, closest first.
    pub knowledges: Vec<ScoredKnowledge>,
}

/// One page of [`KnowledgeCoordinator::list`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KnowledgePage {
    pub list: Vec<KnowledgeEntry>,
    pub total: u64,
}

/// Orchestrates saves, updates, deletes and searches across the embedding
/// provider, the vector index, the metadata store and the answer model.
///
/// Holds no mutable state of its own; share it behind an `Arc`.
pub struct KnowledgeCoordinator {
    embeddings: Arc<dyn Embeddings>,
    index: Arc<dyn VectorIndex>,
    store: Arc<dyn MetadataStore>,
    answerer: Arc<dyn AnswerModel>,
}

impl KnowledgeCoordinator {
    pub fn new(
        embeddings: Arc<dyn Embeddings>,
        index: Arc<dyn VectorIndex>,
        store: Arc<dyn MetadataStore>,
        answerer: Arc<dyn AnswerModel>,
    ) -> Self {
        Self {
            embeddings,
            index,
            store,
            answerer,
        }
    }

    // -----------------------------------------------------------------------
    // Save
    // -----------------------------------------------------------------------

    /// Save one entry per question, all sharing `answer`.
    pub async fn save_q_and_a(
        &self,
        questions: &[String],
        answer: &str,
    ) -> Result<Vec<KnowledgeEntry>, LoreError> {
        self.save(questions, Some(answer)).await
    }

    /// Save one free-text entry per text.
    pub async fn save_knowledge(&self, texts: &[String]) -> Result<Vec<KnowledgeEntry>, LoreError> {
        self.save(texts, None).await
    }

    /// Embed, index and record `texts` as one batch under a fresh group key.
    ///
    /// With an `answer` every entry is a question/answer pair, otherwise pure
    /// text. Vectors already inserted stay in the index if recording fails.
    pub async fn save(
        &self,
        texts: &[String],
        answer: Option<&str>,
    ) -> Result<Vec<KnowledgeEntry>, LoreError> {
        validate_texts(texts)?;
        validate_answer(answer)?;
        let refs: Vec<&str> = texts.iter().map(String::as_str).collect();

        let vectors = self.embeddings.embed_documents(&refs).await?;
        LoreError::check_count("embedding", refs.len(), vectors.len())?;

        let vector_ids = self.index.insert(&refs, vectors).await?;
        if let Err(e) = LoreError::check_count("vector insert", refs.len(), vector_ids.len()) {
            tracing::error!(kind = e.kind(), orphaned_vector_ids = ?vector_ids, "save failed: {e}");
            return Err(e);
        }

        let group_key = uuid::Uuid::new_v4().to_string();
        let rows = texts
            .iter()
            .zip(&vector_ids)
            .map(|(text, vector_id)| NewKnowledge {
                vector_id: *vector_id,
                content: content_for(text, answer),
                group_key: group_key.clone(),
            })
            .collect();

        match self.store.batch_create(rows).await {
            Ok(created) => {
                tracing::info!(count = created.len(), group_key = %group_key, "saved knowledge");
                Ok(created)
            }
            Err(e) => {
                tracing::error!(
                    kind = e.kind(),
                    orphaned_vector_ids = ?vector_ids,
                    "save failed after indexing: {e}"
                );
                Err(e)
            }
        }
    }

    // -----------------------------------------------------------------------
    // Update
    // -----------------------------------------------------------------------

    pub async fn update_q_and_a(
        &self,
        ids: &[i64],
        questions: &[String],
        answer: &str,
    ) -> Result<(), LoreError> {
        self.update(ids, questions, Some(answer)).await
    }

    pub async fn update_knowledge(&self, ids: &[i64], texts: &[String]) -> Result<(), LoreError> {
        self.update(ids, texts, None).await
    }

    /// Replace the content of existing entries, re-embedding and re-indexing
    /// them. Entry ids are preserved; vector ids change.
    ///
    /// Rows are updated one at a time, so a failure midway leaves the earlier
    /// rows updated.
    pub async fn update(
        &self,
        ids: &[i64],
        texts: &[String],
        answer: Option<&str>,
    ) -> Result<(), LoreError> {
        validate_ids(ids)?;
        if ids.len() != texts.len() {
            return Err(LoreError::invalid(format!(
                "{} ids but {} texts",
                ids.len(),
                texts.len()
            )));
        }
        let mut seen = HashSet::with_capacity(ids.len());
        if let Some(dup) = ids.iter().find(|id| !seen.insert(**id)) {
            return Err(LoreError::invalid(format!("duplicate id {dup}")));
        }
        validate_texts(texts)?;
        validate_answer(answer)?;
        let kind = if answer.is_some() {
            KnowledgeKind::QuestionAnswer
        } else {
            KnowledgeKind::Pure
        };
        let refs: Vec<&str> = texts.iter().map(String::as_str).collect();

        let vectors = self.embeddings.embed_documents(&refs).await?;
        LoreError::check_count("embedding", ids.len(), vectors.len())?;

        let existing = self.store.batch_get_by_ids(ids).await?;
        if existing.is_empty() {
            return Err(LoreError::DataNotFound { ids: ids.to_vec() });
        }
        LoreError::check_count("metadata lookup", ids.len(), existing.len())?;

        let by_id: HashMap<i64, &KnowledgeEntry> = existing.iter().map(|e| (e.id, e)).collect();
        if let Some(other) = existing.iter().find(|e| e.kind() != kind) {
            return Err(LoreError::invalid(format!(
                "knowledge {} is {}, not {kind}",
                other.id,
                other.kind()
            )));
        }
        let old_vector_ids = ids
            .iter()
            .map(|id| {
                by_id
                    .get(id)
                    .map(|e| e.vector_id)
                    .ok_or(LoreError::DataNotFound { ids: vec![*id] })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let new_vector_ids = self
            .index
            .update(&old_vector_ids, &refs, vectors)
            .await
            .inspect_err(|e| {
                tracing::error!(
                    kind = e.kind(),
                    ids = ?ids,
                    vector_ids = ?old_vector_ids,
                    "vector update failed: {e}"
                );
            })?;
        if let Err(e) = LoreError::check_count("vector update", ids.len(), new_vector_ids.len()) {
            tracing::error!(
                kind = e.kind(),
                ids = ?ids,
                orphaned_vector_ids = ?new_vector_ids,
                "update failed: {e}"
            );
            return Err(e);
        }

        let targets = ids.iter().zip(texts).zip(&new_vector_ids);
        for (i, ((id, text), vector_id)) in targets.enumerate() {
            let changes = KnowledgeChanges {
                content: content_for(text, answer),
                vector_id: *vector_id,
            };
            if let Err(e) = self.store.update_by_id(*id, changes).await {
                let (updated, stale) = ids.split_at(i);
                tracing::error!(
                    kind = e.kind(),
                    updated_ids = ?updated,
                    stale_ids = ?stale,
                    "update failed midway: {e}"
                );
                return Err(e);
            }
        }
        tracing::info!(count = ids.len(), "updated knowledge");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Search
    // -----------------------------------------------------------------------

    /// Retrieve the `top_k` closest entries for `question` and synthesize an
    /// answer from them.
    ///
    /// An empty index yields `answer: None` without consulting the model.
    pub async fn search(&self, question: &str, top_k: usize) -> Result<SearchOutcome, LoreError> {
        if question.trim().is_empty() {
            return Err(LoreError::invalid("question is empty"));
        }
        if top_k == 0 {
            return Err(LoreError::invalid("top_k must be positive"));
        }

        let vector = self.embeddings.embed_query(question).await?;
        if vector.is_empty() {
            return Err(LoreError::VectorTransform(
                "embedding returned an empty vector for the question".into(),
            ));
        }

        self.index.activate().await?;
        let hits = self.index.search(&vector, top_k).await?;
        if hits.is_empty() {
            tracing::debug!("search matched nothing");
            return Ok(SearchOutcome {
                answer: None,
                knowledges: Vec::new(),
            });
        }

        let ranks: HashMap<i64, (usize, f32)> = hits
            .iter()
            .enumerate()
            .map(|(rank, hit)| (hit.id, (rank, hit.distance)))
            .collect();
        let vector_ids: Vec<i64> = hits.iter().map(|h| h.id).collect();
        let entries = self.store.batch_get_by_vector_ids(&vector_ids).await?;

        if entries.len() < hits.len() {
            let recorded: HashSet<i64> = entries.iter().map(|e| e.vector_id).collect();
            let orphaned: Vec<i64> = vector_ids
                .iter()
                .copied()
                .filter(|id| !recorded.contains(id))
                .collect();
            tracing::warn!(orphaned_vector_ids = ?orphaned, "matched vectors without metadata");
        }

        let mut ranked: Vec<(usize, ScoredKnowledge)> = entries
            .into_iter()
            .map(|entry| match ranks.get(&entry.vector_id) {
                Some(&(rank, distance)) => (
                    rank,
                    ScoredKnowledge {
                        entry,
                        score: Some(distance),
                    },
                ),
                None => {
                    tracing::warn!(
                        id = entry.id,
                        vector_id = entry.vector_id,
                        "entry missing from ranked results"
                    );
                    (usize::MAX, ScoredKnowledge { entry, score: None })
                }
            })
            .collect();
        ranked.sort_by_key(|(rank, _)| *rank);
        let knowledges: Vec<ScoredKnowledge> = ranked.into_iter().map(|(_, k)| k).collect();

        let passages: Vec<Passage> = knowledges
            .iter()
            .map(|k| Passage::from_entry(&k.entry, k.score))
            .collect();
        let answer = self.answerer.answer(question, &passages).await?;
        tracing::info!(matched = knowledges.len(), top_k, "answered question");

        Ok(SearchOutcome {
            answer: Some(answer),
            knowledges,
        })
    }

    // -----------------------------------------------------------------------
    // Delete
    // -----------------------------------------------------------------------

    /// Delete entries and their vectors. Unknown ids are skipped; returns the
    /// number of rows removed.
    pub async fn delete(&self, ids: &[i64]) -> Result<u64, LoreError> {
        validate_ids(ids)?;

        let found = self.store.batch_get_by_ids(ids).await?;
        if found.is_empty() {
            return Err(LoreError::DataNotFound { ids: ids.to_vec() });
        }
        let found_ids: Vec<i64> = found.iter().map(|e| e.id).collect();
        if found.len() < ids.len() {
            let missing: Vec<i64> = ids
                .iter()
                .copied()
                .filter(|id| !found_ids.contains(id))
                .collect();
            if !missing.is_empty() {
                tracing::warn!(missing_ids = ?missing, "skipping unknown knowledge ids");
            }
        }

        let vector_ids: Vec<i64> = found.iter().map(|e| e.vector_id).collect();
        self.index.delete(&vector_ids).await?;

        match self.store.delete_by_ids(&found_ids).await {
            Ok(deleted) => {
                tracing::info!(deleted, "deleted knowledge");
                Ok(deleted)
            }
            Err(e) => {
                tracing::error!(
                    kind = e.kind(),
                    ids = ?found_ids,
                    removed_vector_ids = ?vector_ids,
                    "delete failed after removing vectors: {e}"
                );
                Err(e)
            }
        }
    }

    // -----------------------------------------------------------------------
    // Listing
    // -----------------------------------------------------------------------

    /// One page (1-based) of entries, newest first.
    pub async fn list(
        &self,
        page: usize,
        page_size: usize,
        kind: Option<KnowledgeKind>,
    ) -> Result<KnowledgePage, LoreError> {
        if page == 0 || page_size == 0 {
            return Err(LoreError::invalid("page and page_size must be positive"));
        }
        let (list, total) = self.store.list_page(page, page_size, kind).await?;
        Ok(KnowledgePage { list, total })
    }

    /// All entries saved together under `group_key`, in creation order.
    pub async fn get_by_group_key(
        &self,
        group_key: &str,
    ) -> Result<Vec<KnowledgeEntry>, LoreError> {
        if group_key.trim().is_empty() {
            return Err(LoreError::invalid("group_key is empty"));
        }
        self.store.list_by_group_key(group_key).await
    }
}

fn content_for(text: &str, answer: Option<&str>) -> KnowledgeContent {
    match answer {
        Some(answer) => KnowledgeContent::question_answer(text, answer),
        None => KnowledgeContent::pure(text),
    }
}

fn validate_texts(texts: &[String]) -> Result<(), LoreError> {
    if texts.is_empty() {
        return Err(LoreError::invalid("no texts given"));
    }
    if let Some(pos) = texts.iter().position(|t| t.trim().is_empty()) {
        return Err(LoreError::invalid(format!("text at position {pos} is empty")));
    }
    Ok(())
}

fn validate_answer(answer: Option<&str>) -> Result<(), LoreError> {
    match answer {
        Some(a) if a.trim().is_empty() => Err(LoreError::invalid("answer is empty")),
        _ => Ok(()),
    }
}

fn validate_ids(ids: &[i64]) -> Result<(), LoreError> {
    if ids.is_empty() {
        return Err(LoreError::invalid("no ids given"));
    }
    if let Some(bad) = ids.iter().find(|id| **id <= 0) {
        return Err(LoreError::invalid(format!("id {bad} is not positive")));
    }
    Ok(())
}
