use std::sync::Arc;

use async_trait::async_trait;
use lore_core::{
    Embeddings, KnowledgeChanges, KnowledgeContent, KnowledgeEntry, KnowledgeKind, LoreError,
    MetadataStore, NewKnowledge, VectorHit, VectorIndex,
};
use lore_embeddings::FakeEmbeddings;
use lore_knowledge::KnowledgeCoordinator;
use lore_openai::ScriptedAnswerModel;
use lore_sqlite::SqliteMetadataStore;
use lore_vectorindex::InMemoryVectorIndex;

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

struct Harness {
    coordinator: KnowledgeCoordinator,
    index: Arc<InMemoryVectorIndex>,
    store: Arc<SqliteMetadataStore>,
    answerer: Arc<ScriptedAnswerModel>,
}

fn harness() -> Harness {
    let index = Arc::new(InMemoryVectorIndex::new());
    let store = Arc::new(SqliteMetadataStore::in_memory().unwrap());
    let answerer = Arc::new(ScriptedAnswerModel::always("X is a thing"));
    let coordinator = KnowledgeCoordinator::new(
        Arc::new(FakeEmbeddings::new(8)),
        index.clone(),
        store.clone(),
        answerer.clone(),
    );
    Harness {
        coordinator,
        index,
        store,
        answerer,
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Returns one vector fewer than asked for.
struct ShortEmbeddings;

#[async_trait]
impl Embeddings for ShortEmbeddings {
    async fn embed_documents(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, LoreError> {
        Ok(vec![vec![1.0; 8]; texts.len().saturating_sub(1)])
    }

    async fn embed_query(&self, _text: &str) -> Result<Vec<f32>, LoreError> {
        Ok(Vec::new())
    }
}

/// Metadata store whose writes always fail; reads delegate to SQLite.
struct BrokenWrites(SqliteMetadataStore);

#[async_trait]
impl MetadataStore for BrokenWrites {
    async fn batch_create(
        &self,
        _rows: Vec<NewKnowledge>,
    ) -> Result<Vec<KnowledgeEntry>, LoreError> {
        Err(LoreError::StoreUnavailable("disk full".into()))
    }

    async fn batch_get_by_vector_ids(
        &self,
        vector_ids: &[i64],
    ) -> Result<Vec<KnowledgeEntry>, LoreError> {
        self.0.batch_get_by_vector_ids(vector_ids).await
    }

    async fn batch_get_by_ids(&self, ids: &[i64]) -> Result<Vec<KnowledgeEntry>, LoreError> {
        self.0.batch_get_by_ids(ids).await
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<KnowledgeEntry>, LoreError> {
        self.0.get_by_id(id).await
    }

    async fn update_by_id(&self, _id: i64, _changes: KnowledgeChanges) -> Result<(), LoreError> {
        Err(LoreError::StoreUnavailable("disk full".into()))
    }

    async fn list_page(
        &self,
        page: usize,
        page_size: usize,
        kind: Option<KnowledgeKind>,
    ) -> Result<(Vec<KnowledgeEntry>, u64), LoreError> {
        self.0.list_page(page, page_size, kind).await
    }

    async fn list_by_group_key(&self, group_key: &str) -> Result<Vec<KnowledgeEntry>, LoreError> {
        self.0.list_by_group_key(group_key).await
    }

    async fn delete_by_ids(&self, _ids: &[i64]) -> Result<u64, LoreError> {
        Err(LoreError::StoreUnavailable("disk full".into()))
    }
}

/// Vector index that drops the last id on insert and refuses deletes.
struct LossyIndex(InMemoryVectorIndex);

#[async_trait]
impl VectorIndex for LossyIndex {
    fn dimension(&self) -> Option<usize> {
        self.0.dimension()
    }

    async fn insert(&self, texts: &[&str], vectors: Vec<Vec<f32>>) -> Result<Vec<i64>, LoreError> {
        let mut ids = self.0.insert(texts, vectors).await?;
        ids.pop();
        Ok(ids)
    }

    async fn delete(&self, _ids: &[i64]) -> Result<(), LoreError> {
        Err(LoreError::StoreUnavailable("index offline".into()))
    }

    async fn search(&self, vector: &[f32], top_k: usize) -> Result<Vec<VectorHit>, LoreError> {
        self.0.search(vector, top_k).await
    }
}

/// Metadata store whose vector-id lookups also return the row recorded for
/// `extra_vector_id`, a vector the index never ranked.
struct ExtraRowOnLookup {
    inner: Arc<SqliteMetadataStore>,
    extra_vector_id: i64,
}

#[async_trait]
impl MetadataStore for ExtraRowOnLookup {
    async fn batch_create(
        &self,
        rows: Vec<NewKnowledge>,
    ) -> Result<Vec<KnowledgeEntry>, LoreError> {
        self.inner.batch_create(rows).await
    }

    async fn batch_get_by_vector_ids(
        &self,
        vector_ids: &[i64],
    ) -> Result<Vec<KnowledgeEntry>, LoreError> {
        let mut ids = vector_ids.to_vec();
        ids.push(self.extra_vector_id);
        self.inner.batch_get_by_vector_ids(&ids).await
    }

    async fn batch_get_by_ids(&self, ids: &[i64]) -> Result<Vec<KnowledgeEntry>, LoreError> {
        self.inner.batch_get_by_ids(ids).await
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<KnowledgeEntry>, LoreError> {
        self.inner.get_by_id(id).await
    }

    async fn update_by_id(&self, id: i64, changes: KnowledgeChanges) -> Result<(), LoreError> {
        self.inner.update_by_id(id, changes).await
    }

    async fn list_page(
        &self,
        page: usize,
        page_size: usize,
        kind: Option<KnowledgeKind>,
    ) -> Result<(Vec<KnowledgeEntry>, u64), LoreError> {
        self.inner.list_page(page, page_size, kind).await
    }

    async fn list_by_group_key(&self, group_key: &str) -> Result<Vec<KnowledgeEntry>, LoreError> {
        self.inner.list_by_group_key(group_key).await
    }

    async fn delete_by_ids(&self, ids: &[i64]) -> Result<u64, LoreError> {
        self.inner.delete_by_ids(ids).await
    }
}

// ---------------------------------------------------------------------------
// Save
// ---------------------------------------------------------------------------

#[tokio::test]
async fn save_q_and_a_creates_one_entry_per_question_in_one_group() {
    let h = harness();
    let questions = strings(&["What is X?", "Define X", "X meaning"]);

    let created = h
        .coordinator
        .save_q_and_a(&questions, "X is a thing")
        .await
        .unwrap();

    assert_eq!(created.len(), 3);
    assert_eq!(h.index.len().await, 3);
    let group_key = &created[0].group_key;
    assert!(!group_key.is_empty());
    for (entry, question) in created.iter().zip(&questions) {
        assert_eq!(&entry.group_key, group_key);
        assert_eq!(entry.kind(), KnowledgeKind::QuestionAnswer);
        assert_eq!(
            entry.content,
            KnowledgeContent::question_answer(question.as_str(), "X is a thing")
        );
        assert!(h.index.contains(entry.vector_id).await);
    }
}

#[tokio::test]
async fn separate_saves_get_separate_group_keys() {
    let h = harness();
    let first = h.coordinator.save_knowledge(&strings(&["a fact"])).await.unwrap();
    let second = h.coordinator.save_knowledge(&strings(&["another"])).await.unwrap();
    assert_eq!(first[0].kind(), KnowledgeKind::Pure);
    assert_ne!(first[0].group_key, second[0].group_key);
}

#[tokio::test]
async fn save_rejects_blank_input_without_touching_stores() {
    let h = harness();
    for result in [
        h.coordinator.save_knowledge(&[]).await,
        h.coordinator.save_knowledge(&strings(&["ok", ""])).await,
        h.coordinator.save_q_and_a(&strings(&["q"]), "  ").await,
    ] {
        assert!(matches!(result, Err(LoreError::InvalidParams(_))));
    }
    assert!(h.index.is_empty().await);
    assert_eq!(h.coordinator.list(1, 10, None).await.unwrap().total, 0);
}

#[tokio::test]
async fn save_with_short_embedding_batch_is_count_mismatch() {
    let index = Arc::new(InMemoryVectorIndex::new());
    let coordinator = KnowledgeCoordinator::new(
        Arc::new(ShortEmbeddings),
        index.clone(),
        Arc::new(SqliteMetadataStore::in_memory().unwrap()),
        Arc::new(ScriptedAnswerModel::always("")),
    );

    let err = coordinator
        .save_knowledge(&strings(&["a", "b"]))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        LoreError::CountMismatch {
            stage: "embedding",
            expected: 2,
            actual: 1
        }
    );
    assert!(index.is_empty().await);
}

#[tokio::test]
async fn save_with_lossy_index_is_count_mismatch_and_records_nothing() {
    let store = Arc::new(SqliteMetadataStore::in_memory().unwrap());
    let coordinator = KnowledgeCoordinator::new(
        Arc::new(FakeEmbeddings::new(8)),
        Arc::new(LossyIndex(InMemoryVectorIndex::new())),
        store.clone(),
        Arc::new(ScriptedAnswerModel::always("")),
    );

    let err = coordinator
        .save_knowledge(&strings(&["a", "b"]))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        LoreError::CountMismatch {
            stage: "vector insert",
            ..
        }
    ));
    assert_eq!(store.list_page(1, 10, None).await.unwrap().1, 0);
}

#[tokio::test]
async fn failed_metadata_write_leaves_vectors_orphaned() {
    let index = Arc::new(InMemoryVectorIndex::new());
    let coordinator = KnowledgeCoordinator::new(
        Arc::new(FakeEmbeddings::new(8)),
        index.clone(),
        Arc::new(BrokenWrites(SqliteMetadataStore::in_memory().unwrap())),
        Arc::new(ScriptedAnswerModel::always("")),
    );

    let err = coordinator
        .save_knowledge(&strings(&["a", "b"]))
        .await
        .unwrap_err();
    assert!(matches!(err, LoreError::StoreUnavailable(_)));
    // No compensation: the vectors stay behind.
    assert_eq!(index.len().await, 2);
}

// ---------------------------------------------------------------------------
// Search
// ---------------------------------------------------------------------------

#[tokio::test]
async fn what_is_x_scenario() {
    let h = harness();
    h.coordinator
        .save_q_and_a(&strings(&["What is X?"]), "X is a thing")
        .await
        .unwrap();

    let outcome = h.coordinator.search("What is X?", 3).await.unwrap();

    assert_eq!(outcome.answer.as_deref(), Some("X is a thing"));
    assert_eq!(outcome.knowledges.len(), 1);
    let top = &outcome.knowledges[0];
    assert_eq!(top.score, Some(0.0));
    assert_eq!(
        top.entry.content,
        KnowledgeContent::question_answer("What is X?", "X is a thing")
    );

    let calls = h.answerer.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].question, "What is X?");
    assert_eq!(calls[0].passages[0].content, "Q: What is X?\nA: X is a thing");
    assert_eq!(calls[0].passages[0].score, Some(0.0));
}

#[tokio::test]
async fn unranked_entry_is_unscored_and_sorted_last() {
    let store = Arc::new(SqliteMetadataStore::in_memory().unwrap());
    store
        .batch_create(vec![NewKnowledge {
            vector_id: 999,
            content: KnowledgeContent::pure("stray row"),
            group_key: "stray".into(),
        }])
        .await
        .unwrap();
    let answerer = Arc::new(ScriptedAnswerModel::always("answer"));
    let coordinator = KnowledgeCoordinator::new(
        Arc::new(FakeEmbeddings::new(8)),
        Arc::new(InMemoryVectorIndex::new()),
        Arc::new(ExtraRowOnLookup {
            inner: store,
            extra_vector_id: 999,
        }),
        answerer.clone(),
    );
    coordinator
        .save_knowledge(&strings(&["alpha fact", "beta fact"]))
        .await
        .unwrap();

    let outcome = coordinator.search("alpha fact", 2).await.unwrap();

    assert_eq!(outcome.answer.as_deref(), Some("answer"));
    assert_eq!(outcome.knowledges.len(), 3);
    assert!(outcome.knowledges[..2].iter().all(|k| k.score.is_some()));
    assert_eq!(
        outcome.knowledges[0].entry.content,
        KnowledgeContent::pure("alpha fact")
    );
    let last = &outcome.knowledges[2];
    assert_eq!(last.score, None);
    assert_eq!(last.entry.content, KnowledgeContent::pure("stray row"));

    let passages = &answerer.calls()[0].passages;
    assert_eq!(passages.len(), 3);
    assert_eq!(passages[2].content, "stray row");
    assert_eq!(passages[2].score, None);
}

#[tokio::test]
async fn hit_without_metadata_is_skipped_and_rest_still_answered() {
    let h = harness();
    let saved = h
        .coordinator
        .save_knowledge(&strings(&["kept fact", "dropped fact"]))
        .await
        .unwrap();
    // Remove only the row; its vector stays searchable.
    h.store.delete_by_ids(&[saved[1].id]).await.unwrap();
    assert_eq!(h.index.len().await, 2);

    let outcome = h.coordinator.search("dropped fact", 2).await.unwrap();

    assert_eq!(outcome.answer.as_deref(), Some("X is a thing"));
    assert_eq!(outcome.knowledges.len(), 1);
    assert_eq!(outcome.knowledges[0].entry.id, saved[0].id);
    assert!(outcome.knowledges[0].score.is_some());

    let calls = h.answerer.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].passages.len(), 1);
    assert_eq!(calls[0].passages[0].content, "kept fact");
}

#[tokio::test]
async fn search_on_empty_store_returns_no_answer() {
    let h = harness();
    let outcome = h.coordinator.search("anything?", 3).await.unwrap();
    assert!(outcome.answer.is_none());
    assert!(outcome.knowledges.is_empty());
    assert!(h.answerer.calls().is_empty());
}

#[tokio::test]
async fn search_ranks_closest_first_and_respects_top_k() {
    let h = harness();
    h.coordinator
        .save_knowledge(&strings(&[
            "Rust has ownership",
            "Milvus stores vectors",
            "SQLite is embedded",
            "Tokio runs tasks",
        ]))
        .await
        .unwrap();

    let outcome = h.coordinator.search("SQLite is embedded", 2).await.unwrap();
    assert_eq!(outcome.knowledges.len(), 2);
    assert_eq!(
        outcome.knowledges[0].entry.content,
        KnowledgeContent::pure("SQLite is embedded")
    );
    assert_eq!(outcome.knowledges[0].score, Some(0.0));
    let scores: Vec<f32> = outcome
        .knowledges
        .iter()
        .map(|k| k.score.unwrap())
        .collect();
    assert!(scores.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(h.answerer.calls()[0].passages.len(), 2);
}

#[tokio::test]
async fn search_validates_input() {
    let h = harness();
    assert!(matches!(
        h.coordinator.search("  ", 3).await,
        Err(LoreError::InvalidParams(_))
    ));
    assert!(matches!(
        h.coordinator.search("q", 0).await,
        Err(LoreError::InvalidParams(_))
    ));
}

#[tokio::test]
async fn empty_query_vector_is_vector_transform_error() {
    let coordinator = KnowledgeCoordinator::new(
        Arc::new(ShortEmbeddings),
        Arc::new(InMemoryVectorIndex::new()),
        Arc::new(SqliteMetadataStore::in_memory().unwrap()),
        Arc::new(ScriptedAnswerModel::always("")),
    );
    let err = coordinator.search("q", 3).await.unwrap_err();
    assert!(matches!(err, LoreError::VectorTransform(_)));
}

#[tokio::test]
async fn answer_model_failure_propagates() {
    let index = Arc::new(InMemoryVectorIndex::new());
    let coordinator = KnowledgeCoordinator::new(
        Arc::new(FakeEmbeddings::new(8)),
        index,
        Arc::new(SqliteMetadataStore::in_memory().unwrap()),
        Arc::new(ScriptedAnswerModel::new(vec![Err(LoreError::Model(
            "rate limited".into(),
        ))])),
    );
    coordinator
        .save_knowledge(&strings(&["a fact"]))
        .await
        .unwrap();
    let err = coordinator.search("a fact", 3).await.unwrap_err();
    assert_eq!(err, LoreError::Model("rate limited".into()));
}

#[tokio::test]
async fn concurrent_first_searches_activate_index_once() {
    let h = harness();
    h.coordinator
        .save_knowledge(&strings(&["shared"]))
        .await
        .unwrap();
    let coordinator = Arc::new(h.coordinator);

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let coordinator = Arc::clone(&coordinator);
            tokio::spawn(async move { coordinator.search("shared", 1).await })
        })
        .collect();
    for handle in handles {
        assert!(handle.await.unwrap().unwrap().answer.is_some());
    }
    assert_eq!(h.index.activation_count(), 1);
}

// ---------------------------------------------------------------------------
// Update
// ---------------------------------------------------------------------------

#[tokio::test]
async fn update_keeps_id_and_swaps_vector() {
    let h = harness();
    let created = h
        .coordinator
        .save_q_and_a(&strings(&["old question"]), "old answer")
        .await
        .unwrap();
    let before = &created[0];

    h.coordinator
        .update_q_and_a(&[before.id], &strings(&["new question"]), "new answer")
        .await
        .unwrap();

    let after = h.store.get_by_id(before.id).await.unwrap().unwrap();
    assert_eq!(after.id, before.id);
    assert_eq!(after.group_key, before.group_key);
    assert_ne!(after.vector_id, before.vector_id);
    assert_eq!(
        after.content,
        KnowledgeContent::question_answer("new question", "new answer")
    );
    assert!(!h.index.contains(before.vector_id).await);
    assert!(h.index.contains(after.vector_id).await);

    let outcome = h.coordinator.search("new question", 1).await.unwrap();
    assert_eq!(outcome.knowledges[0].entry.id, before.id);
    assert_eq!(outcome.knowledges[0].score, Some(0.0));
}

#[tokio::test]
async fn update_rejects_kind_change() {
    let h = harness();
    let created = h
        .coordinator
        .save_knowledge(&strings(&["plain text"]))
        .await
        .unwrap();

    let err = h
        .coordinator
        .update_q_and_a(&[created[0].id], &strings(&["now a question"]), "answer")
        .await
        .unwrap_err();
    assert!(matches!(err, LoreError::InvalidParams(_)));
    assert!(h.index.contains(created[0].vector_id).await);
}

#[tokio::test]
async fn update_of_unknown_ids_is_data_not_found() {
    let h = harness();
    let err = h
        .coordinator
        .update_knowledge(&[41, 42], &strings(&["a", "b"]))
        .await
        .unwrap_err();
    assert_eq!(err, LoreError::DataNotFound { ids: vec![41, 42] });
}

#[tokio::test]
async fn update_with_some_unknown_ids_is_count_mismatch() {
    let h = harness();
    let created = h
        .coordinator
        .save_knowledge(&strings(&["known"]))
        .await
        .unwrap();
    let err = h
        .coordinator
        .update_knowledge(&[created[0].id, 999], &strings(&["a", "b"]))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        LoreError::CountMismatch {
            stage: "metadata lookup",
            expected: 2,
            actual: 1
        }
    );
    assert!(h.index.contains(created[0].vector_id).await);
}

#[tokio::test]
async fn update_validates_ids() {
    let h = harness();
    for result in [
        h.coordinator.update_knowledge(&[1, 1], &strings(&["a", "b"])).await,
        h.coordinator.update_knowledge(&[1, 2], &strings(&["a"])).await,
        h.coordinator.update_knowledge(&[0], &strings(&["a"])).await,
        h.coordinator.update_knowledge(&[], &[]).await,
    ] {
        assert!(matches!(result, Err(LoreError::InvalidParams(_))));
    }
}

#[tokio::test]
async fn failed_row_update_after_reindex_surfaces_store_error() {
    let index = Arc::new(InMemoryVectorIndex::new());
    let inner = SqliteMetadataStore::in_memory().unwrap();
    let seeded = inner
        .batch_create(vec![NewKnowledge {
            vector_id: 0,
            content: KnowledgeContent::pure("seed"),
            group_key: "g".into(),
        }])
        .await
        .unwrap();
    let coordinator = KnowledgeCoordinator::new(
        Arc::new(FakeEmbeddings::new(8)),
        index.clone(),
        Arc::new(BrokenWrites(inner)),
        Arc::new(ScriptedAnswerModel::always("")),
    );

    let err = coordinator
        .update_knowledge(&[seeded[0].id], &strings(&["replacement"]))
        .await
        .unwrap_err();
    assert!(matches!(err, LoreError::StoreUnavailable(_)));
    // The new vector was indexed before the row update failed.
    assert_eq!(index.len().await, 1);
}

// ---------------------------------------------------------------------------
// Delete
// ---------------------------------------------------------------------------

#[tokio::test]
async fn delete_removes_both_sides() {
    let h = harness();
    let created = h
        .coordinator
        .save_knowledge(&strings(&["gone", "stays"]))
        .await
        .unwrap();

    let deleted = h.coordinator.delete(&[created[0].id]).await.unwrap();
    assert_eq!(deleted, 1);
    assert!(h.store.get_by_id(created[0].id).await.unwrap().is_none());
    assert!(!h.index.contains(created[0].vector_id).await);
    assert!(h.index.contains(created[1].vector_id).await);

    let outcome = h.coordinator.search("gone", 5).await.unwrap();
    assert!(outcome
        .knowledges
        .iter()
        .all(|k| k.entry.id != created[0].id));
}

#[tokio::test]
async fn delete_skips_unknown_ids() {
    let h = harness();
    let created = h
        .coordinator
        .save_knowledge(&strings(&["one"]))
        .await
        .unwrap();
    let deleted = h.coordinator.delete(&[created[0].id, 777]).await.unwrap();
    assert_eq!(deleted, 1);
}

#[tokio::test]
async fn delete_of_only_unknown_ids_is_data_not_found() {
    let h = harness();
    let err = h.coordinator.delete(&[5, 6]).await.unwrap_err();
    assert_eq!(err, LoreError::DataNotFound { ids: vec![5, 6] });
    assert!(matches!(
        h.coordinator.delete(&[]).await,
        Err(LoreError::InvalidParams(_))
    ));
}

#[tokio::test]
async fn failed_vector_delete_keeps_metadata() {
    let store = Arc::new(SqliteMetadataStore::in_memory().unwrap());
    let seeded = store
        .batch_create(vec![NewKnowledge {
            vector_id: 1,
            content: KnowledgeContent::pure("kept"),
            group_key: "g".into(),
        }])
        .await
        .unwrap();
    let coordinator = KnowledgeCoordinator::new(
        Arc::new(FakeEmbeddings::new(8)),
        Arc::new(LossyIndex(InMemoryVectorIndex::new())),
        store.clone(),
        Arc::new(ScriptedAnswerModel::always("")),
    );

    let err = coordinator.delete(&[seeded[0].id]).await.unwrap_err();
    assert!(matches!(err, LoreError::StoreUnavailable(_)));
    assert!(store.get_by_id(seeded[0].id).await.unwrap().is_some());
}

// ---------------------------------------------------------------------------
// Listing
// ---------------------------------------------------------------------------

#[tokio::test]
async fn list_pages_and_filters() {
    let h = harness();
    h.coordinator
        .save_q_and_a(&strings(&["q1", "q2", "q3"]), "a")
        .await
        .unwrap();
    h.coordinator
        .save_knowledge(&strings(&["t1", "t2"]))
        .await
        .unwrap();

    let page = h.coordinator.list(1, 2, None).await.unwrap();
    assert_eq!(page.total, 5);
    assert_eq!(page.list.len(), 2);
    assert_eq!(page.list[0].content, KnowledgeContent::pure("t2"));

    let qa = h
        .coordinator
        .list(1, 10, Some(KnowledgeKind::QuestionAnswer))
        .await
        .unwrap();
    assert_eq!(qa.total, 3);

    assert!(matches!(
        h.coordinator.list(0, 10, None).await,
        Err(LoreError::InvalidParams(_))
    ));
}

#[tokio::test]
async fn group_key_lookup_returns_batch_in_creation_order() {
    let h = harness();
    let created = h
        .coordinator
        .save_knowledge(&strings(&["first", "second", "third"]))
        .await
        .unwrap();
    h.coordinator
        .save_knowledge(&strings(&["other batch"]))
        .await
        .unwrap();

    let group = h
        .coordinator
        .get_by_group_key(&created[0].group_key)
        .await
        .unwrap();
    let ids: Vec<i64> = group.iter().map(|e| e.id).collect();
    let expected: Vec<i64> = created.iter().map(|e| e.id).collect();
    assert_eq!(ids, expected);

    assert!(matches!(
        h.coordinator.get_by_group_key("").await,
        Err(LoreError::InvalidParams(_))
    ));
}
