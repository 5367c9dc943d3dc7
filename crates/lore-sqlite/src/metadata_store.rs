use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use lore_core::{
    KnowledgeChanges, KnowledgeEntry, KnowledgeKind, KnowledgeRecord, LoreError, MetadataStore,
    NewKnowledge,
};
use rusqlite::{params, params_from_iter, Connection, Row};

const COLUMNS: &str =
    "id, question, answer, text, vector_id, type, group_key, created_at, updated_at";

/// SQLite-backed metadata store.
///
/// Keeps knowledge rows in a local SQLite database file (or in-memory for
/// testing). Uses `tokio::task::spawn_blocking` to avoid blocking the async
/// runtime during SQLite operations.
///
/// # Example
///
/// ```rust,no_run
/// use lore_sqlite::SqliteMetadataStore;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// // File-based (persists across restarts)
/// let store = SqliteMetadataStore::new("/var/lib/lore/lore.db")?;
///
/// // In-memory (for testing)
/// let store = SqliteMetadataStore::in_memory()?;
/// # Ok(())
/// # }
/// ```
pub struct SqliteMetadataStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteMetadataStore {
    /// Open (or create) a store backed by a SQLite database file.
    pub fn new(path: impl AsRef<std::path::Path>) -> Result<Self, LoreError> {
        let conn = Connection::open(path)
            .map_err(|e| LoreError::StoreUnavailable(format!("SQLite open: {e}")))?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS knowledge (
                id         INTEGER PRIMARY KEY AUTOINCREMENT,
                question   TEXT    NOT NULL DEFAULT '',
                answer     TEXT    NOT NULL DEFAULT '',
                text       TEXT    NOT NULL DEFAULT '',
                vector_id  INTEGER NOT NULL,
                type       INTEGER NOT NULL,
                group_key  TEXT    NOT NULL,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_knowledge_vector_id ON knowledge (vector_id);
            CREATE INDEX IF NOT EXISTS idx_knowledge_group_key ON knowledge (group_key);",
        )
        .map_err(|e| LoreError::StoreUnavailable(format!("SQLite create tables: {e}")))?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Create an in-memory store (useful for testing).
    pub fn in_memory() -> Result<Self, LoreError> {
        Self::new(":memory:")
    }

    /// Run `f` against the connection on the blocking pool.
    async fn with_conn<T, F>(&self, f: F) -> Result<T, LoreError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T, LoreError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut conn = conn
                .lock()
                .map_err(|e| LoreError::StoreUnavailable(format!("Lock: {e}")))?;
            f(&mut conn)
        })
        .await
        .map_err(|e| LoreError::StoreUnavailable(format!("spawn_blocking: {e}")))?
    }
}

fn now_secs() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

fn read_record(row: &Row<'_>) -> rusqlite::Result<KnowledgeRecord> {
    Ok(KnowledgeRecord {
        id: row.get(0)?,
        question: row.get(1)?,
        answer: row.get(2)?,
        text: row.get(3)?,
        vector_id: row.get(4)?,
        kind: row.get(5)?,
        group_key: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

/// Run a SELECT returning knowledge rows.
fn query_entries(
    conn: &Connection,
    sql: &str,
    params: impl rusqlite::Params,
) -> Result<Vec<KnowledgeEntry>, LoreError> {
    let mut stmt = conn
        .prepare(sql)
        .map_err(|e| LoreError::StoreUnavailable(format!("SQLite prepare: {e}")))?;
    let records = stmt
        .query_map(params, read_record)
        .map_err(|e| LoreError::StoreUnavailable(format!("SQLite query: {e}")))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| LoreError::StoreUnavailable(format!("SQLite row: {e}")))?;
    records.into_iter().map(KnowledgeEntry::try_from).collect()
}

/// `?1, ?2, ...` for an IN clause of `n` values.
fn placeholders(n: usize) -> String {
    (1..=n)
        .map(|i| format!("?{i}"))
        .collect::<Vec<_>>()
        .join(", ")
}

#[async_trait]
impl MetadataStore for SqliteMetadataStore {
    async fn batch_create(
        &self,
        rows: Vec<NewKnowledge>,
    ) -> Result<Vec<KnowledgeEntry>, LoreError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let now = now_secs();

        self.with_conn(move |conn| {
            let tx = conn
                .transaction()
                .map_err(|e| LoreError::StoreUnavailable(format!("SQLite BEGIN: {e}")))?;
            let mut created = Vec::with_capacity(rows.len());
            for row in rows {
                let mut entry = KnowledgeEntry {
                    id: 0,
                    vector_id: row.vector_id,
                    content: row.content,
                    group_key: row.group_key,
                    created_at: now,
                    updated_at: now,
                };
                let record = KnowledgeRecord::from(entry.clone());
                tx.execute(
                    "INSERT INTO knowledge \
                     (question, answer, text, vector_id, type, group_key, created_at, updated_at) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                    params![
                        record.question,
                        record.answer,
                        record.text,
                        record.vector_id,
                        record.kind,
                        record.group_key,
                        now,
                        now
                    ],
                )
                .map_err(|e| LoreError::StoreUnavailable(format!("SQLite INSERT: {e}")))?;
                entry.id = tx.last_insert_rowid();
                created.push(entry);
            }
            // Dropping an uncommitted transaction rolls it back.
            tx.commit()
                .map_err(|e| LoreError::StoreUnavailable(format!("SQLite COMMIT: {e}")))?;
            Ok(created)
        })
        .await
    }

    async fn batch_get_by_vector_ids(
        &self,
        vector_ids: &[i64],
    ) -> Result<Vec<KnowledgeEntry>, LoreError> {
        if vector_ids.is_empty() {
            return Ok(Vec::new());
        }
        let vector_ids = vector_ids.to_vec();
        self.with_conn(move |conn| {
            let sql = format!(
                "SELECT {COLUMNS} FROM knowledge WHERE vector_id IN ({}) ORDER BY id ASC",
                placeholders(vector_ids.len())
            );
            query_entries(conn, &sql, params_from_iter(vector_ids.iter()))
        })
        .await
    }

    async fn batch_get_by_ids(&self, ids: &[i64]) -> Result<Vec<KnowledgeEntry>, LoreError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let ids = ids.to_vec();
        self.with_conn(move |conn| {
            let sql = format!(
                "SELECT {COLUMNS} FROM knowledge WHERE id IN ({}) ORDER BY id ASC",
                placeholders(ids.len())
            );
            query_entries(conn, &sql, params_from_iter(ids.iter()))
        })
        .await
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<KnowledgeEntry>, LoreError> {
        let mut found = self.batch_get_by_ids(&[id]).await?;
        Ok(found.pop())
    }

    async fn update_by_id(&self, id: i64, changes: KnowledgeChanges) -> Result<(), LoreError> {
        let record = KnowledgeRecord::from(KnowledgeEntry {
            id,
            vector_id: changes.vector_id,
            content: changes.content,
            group_key: String::new(),
            created_at: 0,
            updated_at: 0,
        });
        let now = now_secs();

        let changed = self
            .with_conn(move |conn| {
                conn.execute(
                    "UPDATE knowledge \
                     SET question = ?1, answer = ?2, text = ?3, type = ?4, vector_id = ?5, \
                         updated_at = ?6 \
                     WHERE id = ?7",
                    params![
                        record.question,
                        record.answer,
                        record.text,
                        record.kind,
                        record.vector_id,
                        now,
                        id
                    ],
                )
                .map_err(|e| LoreError::StoreUnavailable(format!("SQLite UPDATE: {e}")))
            })
            .await?;

        if changed == 0 {
            return Err(LoreError::DataNotFound { ids: vec![id] });
        }
        Ok(())
    }

    async fn list_page(
        &self,
        page: usize,
        page_size: usize,
        kind: Option<KnowledgeKind>,
    ) -> Result<(Vec<KnowledgeEntry>, u64), LoreError> {
        // 0 means "any kind".
        let kind_code = kind.map(|k| k.code()).unwrap_or(0);
        let limit = i64::try_from(page_size).unwrap_or(i64::MAX);
        // A page past any representable offset has no rows.
        let offset = (page.max(1) - 1)
            .checked_mul(page_size)
            .and_then(|o| i64::try_from(o).ok());

        self.with_conn(move |conn| {
            let total: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM knowledge WHERE (?1 = 0 OR type = ?1)",
                    params![kind_code],
                    |row| row.get(0),
                )
                .map_err(|e| LoreError::StoreUnavailable(format!("SQLite COUNT: {e}")))?;
            let Some(offset) = offset else {
                return Ok((Vec::new(), total.max(0) as u64));
            };
            let list = query_entries(
                conn,
                &format!(
                    "SELECT {COLUMNS} FROM knowledge WHERE (?1 = 0 OR type = ?1) \
                     ORDER BY id DESC LIMIT ?2 OFFSET ?3"
                ),
                params![kind_code, limit, offset],
            )?;
            Ok((list, total.max(0) as u64))
        })
        .await
    }

    async fn list_by_group_key(&self, group_key: &str) -> Result<Vec<KnowledgeEntry>, LoreError> {
        let group_key = group_key.to_string();
        self.with_conn(move |conn| {
            query_entries(
                conn,
                &format!("SELECT {COLUMNS} FROM knowledge WHERE group_key = ?1 ORDER BY id ASC"),
                params![group_key],
            )
        })
        .await
    }

    async fn delete_by_ids(&self, ids: &[i64]) -> Result<u64, LoreError> {
        if ids.is_empty() {
            return Ok(0);
        }
        let ids = ids.to_vec();
        let deleted = self
            .with_conn(move |conn| {
                let sql = format!(
                    "DELETE FROM knowledge WHERE id IN ({})",
                    placeholders(ids.len())
                );
                conn.execute(&sql, params_from_iter(ids.iter()))
                    .map_err(|e| LoreError::StoreUnavailable(format!("SQLite DELETE: {e}")))
            })
            .await?;
        tracing::debug!(deleted, "deleted knowledge rows");
        Ok(deleted as u64)
    }
}
