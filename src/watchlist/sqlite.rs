//! SQLite-backed movie table.
//!
//! Similarity is computed in Rust over the stored embeddings, which is plenty
//! for a personal watch list.

use super::{rank, cosine_similarity, MovieRecord, RecordQuery, RecordStore, ScoredRecord, WatchStatus};
use crate::error::{AdvisorError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, Type, ValueRef};
use rusqlite::{params, params_from_iter, Connection, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, instrument};
use uuid::Uuid;

impl FromSql for WatchStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e: String| FromSqlError::Other(e.into()))
    }
}

/// SQLite-based record store.
pub struct SqliteRecordStore {
    conn: Mutex<Connection>,
    table: String,
}

impl SqliteRecordStore {
    /// Open (or create) the database file. The table itself is created by
    /// [`RecordStore::create_table`].
    #[instrument(skip_all)]
    pub fn new(path: &Path, table: &str) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;

        info!("Opened watch-list database at {:?}", path);
        Self::with_connection(conn, table)
    }

    /// Create an in-memory store (useful for testing).
    pub fn in_memory(table: &str) -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?, table)
    }

    fn with_connection(conn: Connection, table: &str) -> Result<Self> {
        if table.is_empty() || !table.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(AdvisorError::InvalidInput(format!(
                "Table name must be alphanumeric or '_': {:?}",
                table
            )));
        }

        Ok(Self {
            conn: Mutex::new(conn),
            table: table.to_string(),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| AdvisorError::Store(format!("Failed to acquire lock: {}", e)))
    }

    /// Serialize embedding to bytes.
    fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    /// Deserialize embedding from bytes.
    fn bytes_to_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| {
                let arr: [u8; 4] = chunk.try_into().unwrap_or_default();
                f32::from_le_bytes(arr)
            })
            .collect()
    }

    /// Map a row shaped `id, title, status, created_at, comment, content, embedding`.
    fn row_to_record(row: &Row<'_>) -> rusqlite::Result<MovieRecord> {
        let id_str: String = row.get(0)?;
        let created_at_str: String = row.get(3)?;
        let embedding_bytes: Option<Vec<u8>> = row.get(6)?;

        Ok(MovieRecord {
            id: Uuid::parse_str(&id_str)
                .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, Type::Text, Box::new(e)))?,
            title: row.get(1)?,
            status: row.get(2)?,
            created_at: DateTime::parse_from_rfc3339(&created_at_str)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(e)))?,
            comment: row.get(4)?,
            content: row.get(5)?,
            embedding: embedding_bytes
                .map(|b| Self::bytes_to_embedding(&b))
                .unwrap_or_default(),
        })
    }

    fn insert(conn: &Connection, table: &str, record: &MovieRecord) -> rusqlite::Result<usize> {
        let embedding = (!record.embedding.is_empty())
            .then(|| Self::embedding_to_bytes(&record.embedding));

        conn.execute(
            &format!(
                "INSERT INTO {} (id, title, status, comment, content, embedding, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                table
            ),
            params![
                record.id.to_string(),
                record.title,
                record.status.as_str(),
                record.comment,
                record.content,
                embedding,
                record.created_at.to_rfc3339(),
            ],
        )
    }
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
    async fn table_exists(&self) -> Result<bool> {
        let conn = self.conn()?;
        let probe = conn.query_row(&format!("SELECT COUNT(*) FROM {}", self.table), [], |row| {
            row.get::<_, i64>(0)
        });
        Ok(probe.is_ok())
    }

    #[instrument(skip(self))]
    async fn create_table(&self, dimensions: usize) -> Result<()> {
        let conn = self.conn()?;
        let statuses = WatchStatus::ALL
            .iter()
            .map(|s| format!("'{}'", s.as_str()))
            .collect::<Vec<_>>()
            .join(", ");

        conn.execute_batch(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {table} (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                status TEXT NOT NULL CHECK (status IN ({statuses})),
                comment TEXT NOT NULL,
                content TEXT NOT NULL,
                embedding BLOB CHECK (embedding IS NULL OR length(embedding) = {bytes}),
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_{table}_title ON {table}(title);
            CREATE INDEX IF NOT EXISTS idx_{table}_status ON {table}(status);
            "#,
            table = self.table,
            statuses = statuses,
            bytes = dimensions * 4,
        ))?;

        info!("Created table '{}'", self.table);
        Ok(())
    }

    #[instrument(skip(self))]
    async fn query(&self, query: &RecordQuery) -> Result<Vec<MovieRecord>> {
        use super::Column;

        let conn = self.conn()?;

        let comment = if query.wants(Column::Comment) { "comment" } else { "''" };
        let content = if query.wants(Column::Content) { "content" } else { "''" };
        let embedding = if query.wants(Column::Embedding) { "embedding" } else { "NULL" };

        let mut clauses = Vec::new();
        let mut values = Vec::new();
        if let Some(status) = query.filter.status {
            values.push(status.as_str().to_string());
            clauses.push(format!("status = ?{}", values.len()));
        }
        if let Some(title) = &query.filter.title {
            values.push(title.clone());
            clauses.push(format!("title = ?{}", values.len()));
        }
        let where_clause = if clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", clauses.join(" AND "))
        };

        let sql = format!(
            "SELECT id, title, status, created_at, {}, {}, {} FROM {} {} ORDER BY rowid LIMIT {}",
            comment, content, embedding, self.table, where_clause, query.limit
        );

        let mut stmt = conn.prepare(&sql)?;
        let records = stmt
            .query_map(params_from_iter(values.iter()), Self::row_to_record)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        debug!("Retrieved {} records from '{}'", records.len(), self.table);
        Ok(records)
    }

    #[instrument(skip(self, record), fields(title = %record.title))]
    async fn replace(&self, previous: Option<Uuid>, record: &MovieRecord) -> Result<()> {
        let conn = self.conn()?;
        let tx = conn.unchecked_transaction()?;

        if let Some(id) = previous {
            let removed = tx.execute(
                &format!("DELETE FROM {} WHERE id = ?1", self.table),
                params![id.to_string()],
            )?;
            if removed == 0 {
                return Err(AdvisorError::Store(format!(
                    "Record for '{}' changed while it was being replaced",
                    record.title
                )));
            }
        }

        let clashes: i64 = tx.query_row(
            &format!("SELECT COUNT(*) FROM {} WHERE title = ?1", self.table),
            params![record.title],
            |row| row.get(0),
        )?;
        if clashes > 0 {
            return Err(AdvisorError::Store(format!(
                "Another record for '{}' already exists",
                record.title
            )));
        }

        Self::insert(&tx, &self.table, record)?;
        tx.commit()?;

        debug!("Stored record {}", record.id);
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: Uuid) -> Result<bool> {
        let conn = self.conn()?;
        let deleted = conn.execute(
            &format!("DELETE FROM {} WHERE id = ?1", self.table),
            params![id.to_string()],
        )?;
        Ok(deleted > 0)
    }

    #[instrument(skip(self, embedding))]
    async fn nearest(&self, embedding: &[f32], k: usize) -> Result<Vec<ScoredRecord>> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare(&format!(
            "SELECT id, title, status, created_at, comment, content, embedding
             FROM {} WHERE embedding IS NOT NULL",
            self.table
        ))?;

        let scored = stmt
            .query_map([], Self::row_to_record)?
            .map(|r| {
                r.map(|record| ScoredRecord {
                    score: cosine_similarity(embedding, &record.embedding),
                    record,
                })
            })
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let results = rank(scored, k);
        debug!("Found {} nearest records", results.len());
        Ok(results)
    }

    async fn count(&self) -> Result<usize> {
        let conn = self.conn()?;
        let count: i64 =
            conn.query_row(&format!("SELECT COUNT(*) FROM {}", self.table), [], |row| row.get(0))?;
        Ok(count as usize)
    }
}
