//! In-memory record store.
//!
//! Useful for testing and for throwaway sessions.

use super::{cosine_similarity, rank, Column, MovieRecord, RecordQuery, RecordStore, ScoredRecord};
use crate::error::{AdvisorError, Result};
use async_trait::async_trait;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

/// In-memory record store. `None` until the table is created.
pub struct MemoryRecordStore {
    records: RwLock<Option<Vec<MovieRecord>>>,
}

impl MemoryRecordStore {
    /// Create a new store without a table.
    pub fn new() -> Self {
        Self {
            records: RwLock::new(None),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Option<Vec<MovieRecord>>>> {
        self.records
            .read()
            .map_err(|e| AdvisorError::Store(format!("Failed to acquire lock: {}", e)))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Option<Vec<MovieRecord>>>> {
        self.records
            .write()
            .map_err(|e| AdvisorError::Store(format!("Failed to acquire lock: {}", e)))
    }
}

impl Default for MemoryRecordStore {
    fn default() -> Self {
        Self::new()
    }
}

fn missing_table() -> AdvisorError {
    AdvisorError::Store("Table does not exist".to_string())
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn table_exists(&self) -> Result<bool> {
        Ok(self.read()?.is_some())
    }

    async fn create_table(&self, _dimensions: usize) -> Result<()> {
        let mut records = self.write()?;
        if records.is_none() {
            *records = Some(Vec::new());
        }
        Ok(())
    }

    async fn query(&self, query: &RecordQuery) -> Result<Vec<MovieRecord>> {
        let guard = self.read()?;
        let records = guard.as_ref().ok_or_else(missing_table)?;

        Ok(records
            .iter()
            .filter(|r| query.filter.matches(r))
            .take(query.limit)
            .map(|r| {
                let mut r = r.clone();
                if !query.wants(Column::Comment) {
                    r.comment.clear();
                }
                if !query.wants(Column::Content) {
                    r.content.clear();
                }
                if !query.wants(Column::Embedding) {
                    r.embedding.clear();
                }
                r
            })
            .collect())
    }

    async fn replace(&self, previous: Option<Uuid>, record: &MovieRecord) -> Result<()> {
        let mut guard = self.write()?;
        let records = guard.as_mut().ok_or_else(missing_table)?;

        let position = match previous {
            Some(id) => Some(records.iter().position(|r| r.id == id).ok_or_else(|| {
                AdvisorError::Store(format!(
                    "Record for '{}' changed while it was being replaced",
                    record.title
                ))
            })?),
            None => None,
        };

        let clash = records
            .iter()
            .enumerate()
            .any(|(i, r)| Some(i) != position && r.title == record.title);
        if clash {
            return Err(AdvisorError::Store(format!(
                "Another record for '{}' already exists",
                record.title
            )));
        }

        if let Some(i) = position {
            records.remove(i);
        }
        records.push(record.clone());
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let mut guard = self.write()?;
        let records = guard.as_mut().ok_or_else(missing_table)?;

        let before = records.len();
        records.retain(|r| r.id != id);
        Ok(records.len() < before)
    }

    async fn nearest(&self, embedding: &[f32], k: usize) -> Result<Vec<ScoredRecord>> {
        let guard = self.read()?;
        let records = guard.as_ref().ok_or_else(missing_table)?;

        let scored = records
            .iter()
            .filter(|r| !r.embedding.is_empty())
            .map(|r| ScoredRecord {
                score: cosine_similarity(embedding, &r.embedding),
                record: r.clone(),
            })
            .collect();

        Ok(rank(scored, k))
    }

    async fn count(&self) -> Result<usize> {
        let guard = self.read()?;
        Ok(guard.as_ref().ok_or_else(missing_table)?.len())
    }
}
