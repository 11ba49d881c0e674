//! Watch-list storage.
//!
//! A single table of [`MovieRecord`]s behind the [`RecordStore`] backend trait,
//! and the [`WatchList`] service that layers title-keyed upserts, the per-status
//! summary and embedding-backed search on top of it.

mod memory;
mod service;
mod sqlite;

pub use memory::MemoryRecordStore;
pub use service::{WatchBucket, WatchList, WatchLists, HISTORY_HEADER};
pub use sqlite::SqliteRecordStore;

use crate::config::StatusGranularity;
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Where a title sits in the user's movie history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WatchStatus {
    Watched,
    WatchedLiked,
    WatchedDisliked,
    MustSee,
    NotInterested,
}

impl WatchStatus {
    pub const ALL: [WatchStatus; 5] = [
        WatchStatus::Watched,
        WatchStatus::WatchedLiked,
        WatchStatus::WatchedDisliked,
        WatchStatus::MustSee,
        WatchStatus::NotInterested,
    ];

    /// Stored representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            WatchStatus::Watched => "watched",
            WatchStatus::WatchedLiked => "watched_liked",
            WatchStatus::WatchedDisliked => "watched_disliked",
            WatchStatus::MustSee => "must_see",
            WatchStatus::NotInterested => "not_interested",
        }
    }

    /// Human-readable list name.
    pub fn label(&self) -> &'static str {
        match self {
            WatchStatus::Watched => "Watched",
            WatchStatus::WatchedLiked => "Watched and liked",
            WatchStatus::WatchedDisliked => "Watched and disliked",
            WatchStatus::MustSee => "Must see",
            WatchStatus::NotInterested => "Not interested",
        }
    }
}

impl std::str::FromStr for WatchStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        WatchStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("Unknown watch status: {}", s))
    }
}

impl std::fmt::Display for WatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl StatusGranularity {
    /// Summary buckets, in display order.
    pub fn statuses(&self) -> &'static [WatchStatus] {
        match self {
            StatusGranularity::Coarse => &[
                WatchStatus::Watched,
                WatchStatus::MustSee,
                WatchStatus::NotInterested,
            ],
            // Plain `watched` rows (written under the coarse mode) keep their own bucket.
            StatusGranularity::LikedDisliked => &[
                WatchStatus::WatchedLiked,
                WatchStatus::WatchedDisliked,
                WatchStatus::Watched,
                WatchStatus::MustSee,
                WatchStatus::NotInterested,
            ],
        }
    }

    /// The bucket a stored status is listed under.
    pub fn bucket_for(&self, status: WatchStatus) -> WatchStatus {
        match (self, status) {
            (StatusGranularity::Coarse, WatchStatus::WatchedLiked | WatchStatus::WatchedDisliked) => {
                WatchStatus::Watched
            }
            _ => status,
        }
    }
}

/// One title in the movie history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MovieRecord {
    /// Assigned on creation; a status or comment change produces a new id.
    pub id: Uuid,
    pub title: String,
    pub status: WatchStatus,
    /// Personal note, normalized to English by the model.
    pub comment: String,
    /// `"{title} ({status}) {comment}"`, the text that gets embedded.
    pub content: String,
    /// Embedding of `content`. Empty when not loaded.
    #[serde(skip)]
    pub embedding: Vec<f32>,
    pub created_at: DateTime<Utc>,
}

impl MovieRecord {
    /// Create a new record with a fresh id and derived content.
    pub fn new(title: &str, status: WatchStatus, comment: &str) -> Self {
        let title = title.trim().to_string();
        let comment = comment.trim().to_string();
        Self {
            id: Uuid::new_v4(),
            content: Self::derive_content(&title, status, &comment),
            title,
            status,
            comment,
            embedding: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Build the display/search string for a record.
    pub fn derive_content(title: &str, status: WatchStatus, comment: &str) -> String {
        format!("{} ({}) {}", title, status, comment)
    }
}

/// Columns that can be selected in a listing.
///
/// `id`, `title`, `status` and `created_at` are always returned; the others are
/// left empty unless selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Title,
    Status,
    Comment,
    Content,
    Embedding,
}

/// Equality predicate for listings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordFilter {
    pub status: Option<WatchStatus>,
    pub title: Option<String>,
}

impl RecordFilter {
    pub fn status(status: WatchStatus) -> Self {
        Self {
            status: Some(status),
            title: None,
        }
    }

    pub fn title(title: &str) -> Self {
        Self {
            status: None,
            title: Some(title.to_string()),
        }
    }

    /// Whether a record satisfies every set field.
    pub fn matches(&self, record: &MovieRecord) -> bool {
        self.status.map_or(true, |s| s == record.status)
            && self.title.as_deref().map_or(true, |t| t == record.title)
    }
}

/// A listing request passed to the backend.
#[derive(Debug, Clone)]
pub struct RecordQuery {
    pub columns: Option<Vec<Column>>,
    pub filter: RecordFilter,
    pub limit: usize,
}

impl RecordQuery {
    /// Whether a column should be filled in.
    pub fn wants(&self, column: Column) -> bool {
        self.columns.as_ref().map_or(true, |c| c.contains(&column))
    }
}

/// Result of a listing capped at the page size.
#[derive(Debug, Clone, Default)]
pub struct RecordPage {
    pub records: Vec<MovieRecord>,
    /// More records matched than the page could hold.
    pub truncated: bool,
}

/// A record with its similarity score.
#[derive(Debug, Clone)]
pub struct ScoredRecord {
    pub record: MovieRecord,
    /// Cosine similarity (higher is better).
    pub score: f32,
}

/// Backend holding the movie table.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Probe the table with a query; `false` when it does not exist.
    async fn table_exists(&self) -> Result<bool>;

    /// Create the table for embeddings of the given dimension.
    async fn create_table(&self, dimensions: usize) -> Result<()>;

    /// List records in insertion order, up to `query.limit`.
    async fn query(&self, query: &RecordQuery) -> Result<Vec<MovieRecord>>;

    /// Atomically delete `previous` (if any) and insert `record`.
    ///
    /// Fails without changing anything when `previous` is already gone, or when
    /// another record with the same title exists after the delete.
    async fn replace(&self, previous: Option<Uuid>, record: &MovieRecord) -> Result<()>;

    /// Delete a record by id. Returns whether a record was removed.
    async fn delete(&self, id: Uuid) -> Result<bool>;

    /// The `k` records whose embeddings are closest to `embedding`.
    async fn nearest(&self, embedding: &[f32], k: usize) -> Result<Vec<ScoredRecord>>;

    /// Total number of records.
    async fn count(&self) -> Result<usize>;
}

/// Compute cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

/// Sort scored records best-first and keep `k`.
pub(crate) fn rank(mut results: Vec<ScoredRecord>, k: usize) -> Vec<ScoredRecord> {
    results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    results.truncate(k);
    results
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_similarity() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 0.001);

        let c = vec![0.0, 1.0, 0.0];
        assert!((cosine_similarity(&a, &c)).abs() < 0.001);

        let d = vec![-1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &d) + 1.0).abs() < 0.001);
    }

    #[test]
    fn test_record_content_is_derived() {
        let record = MovieRecord::new(" Seven ", WatchStatus::MustSee, "recommended by a friend");
        assert_eq!(record.title, "Seven");
        assert_eq!(record.content, "Seven (must_see) recommended by a friend");
    }

    #[test]
    fn test_status_round_trip_through_str() {
        for status in WatchStatus::ALL {
            assert_eq!(status.as_str().parse::<WatchStatus>().unwrap(), status);
        }
        assert!("seen".parse::<WatchStatus>().is_err());
    }

    #[test]
    fn test_coarse_buckets_fold_opinions() {
        let coarse = StatusGranularity::Coarse;
        assert_eq!(coarse.bucket_for(WatchStatus::WatchedLiked), WatchStatus::Watched);
        assert_eq!(coarse.bucket_for(WatchStatus::MustSee), WatchStatus::MustSee);

        let fine = StatusGranularity::LikedDisliked;
        assert_eq!(fine.bucket_for(WatchStatus::WatchedDisliked), WatchStatus::WatchedDisliked);
        assert!(fine.statuses().contains(&WatchStatus::Watched));
    }

    #[test]
    fn test_filter_matches() {
        let record = MovieRecord::new("Heat", WatchStatus::Watched, "");
        assert!(RecordFilter::default().matches(&record));
        assert!(RecordFilter::status(WatchStatus::Watched).matches(&record));
        assert!(!RecordFilter::status(WatchStatus::MustSee).matches(&record));
        assert!(RecordFilter::title("Heat").matches(&record));
        assert!(!RecordFilter::title("heat").matches(&record));
    }
}
