//! Watch-list operations used by the advisor's tools.

use super::{Column, MovieRecord, RecordFilter, RecordPage, RecordQuery, RecordStore, WatchStatus};
use crate::config::StatusGranularity;
use crate::embedding::Embedder;
use crate::error::{AdvisorError, Result};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

/// First line of the rendered watch-list summary.
pub const HISTORY_HEADER: &str = "Here is my movie history. Do not recommend any of these:";

/// Default listing cap.
const DEFAULT_PAGE_SIZE: usize = 1000;

/// The user's movie history, backed by a [`RecordStore`] and an [`Embedder`].
pub struct WatchList {
    store: Arc<dyn RecordStore>,
    embedder: Arc<dyn Embedder>,
    page_size: usize,
}

impl WatchList {
    /// Create a watch list over a store.
    pub fn new(store: Arc<dyn RecordStore>, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            store,
            embedder,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Set the maximum number of records a listing returns.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Create the table if it does not exist yet.
    ///
    /// Idempotent. Failures are logged, not returned; later operations report
    /// the problem.
    #[instrument(skip(self))]
    pub async fn ensure_schema(&self) {
        match self.store.table_exists().await {
            Ok(true) => {
                debug!("Watch-list table already exists");
                return;
            }
            Ok(false) => info!("Watch-list table does not exist. Creating table."),
            Err(e) => warn!("Could not probe watch-list table ({}). Creating table.", e),
        }

        match self.store.create_table(self.embedder.dimensions()).await {
            Ok(()) => info!("Watch-list table created successfully"),
            Err(e) => error!("Error creating watch-list table: {}", e),
        }
    }

    /// List up to the page size of records, optionally projected and filtered.
    ///
    /// `truncated` is set (and a warning logged) when more records exist.
    #[instrument(skip(self))]
    pub async fn list_records(
        &self,
        columns: Option<&[Column]>,
        filter: Option<&RecordFilter>,
    ) -> Result<RecordPage> {
        let query = RecordQuery {
            columns: columns.map(|c| c.to_vec()),
            filter: filter.cloned().unwrap_or_default(),
            limit: self.page_size + 1,
        };

        let mut records = self.store.query(&query).await?;
        let truncated = records.len() > self.page_size;
        if truncated {
            records.truncate(self.page_size);
            warn!("Watch list holds more than {} matching records; listing is truncated", self.page_size);
        }

        debug!("Retrieved {} records from table", records.len());
        Ok(RecordPage { records, truncated })
    }

    /// Store a record, replacing any existing record with the same title.
    ///
    /// The record gets a new id, its content is re-derived and its embedding
    /// computed before the store is touched: if embedding fails the previous
    /// record stays as it was.
    #[instrument(skip(self, record), fields(title = %record.title, status = %record.status))]
    pub async fn upsert_record(&self, record: MovieRecord) -> Result<MovieRecord> {
        if record.title.trim().is_empty() {
            return Err(AdvisorError::InvalidInput("Movie title must not be empty".to_string()));
        }

        let mut record = MovieRecord::new(&record.title, record.status, &record.comment);
        let embedding = self.embedder.embed(&record.content).await?;
        if embedding.len() != self.embedder.dimensions() {
            return Err(AdvisorError::Embedding(format!(
                "Expected {} dimensions, got {}",
                self.embedder.dimensions(),
                embedding.len()
            )));
        }
        record.embedding = embedding;

        let previous = self.find_by_title(&record.title).await?.map(|r| r.id);

        self.store.replace(previous, &record).await?;

        match previous {
            Some(_) => debug!("Replaced record '{}' ({})", record.title, record.status),
            None => debug!("Added record '{}' ({})", record.title, record.status),
        }
        Ok(record)
    }

    /// Delete the record for a title from every list. Returns whether one existed.
    #[instrument(skip(self))]
    pub async fn delete_record(&self, title: &str) -> Result<bool> {
        let title = title.trim();
        let Some(record) = self.find_by_title(title).await? else {
            debug!("No record titled '{}' to delete", title);
            return Ok(false);
        };

        let deleted = self.store.delete(record.id).await?;
        debug!("Deleted record '{}'", title);
        Ok(deleted)
    }

    /// The stored record for a title, looked up past the listing cap.
    async fn find_by_title(&self, title: &str) -> Result<Option<MovieRecord>> {
        let query = RecordQuery {
            columns: Some(vec![Column::Title]),
            filter: RecordFilter::title(title),
            limit: 1,
        };
        Ok(self.store.query(&query).await?.into_iter().next())
    }

    /// Partition every stored title by status.
    #[instrument(skip(self))]
    pub async fn summarize_lists(&self, granularity: StatusGranularity) -> Result<WatchLists> {
        let page = self
            .list_records(Some(&[Column::Title, Column::Status]), None)
            .await?;

        let mut buckets: Vec<WatchBucket> = granularity
            .statuses()
            .iter()
            .map(|&status| WatchBucket {
                status,
                titles: Vec::new(),
            })
            .collect();

        for record in page.records {
            let bucket = granularity.bucket_for(record.status);
            if let Some(b) = buckets.iter_mut().find(|b| b.status == bucket) {
                b.titles.push(record.title);
            }
        }

        // Plain `watched` only shows up in the fine view when something is in it
        if granularity == StatusGranularity::LikedDisliked {
            buckets.retain(|b| b.status != WatchStatus::Watched || !b.titles.is_empty());
        }

        let lists = WatchLists {
            buckets,
            truncated: page.truncated,
        };
        debug!("Retrieved watch lists: {}", lists);
        Ok(lists)
    }

    /// Stored contents closest to `query`, best first. Empty when nothing matches.
    #[instrument(skip(self))]
    pub async fn similarity_search(&self, query: &str, k: usize) -> Result<Vec<String>> {
        if self.store.count().await? == 0 {
            debug!("No records in table, skipping search");
            return Ok(Vec::new());
        }

        let embedding = self.embedder.embed(query).await?;
        let results = self.store.nearest(&embedding, k).await?;

        if results.is_empty() {
            debug!("No records found for '{}'", query);
        }

        Ok(results.into_iter().map(|r| r.record.content).collect())
    }
}

/// Titles stored under one status.
#[derive(Debug, Clone, PartialEq)]
pub struct WatchBucket {
    pub status: WatchStatus,
    pub titles: Vec<String>,
}

/// The movie history partitioned by status.
#[derive(Debug, Clone, PartialEq)]
pub struct WatchLists {
    pub buckets: Vec<WatchBucket>,
    /// The listing hit the page size; some titles are missing.
    pub truncated: bool,
}

impl WatchLists {
    /// Titles in a bucket (empty if the bucket is not part of this view).
    pub fn titles(&self, status: WatchStatus) -> &[String] {
        self.buckets
            .iter()
            .find(|b| b.status == status)
            .map(|b| b.titles.as_slice())
            .unwrap_or(&[])
    }

    /// The bucket a title is listed under, if any.
    pub fn status_of(&self, title: &str) -> Option<WatchStatus> {
        self.buckets
            .iter()
            .find(|b| b.titles.iter().any(|t| t == title))
            .map(|b| b.status)
    }

    /// Total number of titles.
    pub fn len(&self) -> usize {
        self.buckets.iter().map(|b| b.titles.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Structured form: `{status: [titles]}`.
    pub fn to_json(&self) -> serde_json::Value {
        let map: serde_json::Map<String, serde_json::Value> = self
            .buckets
            .iter()
            .map(|b| (b.status.as_str().to_string(), serde_json::json!(b.titles)))
            .collect();
        serde_json::Value::Object(map)
    }
}

impl std::fmt::Display for WatchLists {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{}", HISTORY_HEADER)?;
        for (i, bucket) in self.buckets.iter().enumerate() {
            write!(f, "{}. {} ({}):", i + 1, bucket.status.label(), bucket.titles.len())?;
            if !bucket.titles.is_empty() {
                write!(f, " {}", bucket.titles.join(", "))?;
            }
            writeln!(f)?;
        }
        if self.truncated {
            writeln!(f, "(The history is longer than shown; some titles are missing.)")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::testing::{FailingEmbedder, KeywordEmbedder};
    use crate::watchlist::{MemoryRecordStore, ScoredRecord, SqliteRecordStore};
    use async_trait::async_trait;
    use uuid::Uuid;

    async fn sqlite_watch_list() -> WatchList {
        let store = Arc::new(SqliteRecordStore::in_memory("movie_history").unwrap());
        let list = WatchList::new(store, Arc::new(KeywordEmbedder::new(1536)));
        list.ensure_schema().await;
        list
    }

    async fn add(list: &WatchList, title: &str, status: WatchStatus, comment: &str) -> MovieRecord {
        list.upsert_record(MovieRecord::new(title, status, comment))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_upsert_twice_keeps_latest() {
        let list = sqlite_watch_list().await;

        let first = add(&list, "Heat", WatchStatus::MustSee, "everyone talks about it").await;
        let second = add(&list, "Heat", WatchStatus::Watched, "great shootout").await;
        assert_ne!(first.id, second.id);

        let page = list
            .list_records(None, Some(&RecordFilter::title("Heat")))
            .await
            .unwrap();
        assert_eq!(page.records.len(), 1);
        assert_eq!(page.records[0].status, WatchStatus::Watched);
        assert_eq!(page.records[0].comment, "great shootout");
        assert_eq!(page.records[0].content, "Heat (watched) great shootout");
        assert_eq!(page.records[0].embedding.len(), 1536);
    }

    #[tokio::test]
    async fn test_summary_tracks_last_write_per_title() {
        let list = sqlite_watch_list().await;

        add(&list, "Heat", WatchStatus::MustSee, "").await;
        add(&list, "Seven", WatchStatus::MustSee, "").await;
        add(&list, "Alien", WatchStatus::NotInterested, "").await;
        add(&list, "Heat", WatchStatus::Watched, "").await;
        add(&list, "Alien", WatchStatus::MustSee, "").await;
        assert!(list.delete_record("Seven").await.unwrap());

        let lists = list.summarize_lists(StatusGranularity::Coarse).await.unwrap();
        assert_eq!(lists.titles(WatchStatus::Watched), ["Heat"]);
        assert_eq!(lists.titles(WatchStatus::MustSee), ["Alien"]);
        assert!(lists.titles(WatchStatus::NotInterested).is_empty());
        assert_eq!(lists.status_of("Seven"), None);
        assert_eq!(lists.len(), 2);
    }

    #[tokio::test]
    async fn test_watched_scenario() {
        let list = sqlite_watch_list().await;
        add(&list, "Amélie", WatchStatus::Watched, "loved it").await;

        let lists = list.summarize_lists(StatusGranularity::Coarse).await.unwrap();
        assert_eq!(lists.titles(WatchStatus::Watched), ["Amélie"]);
        assert_eq!(
            lists.to_json(),
            serde_json::json!({"watched": ["Amélie"], "must_see": [], "not_interested": []})
        );
    }

    #[tokio::test]
    async fn test_summary_rendering() {
        let list = sqlite_watch_list().await;
        add(&list, "Heat", WatchStatus::WatchedLiked, "").await;
        add(&list, "Cats", WatchStatus::WatchedDisliked, "").await;
        add(&list, "Seven", WatchStatus::MustSee, "").await;

        let coarse = list.summarize_lists(StatusGranularity::Coarse).await.unwrap();
        assert_eq!(
            coarse.to_string(),
            format!(
                "{}\n1. Watched (2): Heat, Cats\n2. Must see (1): Seven\n3. Not interested (0):\n",
                HISTORY_HEADER
            )
        );

        let fine = list
            .summarize_lists(StatusGranularity::LikedDisliked)
            .await
            .unwrap();
        assert_eq!(fine.buckets.len(), 4);
        assert_eq!(fine.titles(WatchStatus::WatchedLiked), ["Heat"]);
        assert_eq!(fine.titles(WatchStatus::WatchedDisliked), ["Cats"]);
        assert!(fine.to_string().contains("2. Watched and disliked (1): Cats"));
    }

    #[tokio::test]
    async fn test_fine_view_keeps_plain_watched_titles() {
        let list = sqlite_watch_list().await;
        add(&list, "Heat", WatchStatus::Watched, "").await;

        let fine = list
            .summarize_lists(StatusGranularity::LikedDisliked)
            .await
            .unwrap();
        assert_eq!(fine.buckets.len(), 5);
        assert_eq!(fine.status_of("Heat"), Some(WatchStatus::Watched));
    }

    #[tokio::test]
    async fn test_add_then_remove_clears_all_lists() {
        let list = sqlite_watch_list().await;
        add(&list, "Seven", WatchStatus::MustSee, "recommended by a friend").await;
        assert!(list.delete_record("Seven").await.unwrap());

        let lists = list.summarize_lists(StatusGranularity::Coarse).await.unwrap();
        assert!(lists.is_empty());
        assert_eq!(lists.status_of("Seven"), None);
    }

    #[tokio::test]
    async fn test_delete_missing_title_is_not_an_error() {
        let list = sqlite_watch_list().await;
        assert!(!list.delete_record("Nope").await.unwrap());
    }

    #[tokio::test]
    async fn test_similarity_search() {
        let list = sqlite_watch_list().await;
        assert!(list.similarity_search("anything", 3).await.unwrap().is_empty());

        add(&list, "Heat", WatchStatus::Watched, "loved the bank robbery scene").await;
        add(&list, "Amélie", WatchStatus::Watched, "charming and whimsical paris").await;
        add(&list, "Alien", WatchStatus::NotInterested, "horror is not my thing").await;

        let results = list.similarity_search("robbery", 1).await.unwrap();
        assert_eq!(results, vec!["Heat (watched) loved the bank robbery scene".to_string()]);

        let results = list.similarity_search("paris", 3).await.unwrap();
        assert_eq!(results.len(), 3);
        assert!(results[0].starts_with("Amélie"));
    }

    #[tokio::test]
    async fn test_empty_search_never_embeds() {
        let store = Arc::new(MemoryRecordStore::new());
        let list = WatchList::new(store, Arc::new(FailingEmbedder));
        list.ensure_schema().await;
        assert!(list.similarity_search("anything", 3).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_embedding_failure_leaves_previous_record() {
        let store = Arc::new(MemoryRecordStore::new());
        let good = WatchList::new(store.clone(), Arc::new(KeywordEmbedder::new(8)));
        good.ensure_schema().await;
        add(&good, "Heat", WatchStatus::MustSee, "").await;

        let broken = WatchList::new(store, Arc::new(FailingEmbedder));
        let result = broken
            .upsert_record(MovieRecord::new("Heat", WatchStatus::Watched, ""))
            .await;
        assert!(matches!(result, Err(AdvisorError::Embedding(_))));

        let lists = good.summarize_lists(StatusGranularity::Coarse).await.unwrap();
        assert_eq!(lists.titles(WatchStatus::MustSee), ["Heat"]);
    }

    #[tokio::test]
    async fn test_empty_title_rejected() {
        let list = sqlite_watch_list().await;
        let result = list
            .upsert_record(MovieRecord::new("  ", WatchStatus::Watched, ""))
            .await;
        assert!(matches!(result, Err(AdvisorError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_listing_cap_is_surfaced() {
        let store = Arc::new(MemoryRecordStore::new());
        let list = WatchList::new(store, Arc::new(KeywordEmbedder::new(8))).with_page_size(2);
        list.ensure_schema().await;

        add(&list, "Heat", WatchStatus::Watched, "").await;
        add(&list, "Seven", WatchStatus::Watched, "").await;
        let page = list.list_records(None, None).await.unwrap();
        assert!(!page.truncated);

        add(&list, "Alien", WatchStatus::Watched, "").await;
        let page = list.list_records(None, None).await.unwrap();
        assert_eq!(page.records.len(), 2);
        assert!(page.truncated);

        let lists = list.summarize_lists(StatusGranularity::Coarse).await.unwrap();
        assert!(lists.truncated);
        assert!(lists.to_string().contains("history is longer than shown"));
    }

    #[tokio::test]
    async fn test_titles_past_listing_cap_stay_writable() {
        for store in [
            Arc::new(MemoryRecordStore::new()) as Arc<dyn RecordStore>,
            Arc::new(SqliteRecordStore::in_memory("movie_history").unwrap()),
        ] {
            let list = WatchList::new(store.clone(), Arc::new(KeywordEmbedder::new(8))).with_page_size(2);
            list.ensure_schema().await;

            add(&list, "Heat", WatchStatus::Watched, "").await;
            add(&list, "Seven", WatchStatus::Watched, "").await;
            add(&list, "Alien", WatchStatus::MustSee, "").await;
            assert!(list.list_records(None, None).await.unwrap().truncated);

            add(&list, "Alien", WatchStatus::NotInterested, "too scary").await;
            let page = list
                .list_records(None, Some(&RecordFilter::title("Alien")))
                .await
                .unwrap();
            assert_eq!(page.records.len(), 1);
            assert_eq!(page.records[0].status, WatchStatus::NotInterested);
            assert_eq!(store.count().await.unwrap(), 3);

            assert!(list.delete_record("Alien").await.unwrap());
            assert_eq!(store.count().await.unwrap(), 2);
        }
    }

    #[tokio::test]
    async fn test_ensure_schema_is_idempotent() {
        let list = sqlite_watch_list().await;
        add(&list, "Heat", WatchStatus::Watched, "").await;
        list.ensure_schema().await;

        let page = list.list_records(None, None).await.unwrap();
        assert_eq!(page.records.len(), 1);
    }

    /// Backend whose schema can never be created.
    struct ReadOnlyStore;

    #[async_trait]
    impl RecordStore for ReadOnlyStore {
        async fn table_exists(&self) -> Result<bool> {
            Ok(false)
        }
        async fn create_table(&self, _dimensions: usize) -> Result<()> {
            Err(AdvisorError::Store("permission denied".to_string()))
        }
        async fn query(&self, _query: &RecordQuery) -> Result<Vec<MovieRecord>> {
            Err(AdvisorError::Store("no such table".to_string()))
        }
        async fn replace(&self, _previous: Option<Uuid>, _record: &MovieRecord) -> Result<()> {
            Err(AdvisorError::Store("no such table".to_string()))
        }
        async fn delete(&self, _id: Uuid) -> Result<bool> {
            Err(AdvisorError::Store("no such table".to_string()))
        }
        async fn nearest(&self, _embedding: &[f32], _k: usize) -> Result<Vec<ScoredRecord>> {
            Err(AdvisorError::Store("no such table".to_string()))
        }
        async fn count(&self) -> Result<usize> {
            Err(AdvisorError::Store("no such table".to_string()))
        }
    }

    #[tokio::test]
    async fn test_schema_failure_is_tolerated() {
        let list = WatchList::new(Arc::new(ReadOnlyStore), Arc::new(KeywordEmbedder::new(8)));
        // Does not panic or return an error
        list.ensure_schema().await;
        // Later operations report the problem
        assert!(list.summarize_lists(StatusGranularity::Coarse).await.is_err());
    }
}
