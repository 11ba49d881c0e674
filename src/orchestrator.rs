//! Component wiring for the movie advisor.
//!
//! Builds the store, embedder, watch list and movie database client from
//! [`Settings`], and hands out advisors bound to them.

use crate::agent::{Advisor, AdvisorOptions, ToolContext};
use crate::config::{Prompts, Settings};
use crate::embedding::{Embedder, OpenAIEmbedder};
use crate::error::{AdvisorError, Result};
use crate::llm::ChatModel;
use crate::moviedb::MovieDbClient;
use crate::watchlist::{MemoryRecordStore, RecordStore, SqliteRecordStore, WatchList};
use std::sync::Arc;
use tracing::{info, instrument};

/// Open the record store named by `store.provider`.
pub fn open_store(settings: &Settings) -> Result<Arc<dyn RecordStore>> {
    match settings.store.provider.to_lowercase().as_str() {
        "sqlite" => {
            let path = settings.sqlite_path();
            Ok(Arc::new(SqliteRecordStore::new(&path, &settings.store.table_name)?))
        }
        "memory" => {
            info!("Using in-memory watch-list store; nothing will be persisted");
            Ok(Arc::new(MemoryRecordStore::new()))
        }
        other => Err(AdvisorError::Config(format!(
            "Unknown store provider '{}' (expected 'sqlite' or 'memory')",
            other
        ))),
    }
}

/// The advisor's long-lived components.
pub struct Orchestrator {
    settings: Settings,
    prompts: Prompts,
    watch_list: Arc<WatchList>,
    moviedb: Option<Arc<MovieDbClient>>,
}

impl Orchestrator {
    /// Create an orchestrator from configuration.
    ///
    /// The movie database client is only created when a key is available.
    pub fn new(settings: Settings) -> Result<Self> {
        let prompts = Prompts::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )?;

        let embedder: Arc<dyn Embedder> = Arc::new(OpenAIEmbedder::with_config(
            &settings.openai,
            &settings.embedding.model,
            settings.embedding.dimensions as usize,
        )?);
        let store = open_store(&settings)?;

        let moviedb = match settings.moviedb.resolve_api_key() {
            Some(_) => Some(Arc::new(MovieDbClient::from_settings(&settings.moviedb)?)),
            None => {
                info!("No movie database key configured; lookups are disabled");
                None
            }
        };

        let mut orchestrator = Self::with_components(settings, prompts, store, embedder);
        orchestrator.moviedb = moviedb;
        Ok(orchestrator)
    }

    /// Create an orchestrator with custom components.
    pub fn with_components(
        settings: Settings,
        prompts: Prompts,
        store: Arc<dyn RecordStore>,
        embedder: Arc<dyn Embedder>,
    ) -> Self {
        let watch_list =
            Arc::new(WatchList::new(store, embedder).with_page_size(settings.store.page_size));

        Self {
            settings,
            prompts,
            watch_list,
            moviedb: None,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn watch_list(&self) -> Arc<WatchList> {
        self.watch_list.clone()
    }

    pub fn moviedb(&self) -> Option<Arc<MovieDbClient>> {
        self.moviedb.clone()
    }

    /// Bootstrap the watch-list table. Never fails; problems are logged.
    #[instrument(skip(self))]
    pub async fn prepare(&self) {
        self.watch_list.ensure_schema().await;
    }

    /// Tool context over this orchestrator's components.
    pub fn tool_context(&self) -> ToolContext {
        let mut tools = ToolContext::new(self.watch_list.clone(), self.settings.chat.status_granularity)
            .with_search_k(self.settings.store.search_k)
            .with_max_results(self.settings.moviedb.max_results);
        if let Some(client) = &self.moviedb {
            tools = tools.with_moviedb(client.clone());
        }
        tools
    }

    /// Create an advisor that talks to `model`.
    pub fn advisor(&self, model: Arc<dyn ChatModel>) -> Advisor {
        Advisor::new(
            model,
            self.tool_context(),
            self.prompts.clone(),
            AdvisorOptions::from(&self.settings.chat),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StatusGranularity;
    use crate::embedding::testing::KeywordEmbedder;
    use crate::llm::testing::{call, ScriptedModel};
    use crate::llm::ModelReply;
    use crate::watchlist::WatchStatus;

    fn memory_settings() -> Settings {
        let mut settings = Settings::default();
        settings.store.provider = "memory".to_string();
        settings
    }

    #[test]
    fn test_open_store_providers() {
        assert!(open_store(&memory_settings()).is_ok());

        let dir = tempfile::tempdir().unwrap();
        let mut settings = Settings::default();
        settings.store.sqlite_path = dir.path().join("lists.db").to_string_lossy().to_string();
        assert!(open_store(&settings).is_ok());
        assert!(dir.path().join("lists.db").exists());

        settings.store.provider = "postgres".to_string();
        assert!(matches!(open_store(&settings), Err(AdvisorError::Config(_))));
    }

    #[tokio::test]
    async fn test_advisor_follows_settings() {
        let mut settings = memory_settings();
        settings.chat.status_granularity = StatusGranularity::LikedDisliked;
        settings.chat.user_name = "Sam".to_string();

        let store = open_store(&settings).unwrap();
        let orchestrator = Orchestrator::with_components(
            settings,
            Prompts::default(),
            store,
            Arc::new(KeywordEmbedder::new(16)),
        );
        orchestrator.prepare().await;
        assert!(orchestrator.moviedb().is_none());

        let model = Arc::new(ScriptedModel::new(vec![
            Ok(ModelReply::ToolCalls(vec![call(
                "c1",
                "add-to-watched",
                serde_json::json!({"title": "Heat", "opinion": "liked"}),
            )])),
            Ok(ModelReply::Answer("Noted.".to_string())),
        ]));
        let mut advisor = orchestrator.advisor(model);
        assert_eq!(advisor.options().user_name, "Sam");

        advisor.respond("Heat was great").await.unwrap();
        let lists = orchestrator
            .watch_list()
            .summarize_lists(StatusGranularity::LikedDisliked)
            .await
            .unwrap();
        assert_eq!(lists.titles(WatchStatus::WatchedLiked), ["Heat"]);
    }
}
