//! Tool definitions and implementations for the advisor.

use crate::config::StatusGranularity;
use crate::error::{AdvisorError, Result};
use crate::llm::ToolDefinition;
use crate::moviedb::MovieDbClient;
use crate::watchlist::{MovieRecord, WatchList, WatchStatus};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// How the user felt about a watched title.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Opinion {
    Liked,
    Disliked,
}

/// Tools the model can invoke.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "kebab-case")]
pub enum ToolCall {
    /// Put a title in the watched list.
    AddToWatched {
        title: String,
        #[serde(default)]
        comment: String,
        #[serde(default)]
        opinion: Option<Opinion>,
    },

    /// Put a title in the must-see list.
    AddToMustSee {
        title: String,
        #[serde(default)]
        comment: String,
    },

    /// Put a title in the not-interested list.
    AddToNotInterested {
        title: String,
        #[serde(default)]
        comment: String,
    },

    /// Drop a title from every list.
    RemoveFromLists { title: String },

    /// Similarity search over stored titles and comments.
    SearchPersonalHistory { query: String },

    /// Look a movie up in the external movie database.
    QueryExternalMovieDb { query: String },

    /// Current watch lists.
    GetAllWatchLists,
}

impl ToolCall {
    /// The registered tool name.
    pub fn name(&self) -> &'static str {
        match self {
            ToolCall::AddToWatched { .. } => "add-to-watched",
            ToolCall::AddToMustSee { .. } => "add-to-must-see",
            ToolCall::AddToNotInterested { .. } => "add-to-not-interested",
            ToolCall::RemoveFromLists { .. } => "remove-from-lists",
            ToolCall::SearchPersonalHistory { .. } => "search-personal-history",
            ToolCall::QueryExternalMovieDb { .. } => "query-external-movie-db",
            ToolCall::GetAllWatchLists => "get-all-watch-lists",
        }
    }
}

/// Parse a tool call from the model's name and JSON arguments.
pub fn parse_tool_call(name: &str, arguments: &str) -> Result<ToolCall> {
    // Some models send an empty string for parameterless tools
    let arguments = if arguments.trim().is_empty() { "{}" } else { arguments };
    let args: serde_json::Value = serde_json::from_str(arguments)
        .map_err(|e| AdvisorError::Agent(format!("Invalid tool arguments: {}", e)))?;

    let text = |key: &str| -> Result<String> {
        args[key]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| AdvisorError::Agent(format!("Missing '{}' argument", key)))
    };
    let comment = || args["comment"].as_str().unwrap_or_default().to_string();

    match name {
        "add-to-watched" => {
            let opinion = match args["opinion"].as_str() {
                None => None,
                Some("liked") => Some(Opinion::Liked),
                Some("disliked") => Some(Opinion::Disliked),
                Some(other) => {
                    return Err(AdvisorError::Agent(format!(
                        "Invalid opinion '{}', expected 'liked' or 'disliked'",
                        other
                    )))
                }
            };
            Ok(ToolCall::AddToWatched {
                title: text("title")?,
                comment: comment(),
                opinion,
            })
        }
        "add-to-must-see" => Ok(ToolCall::AddToMustSee {
            title: text("title")?,
            comment: comment(),
        }),
        "add-to-not-interested" => Ok(ToolCall::AddToNotInterested {
            title: text("title")?,
            comment: comment(),
        }),
        "remove-from-lists" => Ok(ToolCall::RemoveFromLists {
            title: text("title")?,
        }),
        "search-personal-history" => Ok(ToolCall::SearchPersonalHistory {
            query: text("query")?,
        }),
        "query-external-movie-db" => Ok(ToolCall::QueryExternalMovieDb {
            query: text("query")?,
        }),
        "get-all-watch-lists" => Ok(ToolCall::GetAllWatchLists),
        _ => Err(AdvisorError::Agent(format!("Unknown tool: {}", name))),
    }
}

fn title_schema(comment_hint: &str) -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "title": {
                "type": "string",
                "description": "The movie title"
            },
            "comment": {
                "type": "string",
                "description": comment_hint
            }
        },
        "required": ["title"]
    })
}

/// Ordered set of tools declared to the model.
///
/// Names and descriptions are what the model selects on, so the wording here
/// changes behavior.
#[derive(Debug, Clone)]
pub struct ToolRegistry {
    tools: Vec<ToolDefinition>,
}

impl ToolRegistry {
    /// Build the registry for a status granularity.
    ///
    /// With liked/disliked granularity `add-to-watched` requires an `opinion`.
    pub fn new(granularity: StatusGranularity) -> Self {
        let comment_hint = "Personal note about the movie, in English";

        let add_to_watched = match granularity {
            StatusGranularity::Coarse => ToolDefinition::new(
                "add-to-watched",
                "Add a movie to the watched list. Use this when the user says they have seen a movie. \
                 Moves the title out of any other list.",
                title_schema(comment_hint),
            ),
            StatusGranularity::LikedDisliked => {
                let mut schema = title_schema(comment_hint);
                schema["properties"]["opinion"] = serde_json::json!({
                    "type": "string",
                    "enum": ["liked", "disliked"],
                    "description": "Whether the user liked or disliked the movie"
                });
                schema["required"] = serde_json::json!(["title", "opinion"]);
                ToolDefinition::new(
                    "add-to-watched",
                    "Add a movie to the watched list, recording whether the user liked or disliked it. \
                     Use this when the user says they have seen a movie. Moves the title out of any other list.",
                    schema,
                )
            }
        };

        let tools = vec![
            add_to_watched,
            ToolDefinition::new(
                "add-to-must-see",
                "Add a movie to the must-see list. Use this when the user wants to watch a movie later. \
                 Moves the title out of any other list.",
                title_schema(comment_hint),
            ),
            ToolDefinition::new(
                "add-to-not-interested",
                "Add a movie to the not-interested list. Use this when the user does not want a movie \
                 recommended again. Moves the title out of any other list.",
                title_schema(comment_hint),
            ),
            ToolDefinition::new(
                "remove-from-lists",
                "Remove a movie from all lists. Use this when the user wants a title forgotten.",
                serde_json::json!({
                    "type": "object",
                    "properties": {
                        "title": {
                            "type": "string",
                            "description": "The movie title"
                        }
                    },
                    "required": ["title"]
                }),
            ),
            ToolDefinition::new(
                "search-personal-history",
                "Search the user's movie history and personal comments. Use this for questions about \
                 what the user thought of movies or what they like.",
                serde_json::json!({
                    "type": "object",
                    "properties": {
                        "query": {
                            "type": "string",
                            "description": "What to look for, e.g. 'movies with a great soundtrack'"
                        }
                    },
                    "required": ["query"]
                }),
            ),
            ToolDefinition::new(
                "query-external-movie-db",
                "Look up movies in an external movie database. Returns title, release date, rating and \
                 overview. Use this when you need facts about a movie.",
                serde_json::json!({
                    "type": "object",
                    "properties": {
                        "query": {
                            "type": "string",
                            "description": "Movie title or search text"
                        }
                    },
                    "required": ["query"]
                }),
            ),
            ToolDefinition::new(
                "get-all-watch-lists",
                "Get the user's current watch lists.",
                serde_json::json!({
                    "type": "object",
                    "properties": {}
                }),
            ),
        ];

        Self { tools }
    }

    /// Declarations in registration order.
    pub fn definitions(&self) -> &[ToolDefinition] {
        &self.tools
    }

    pub fn get(&self, name: &str) -> Option<&ToolDefinition> {
        self.tools.iter().find(|t| t.name == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tools.iter().map(|t| t.name.as_str())
    }
}

/// Everything the tools act on.
pub struct ToolContext {
    pub watch_list: Arc<WatchList>,
    pub moviedb: Option<Arc<MovieDbClient>>,
    pub granularity: StatusGranularity,
    /// Neighbours returned by `search-personal-history`.
    pub search_k: usize,
    /// Movie database results passed back to the model.
    pub max_results: usize,
}

impl ToolContext {
    pub fn new(watch_list: Arc<WatchList>, granularity: StatusGranularity) -> Self {
        Self {
            watch_list,
            moviedb: None,
            granularity,
            search_k: 3,
            max_results: 5,
        }
    }

    pub fn with_moviedb(mut self, client: Arc<MovieDbClient>) -> Self {
        self.moviedb = Some(client);
        self
    }

    pub fn with_search_k(mut self, k: usize) -> Self {
        self.search_k = k.max(1);
        self
    }

    pub fn with_max_results(mut self, max: usize) -> Self {
        self.max_results = max.max(1);
        self
    }

    /// Execute a tool call and return the result as a string.
    pub async fn execute(&self, tool: &ToolCall) -> Result<String> {
        match tool {
            ToolCall::AddToWatched {
                title,
                comment,
                opinion,
            } => {
                let status = self.watched_status(*opinion)?;
                self.add(title, status, comment).await
            }
            ToolCall::AddToMustSee { title, comment } => {
                self.add(title, WatchStatus::MustSee, comment).await
            }
            ToolCall::AddToNotInterested { title, comment } => {
                self.add(title, WatchStatus::NotInterested, comment).await
            }
            ToolCall::RemoveFromLists { title } => self.execute_remove(title).await,
            ToolCall::SearchPersonalHistory { query } => self.execute_search(query).await,
            ToolCall::QueryExternalMovieDb { query } => self.execute_moviedb(query).await,
            ToolCall::GetAllWatchLists => {
                let lists = self.watch_list.summarize_lists(self.granularity).await?;
                Ok(lists.to_json().to_string())
            }
        }
    }

    fn watched_status(&self, opinion: Option<Opinion>) -> Result<WatchStatus> {
        match (self.granularity, opinion) {
            (StatusGranularity::Coarse, _) => Ok(WatchStatus::Watched),
            (StatusGranularity::LikedDisliked, Some(Opinion::Liked)) => Ok(WatchStatus::WatchedLiked),
            (StatusGranularity::LikedDisliked, Some(Opinion::Disliked)) => {
                Ok(WatchStatus::WatchedDisliked)
            }
            (StatusGranularity::LikedDisliked, None) => Err(AdvisorError::InvalidInput(
                "'opinion' is required: use 'liked' or 'disliked'".to_string(),
            )),
        }
    }

    async fn add(&self, title: &str, status: WatchStatus, comment: &str) -> Result<String> {
        let record = self
            .watch_list
            .upsert_record(MovieRecord::new(title, status, comment))
            .await?;
        Ok(format!("Added '{}' to the {} list.", record.title, status.label()))
    }

    async fn execute_remove(&self, title: &str) -> Result<String> {
        if self.watch_list.delete_record(title).await? {
            Ok(format!("Removed '{}' from all lists.", title.trim()))
        } else {
            Ok(format!("'{}' was not in any list.", title.trim()))
        }
    }

    async fn execute_search(&self, query: &str) -> Result<String> {
        let results = self.watch_list.similarity_search(query, self.search_k).await?;
        if results.is_empty() {
            return Ok("No matching entries in the movie history.".to_string());
        }

        Ok(results
            .iter()
            .map(|content| format!("- {}", content))
            .collect::<Vec<_>>()
            .join("\n"))
    }

    async fn execute_moviedb(&self, query: &str) -> Result<String> {
        let client = self
            .moviedb
            .as_ref()
            .ok_or_else(|| AdvisorError::MovieDb("Movie database is not configured".to_string()))?;

        match client.search(query).await? {
            None => Ok("The movie database lookup failed; no results available.".to_string()),
            Some(results) if results.is_empty() => Ok(format!("No movies found for '{}'.", query)),
            Some(mut results) => {
                debug!("Movie database returned {} results", results.len());
                results.truncate(self.max_results);
                Ok(serde_json::to_string(&results)?)
            }
        }
    }
}
