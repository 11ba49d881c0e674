//! Configuration settings for the movie advisor.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub openai: OpenAiSettings,
    pub chat: ChatSettings,
    pub embedding: EmbeddingSettings,
    pub store: StoreSettings,
    pub moviedb: MovieDbSettings,
    pub prompts: PromptSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory for storing application data.
    pub data_dir: String,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
    /// Write logs to this file instead of stderr.
    pub log_file: Option<String>,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            data_dir: "~/.movie-advisor".to_string(),
            log_level: "warn".to_string(),
            log_file: None,
        }
    }
}

/// Hosted model client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAiSettings {
    /// Alternative API base URL (OpenAI-compatible servers).
    pub api_base: Option<String>,
    /// Timeout applied to every outbound model and embedding call.
    pub timeout_seconds: u64,
}

impl Default for OpenAiSettings {
    fn default() -> Self {
        Self {
            api_base: None,
            timeout_seconds: 120,
        }
    }
}

/// Where the watch-list summary goes in the turn context.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SummaryInjection {
    /// Appended to the user message.
    #[default]
    Inline,
    /// Sent as its own labeled system message before the history.
    SeparateContext,
}

impl std::str::FromStr for SummaryInjection {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "inline" => Ok(SummaryInjection::Inline),
            "separate_context" | "separate" => Ok(SummaryInjection::SeparateContext),
            _ => Err(format!("Unknown summary injection mode: {}", s)),
        }
    }
}

impl std::fmt::Display for SummaryInjection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SummaryInjection::Inline => write!(f, "inline"),
            SummaryInjection::SeparateContext => write!(f, "separate_context"),
        }
    }
}

/// How finely the "watched" list is split.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StatusGranularity {
    /// watched / must_see / not_interested.
    #[default]
    Coarse,
    /// watched_liked / watched_disliked / must_see / not_interested.
    LikedDisliked,
}

impl std::str::FromStr for StatusGranularity {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "coarse" => Ok(StatusGranularity::Coarse),
            "liked_disliked" | "fine" => Ok(StatusGranularity::LikedDisliked),
            _ => Err(format!("Unknown status granularity: {}", s)),
        }
    }
}

impl std::fmt::Display for StatusGranularity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StatusGranularity::Coarse => write!(f, "coarse"),
            StatusGranularity::LikedDisliked => write!(f, "liked_disliked"),
        }
    }
}

/// Chat loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatSettings {
    /// LLM model for the advisor.
    pub model: String,
    /// Name shown in the input prompt.
    pub user_name: String,
    /// Name the assistant answers with.
    pub assistant_name: String,
    /// Language the assistant answers in (e.g. "fr-FR"). None = follow the user.
    pub language: Option<String>,
    pub summary_injection: SummaryInjection,
    pub status_granularity: StatusGranularity,
    /// Number of past turns kept in the conversation history.
    pub max_history_turns: usize,
    /// Maximum model calls per turn.
    pub max_tool_iterations: usize,
    /// Echo tool names as they are dispatched.
    pub show_tool_calls: bool,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            user_name: "Alex".to_string(),
            assistant_name: "Marylin".to_string(),
            language: None,
            summary_injection: SummaryInjection::Inline,
            status_granularity: StatusGranularity::Coarse,
            max_history_turns: 15,
            max_tool_iterations: 10,
            show_tool_calls: true,
        }
    }
}

/// Embedding generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    /// Embedding model to use.
    pub model: String,
    /// Embedding dimensions.
    pub dimensions: u32,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            model: "text-embedding-3-small".to_string(),
            dimensions: 1536,
        }
    }
}

/// Watch-list store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    /// Store provider (sqlite, memory).
    pub provider: String,
    /// Path to SQLite database (for sqlite provider).
    pub sqlite_path: String,
    /// Table holding the movie records.
    pub table_name: String,
    /// Maximum records returned by a single listing.
    pub page_size: usize,
    /// Number of entries returned by personal-history search.
    pub search_k: usize,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            provider: "sqlite".to_string(),
            sqlite_path: "~/.movie-advisor/watchlist.db".to_string(),
            table_name: "movie_history".to_string(),
            page_size: 1000,
            search_k: 3,
        }
    }
}

/// Movie metadata API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MovieDbSettings {
    /// API root; the search endpoint is `{base_url}/search/movie`.
    pub base_url: String,
    /// API read token. Falls back to $TMDB_BEARER_TOKEN.
    pub api_key: Option<String>,
    pub include_adult: bool,
    /// Results handed back to the model per lookup.
    pub max_results: usize,
    pub timeout_seconds: u64,
}

impl Default for MovieDbSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.themoviedb.org/3".to_string(),
            api_key: None,
            include_adult: false,
            max_results: 5,
            timeout_seconds: 30,
        }
    }
}

impl MovieDbSettings {
    /// Configured key, or the value of $TMDB_BEARER_TOKEN.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|k| !k.is_empty())
            .or_else(|| std::env::var("TMDB_BEARER_TOKEN").ok())
            .filter(|k| !k.is_empty())
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct PromptSettings {
    /// Directory for custom prompts (overrides defaults).
    pub custom_dir: Option<String>,
    /// Custom variables available in all prompts as {{variable_name}}.
    pub variables: std::collections::HashMap<String, String>,
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::AdvisorError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("movie-advisor")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded data directory path.
    pub fn data_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.data_dir)
    }

    /// Get the expanded SQLite database path.
    pub fn sqlite_path(&self) -> PathBuf {
        Self::expand_path(&self.store.sqlite_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_keeps_defaults() {
        let settings: Settings = toml::from_str(
            r#"
            [chat]
            model = "gpt-4o"
            status_granularity = "liked_disliked"

            [store]
            provider = "memory"
            "#,
        )
        .unwrap();

        assert_eq!(settings.chat.model, "gpt-4o");
        assert_eq!(settings.chat.status_granularity, StatusGranularity::LikedDisliked);
        assert_eq!(settings.chat.summary_injection, SummaryInjection::Inline);
        assert_eq!(settings.store.provider, "memory");
        assert_eq!(settings.store.page_size, 1000);
        assert_eq!(settings.embedding.dimensions, 1536);
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!(
            "separate-context".parse::<SummaryInjection>().unwrap(),
            SummaryInjection::SeparateContext
        );
        assert_eq!(
            "liked-disliked".parse::<StatusGranularity>().unwrap(),
            StatusGranularity::LikedDisliked
        );
        assert!("sideways".parse::<StatusGranularity>().is_err());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut settings = Settings::default();
        settings.chat.assistant_name = "Hal".to_string();
        settings.save_to(&path).unwrap();

        let loaded = Settings::load_from(Some(&path)).unwrap();
        assert_eq!(loaded.chat.assistant_name, "Hal");
    }

    #[test]
    fn test_configured_api_key_wins() {
        let settings = MovieDbSettings {
            api_key: Some("from-config".to_string()),
            ..Default::default()
        };
        assert_eq!(settings.resolve_api_key().as_deref(), Some("from-config"));
    }
}
