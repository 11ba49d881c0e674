//! CLI module for the movie advisor.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use crate::config::{Settings, StatusGranularity, SummaryInjection};
use clap::{Parser, Subcommand};

/// Movie Advisor - chat about movies and keep your watch lists
///
/// An assistant that recommends movies and keeps track of what you watched,
/// want to see, or never want suggested again.
#[derive(Parser, Debug)]
#[command(name = "movie-advisor")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// LLM model to chat with
    #[arg(short, long, global = true)]
    pub model: Option<String>,

    /// Language the assistant answers in (e.g. "fr-FR")
    #[arg(short, long, global = true)]
    pub language: Option<String>,

    /// Where the watch lists go in the prompt (inline, separate-context)
    #[arg(long, global = true)]
    pub summary_injection: Option<SummaryInjection>,

    /// Watched list granularity (coarse, liked-disliked)
    #[arg(long, global = true)]
    pub granularity: Option<StatusGranularity>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// Apply command-line overrides on top of loaded settings.
    pub fn apply_overrides(&self, settings: &mut Settings) {
        if let Some(model) = &self.model {
            settings.chat.model = model.clone();
        }
        if let Some(language) = &self.language {
            settings.chat.language = Some(language.clone());
        }
        if let Some(mode) = self.summary_injection {
            settings.chat.summary_injection = mode;
        }
        if let Some(granularity) = self.granularity {
            settings.chat.status_granularity = granularity;
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start an interactive chat session (default)
    Chat,

    /// Show the current watch lists
    Lists {
        /// Print the lists as JSON
        #[arg(long)]
        json: bool,
    },

    /// Search your movie history and comments
    Search {
        /// Search query
        query: String,

        /// Maximum number of results
        #[arg(short = 'k', long)]
        limit: Option<usize>,
    },

    /// Look a movie up in the movie database
    Lookup {
        /// Title or search text
        query: String,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_is_default() {
        let cli = Cli::try_parse_from(["movie-advisor"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_overrides() {
        let cli = Cli::try_parse_from([
            "movie-advisor",
            "--model",
            "gpt-4o",
            "--language",
            "fr-FR",
            "--summary-injection",
            "separate-context",
            "--granularity",
            "liked-disliked",
            "chat",
        ])
        .unwrap();

        let mut settings = Settings::default();
        cli.apply_overrides(&mut settings);
        assert_eq!(settings.chat.model, "gpt-4o");
        assert_eq!(settings.chat.language.as_deref(), Some("fr-FR"));
        assert_eq!(settings.chat.summary_injection, SummaryInjection::SeparateContext);
        assert_eq!(settings.chat.status_granularity, StatusGranularity::LikedDisliked);
    }

    #[test]
    fn test_search_args() {
        let cli = Cli::try_parse_from(["movie-advisor", "search", "heist movies", "-k", "5"]).unwrap();
        match cli.command {
            Some(Commands::Search { query, limit }) => {
                assert_eq!(query, "heist movies");
                assert_eq!(limit, Some(5));
            }
            other => panic!("Expected search command, got {:?}", other),
        }
    }

    #[test]
    fn test_bad_mode_rejected() {
        assert!(Cli::try_parse_from(["movie-advisor", "--granularity", "extreme"]).is_err());
    }
}
