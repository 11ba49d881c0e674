//! Pre-flight checks before talking to hosted services.
//!
//! Validates that required keys are available before starting operations
//! that would otherwise fail on the first request.

use crate::config::Settings;
use crate::error::{AdvisorError, Result};

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Chat needs the model API key.
    Chat,
    /// Search embeds the query, so it needs the API key too.
    Search,
    /// Lookup needs a movie database key.
    Lookup,
}

/// Run pre-flight checks for the given operation.
///
/// Returns Ok(()) if all checks pass, or an error describing what's missing.
pub fn check(operation: Operation, settings: &Settings) -> Result<()> {
    match operation {
        Operation::Chat | Operation::Search => check_api_key(),
        Operation::Lookup => check_moviedb_key(settings),
    }
}

/// Check if OpenAI API key is configured.
fn check_api_key() -> Result<()> {
    match std::env::var("OPENAI_API_KEY") {
        Ok(key) if !key.is_empty() => Ok(()),
        Ok(_) => Err(AdvisorError::Config(
            "OPENAI_API_KEY is empty. Set it with: export OPENAI_API_KEY='sk-...'".to_string(),
        )),
        Err(_) => Err(AdvisorError::Config(
            "OPENAI_API_KEY not set. Set it with: export OPENAI_API_KEY='sk-...'".to_string(),
        )),
    }
}

/// Check if a movie database key is configured.
fn check_moviedb_key(settings: &Settings) -> Result<()> {
    match settings.moviedb.resolve_api_key() {
        Some(_) => Ok(()),
        None => Err(AdvisorError::Config(
            "No movie database key. Set moviedb.api_key in the config or export TMDB_BEARER_TOKEN"
                .to_string(),
        )),
    }
}
