//! OpenAI client configuration with sensible defaults.

use crate::config::OpenAiSettings;
use crate::error::{AdvisorError, Result};
use async_openai::{config::OpenAIConfig, Client};
use std::time::Duration;

/// Create an OpenAI client from settings.
///
/// The API key comes from `$OPENAI_API_KEY`. Every request is bounded by
/// `timeout_seconds`.
pub fn create_client(settings: &OpenAiSettings) -> Result<Client<OpenAIConfig>> {
    let mut config = OpenAIConfig::default();
    if let Some(base) = settings.api_base.as_deref().filter(|b| !b.is_empty()) {
        config = config.with_api_base(base);
    }
    create_client_with_timeout(config, Duration::from_secs(settings.timeout_seconds))
}

/// Create an OpenAI client with a custom configuration and timeout.
pub fn create_client_with_timeout(
    config: OpenAIConfig,
    timeout: Duration,
) -> Result<Client<OpenAIConfig>> {
    let http_client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| AdvisorError::Config(format!("Failed to create HTTP client: {}", e)))?;

    Ok(Client::with_config(config).with_http_client(http_client))
}
