//! Movie metadata lookup against a TMDB-compatible search API.

use crate::config::MovieDbSettings;
use crate::error::{AdvisorError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// One entry of the search endpoint's `results` array.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MovieSearchResult {
    #[serde(default)]
    pub id: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub original_title: Option<String>,
    #[serde(default)]
    pub original_language: Option<String>,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub vote_average: Option<f64>,
    #[serde(default)]
    pub genre_ids: Vec<u64>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<MovieSearchResult>,
}

/// Client for the movie search endpoint.
pub struct MovieDbClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    include_adult: bool,
}

impl MovieDbClient {
    /// Create a client from settings. Fails when no API key is configured.
    pub fn from_settings(settings: &MovieDbSettings) -> Result<Self> {
        let api_key = settings.resolve_api_key().ok_or_else(|| {
            AdvisorError::Config(
                "No movie database key. Set moviedb.api_key or export TMDB_BEARER_TOKEN".to_string(),
            )
        })?;

        Self::new(
            &settings.base_url,
            &api_key,
            settings.include_adult,
            Duration::from_secs(settings.timeout_seconds),
        )
    }

    /// Create a client for an explicit endpoint.
    pub fn new(base_url: &str, api_key: &str, include_adult: bool, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AdvisorError::MovieDb(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            include_adult,
        })
    }

    /// Search movies by free-text query.
    ///
    /// Returns `Ok(None)` when the service answers with anything but 200;
    /// transport failures are returned as errors.
    #[instrument(skip(self))]
    pub async fn search(&self, query: &str) -> Result<Option<Vec<MovieSearchResult>>> {
        let url = format!("{}/search/movie", self.base_url);

        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.api_key)
            .query(&[
                ("query", query),
                ("include_adult", if self.include_adult { "true" } else { "false" }),
            ])
            .send()
            .await?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            warn!("Movie database search for '{}' failed with status {}", query, status);
            return Ok(None);
        }

        let body: SearchResponse = response.json().await?;
        debug!("Movie database returned {} results", body.results.len());
        Ok(Some(body.results))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> MovieDbClient {
        MovieDbClient::new(&server.uri(), "test-token", false, Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_search_returns_results() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/search/movie"))
            .and(query_param("query", "Inception"))
            .and(query_param("include_adult", "false"))
            .and(header("authorization", "Bearer test-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "page": 1,
                "results": [{
                    "id": 27205,
                    "title": "Inception",
                    "original_title": "Inception",
                    "overview": "Cobb, a skilled thief...",
                    "release_date": "2010-07-15",
                    "vote_average": 8.4,
                    "genre_ids": [28, 878, 12],
                    "popularity": 83.9
                }],
                "total_results": 1
            })))
            .expect(1)
            .mount(&server)
            .await;

        let results = client(&server).search("Inception").await.unwrap().unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, 27205);
        assert_eq!(results[0].release_date.as_deref(), Some("2010-07-15"));
        assert_eq!(results[0].genre_ids, vec![28, 878, 12]);
    }

    #[tokio::test]
    async fn test_not_found_yields_no_results() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/search/movie"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "status_message": "The resource you requested could not be found."
            })))
            .mount(&server)
            .await;

        let result = client(&server).search("Some query").await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_unauthorized_yields_no_results() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        assert!(client(&server).search("Heat").await.unwrap().is_none());
    }

    #[test]
    fn test_missing_key_is_a_config_error() {
        let settings = MovieDbSettings {
            api_key: Some(String::new()),
            ..Default::default()
        };
        // Only meaningful when the fallback variable is not set in the environment
        if std::env::var("TMDB_BEARER_TOKEN").is_err() {
            assert!(matches!(
                MovieDbClient::from_settings(&settings),
                Err(AdvisorError::Config(_))
            ));
        }
    }
}
