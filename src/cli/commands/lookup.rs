//! Lookup command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::moviedb::MovieDbClient;
use anyhow::Result;

/// Run the lookup command.
pub async fn run_lookup(query: &str, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Lookup, &settings) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let client = MovieDbClient::from_settings(&settings.moviedb)?;

    let spinner = Output::spinner("Looking up...");
    let results = client.search(query).await;
    spinner.finish_and_clear();

    match results {
        Ok(None) => {
            Output::warning("The movie database did not answer the lookup. Run with -v for details.");
        }
        Ok(Some(movies)) if movies.is_empty() => {
            Output::warning(&format!("No movies found for '{}'.", query));
        }
        Ok(Some(movies)) => {
            Output::success(&format!("Found {} movies", movies.len()));
            for movie in movies.iter().take(settings.moviedb.max_results.max(1)) {
                Output::movie_result(movie);
            }
        }
        Err(e) => {
            Output::error(&format!("Lookup failed: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
