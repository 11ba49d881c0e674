//! Search command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;

/// Run the search command.
pub async fn run_search(query: &str, limit: Option<usize>, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Search, &settings) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let k = limit.unwrap_or(settings.store.search_k).max(1);
    let orchestrator = Orchestrator::new(settings)?;
    orchestrator.prepare().await;

    let spinner = Output::spinner("Searching...");
    let results = orchestrator.watch_list().similarity_search(query, k).await;
    spinner.finish_and_clear();

    match results {
        Ok(entries) if entries.is_empty() => {
            Output::warning("No entries in your movie history match the query.");
        }
        Ok(entries) => {
            Output::success(&format!("Found {} entries", entries.len()));
            for entry in &entries {
                Output::list_item(entry);
            }
        }
        Err(e) => {
            Output::error(&format!("Search failed: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
