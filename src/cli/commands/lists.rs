//! Lists command implementation.

use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;

/// Run the lists command.
pub async fn run_lists(json: bool, settings: Settings) -> Result<()> {
    let granularity = settings.chat.status_granularity;
    // Listing never embeds, so no API key is needed
    let orchestrator = Orchestrator::new(settings)?;
    orchestrator.prepare().await;

    let lists = match orchestrator.watch_list().summarize_lists(granularity).await {
        Ok(lists) => lists,
        Err(e) => {
            Output::error(&format!("Failed to load watch lists: {}", e));
            return Err(e.into());
        }
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&lists.to_json())?);
        return Ok(());
    }

    if lists.is_empty() {
        Output::info("Your watch lists are empty. Start a chat to add movies.");
        return Ok(());
    }

    for bucket in &lists.buckets {
        Output::header(&format!("{} ({})", bucket.status.label(), bucket.titles.len()));
        for title in &bucket.titles {
            Output::list_item(title);
        }
    }

    println!();
    Output::kv("Total titles", &lists.len().to_string());
    if lists.truncated {
        Output::warning("The history is longer than shown; some titles are missing.");
    }

    Ok(())
}
