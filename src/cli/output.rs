//! CLI output formatting utilities.

use crate::moviedb::MovieSearchResult;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

/// Output helper for CLI formatting.
pub struct Output;

impl Output {
    /// Print an info message.
    pub fn info(msg: &str) {
        println!("{} {}", style(">>").cyan().bold(), msg);
    }

    /// Print a success message.
    pub fn success(msg: &str) {
        println!("{} {}", style(">>").green().bold(), msg);
    }

    /// Print a warning message.
    pub fn warning(msg: &str) {
        eprintln!("{} {}", style(">>").yellow().bold(), msg);
    }

    /// Print an error message.
    pub fn error(msg: &str) {
        eprintln!("{} {}", style(">>").red().bold(), msg);
    }

    /// Print a header.
    pub fn header(msg: &str) {
        println!("\n{}", style(msg).bold().underlined());
    }

    /// Print a key-value pair.
    pub fn kv(key: &str, value: &str) {
        println!("  {}: {}", style(key).dim(), value);
    }

    /// Print a list item.
    pub fn list_item(msg: &str) {
        println!("  {} {}", style("*").cyan(), msg);
    }

    /// Print a movie database result.
    pub fn movie_result(movie: &MovieSearchResult) {
        let year = movie
            .release_date
            .as_deref()
            .and_then(|d| d.get(..4))
            .filter(|y| !y.is_empty())
            .unwrap_or("n/a");
        let rating = movie
            .vote_average
            .map(|v| format!("{:.1}", v))
            .unwrap_or_else(|| "-".to_string());

        println!(
            "\n{} {} ({}) {}",
            style(">>").green(),
            style(&movie.title).bold(),
            year,
            style(format!("rating {}", rating)).dim()
        );
        if let Some(overview) = movie.overview.as_deref().filter(|o| !o.is_empty()) {
            println!("   {}", content_preview(overview, 200));
        }
    }

    /// Create a spinner.
    pub fn spinner(msg: &str) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        if let Ok(spinner_style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
            pb.set_style(spinner_style);
        }
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        pb
    }
}

/// Truncate content with ellipsis.
fn content_preview(content: &str, max_chars: usize) -> String {
    let content = content.replace('\n', " ");
    if content.chars().count() <= max_chars {
        content
    } else {
        format!("{}...", content.chars().take(max_chars).collect::<String>())
    }
}
