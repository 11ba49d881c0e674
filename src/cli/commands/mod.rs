//! CLI command implementations.

mod chat;
mod config;
mod lists;
mod lookup;
mod search;

pub use chat::run_chat;
pub use config::run_config;
pub use lists::run_lists;
pub use lookup::run_lookup;
pub use search::run_search;
