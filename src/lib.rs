//! Movie Advisor - a conversational movie assistant that keeps your watch lists
//!
//! A chat loop in front of a hosted LLM with tool calling. The model
//! recommends movies and, through declared tools, keeps the user's movie
//! history up to date: what was watched, what is a must-see and what the user
//! is not interested in.
//!
//! # Architecture
//!
//! - `config` - Settings and prompt templates
//! - `watchlist` - Movie records, storage backends and the watch-list service
//! - `embedding` - Embedding generation for similarity search
//! - `moviedb` - External movie metadata lookup
//! - `llm` - Chat model interface and the hosted implementation
//! - `agent` - Tool registry, advisor turns and the chat loop
//! - `orchestrator` - Component wiring from settings
//!
//! # Example
//!
//! ```rust,no_run
//! use movie_advisor::config::Settings;
//! use movie_advisor::llm::OpenAiChatModel;
//! use movie_advisor::orchestrator::Orchestrator;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let orchestrator = Orchestrator::new(settings.clone())?;
//!     orchestrator.prepare().await;
//!
//!     let model = Arc::new(OpenAiChatModel::new(&settings.openai, &settings.chat.model)?);
//!     let mut advisor = orchestrator.advisor(model);
//!
//!     let response = advisor.respond("I just watched Heat and loved it").await?;
//!     println!("{}", response.content);
//!
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod cli;
pub mod config;
pub mod embedding;
pub mod error;
pub mod llm;
pub mod moviedb;
pub mod openai;
pub mod orchestrator;
pub mod watchlist;

pub use error::{AdvisorError, Result};
