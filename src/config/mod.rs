//! Configuration module for the movie advisor.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{AdvisorPrompts, ExampleMessage, ExampleRole, Prompts};
pub use settings::{
    ChatSettings, EmbeddingSettings, GeneralSettings, MovieDbSettings, OpenAiSettings,
    PromptSettings, Settings, StatusGranularity, StoreSettings, SummaryInjection,
};
