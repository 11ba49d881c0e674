//! Movie advisor agent.
//!
//! The advisor forwards each user message to a [`ChatModel`](crate::llm::ChatModel)
//! together with the current watch lists, runs the tools the model asks for
//! against the [`WatchList`](crate::watchlist::WatchList), and returns the final answer.
//! [`ChatLoop`] wraps it in an interactive read-answer loop.

mod chat;
mod runner;
mod tools;

pub use chat::{ChatLoop, LoopState};
pub use runner::{Advisor, AdvisorOptions, AdvisorResponse, ToolCallRecord};
pub use tools::{parse_tool_call, Opinion, ToolCall, ToolContext, ToolRegistry};
