//! Provider-neutral chat model interface.
//!
//! The advisor talks to the hosted model through [`ChatModel`]: it sends the
//! turn context plus the declared tools, and gets back either a final answer or
//! the tool invocations the model wants run before it answers.

mod openai;

pub use openai::OpenAiChatModel;

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A tool the model may ask to invoke.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolDefinition {
    /// Name the model uses to select the tool.
    pub name: String,
    /// Natural-language guidance for the model.
    pub description: String,
    /// JSON Schema of the arguments object.
    pub parameters: serde_json::Value,
}

impl ToolDefinition {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: serde_json::Value,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }
}

/// A structured request from the model to run a tool.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolInvocation {
    /// Provider-assigned id, echoed back with the result.
    pub id: String,
    pub name: String,
    /// Raw JSON arguments.
    pub arguments: String,
}

/// One message of the turn context.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum ChatMessage {
    System { content: String },
    User { content: String },
    Assistant {
        content: Option<String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        tool_calls: Vec<ToolInvocation>,
    },
    Tool { tool_call_id: String, content: String },
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        ChatMessage::System {
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        ChatMessage::User {
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        ChatMessage::Assistant {
            content: Some(content.into()),
            tool_calls: Vec::new(),
        }
    }

    pub fn assistant_tool_calls(tool_calls: Vec<ToolInvocation>) -> Self {
        ChatMessage::Assistant {
            content: None,
            tool_calls,
        }
    }

    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        ChatMessage::Tool {
            tool_call_id: tool_call_id.into(),
            content: content.into(),
        }
    }
}

/// What the model produced for a request.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelReply {
    /// The final natural-language answer for the turn.
    Answer(String),
    /// Tools to run, in order, before asking again.
    ToolCalls(Vec<ToolInvocation>),
}

/// A hosted chat model with tool calling.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Send the context and tool declarations, return the model's reply.
    async fn complete(&self, messages: &[ChatMessage], tools: &[ToolDefinition]) -> Result<ModelReply>;
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted model for driving the advisor in tests.

    use super::*;
    use crate::error::AdvisorError;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays canned replies and records every request it receives.
    pub struct ScriptedModel {
        replies: Mutex<VecDeque<Result<ModelReply>>>,
        pub requests: Mutex<Vec<Vec<ChatMessage>>>,
    }

    impl ScriptedModel {
        pub fn new(replies: Vec<Result<ModelReply>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                requests: Mutex::new(Vec::new()),
            }
        }

        pub fn request_count(&self) -> usize {
            self.requests.lock().unwrap().len()
        }

        pub fn request(&self, i: usize) -> Vec<ChatMessage> {
            self.requests.lock().unwrap()[i].clone()
        }
    }

    /// Shorthand for a single tool invocation reply.
    pub fn call(id: &str, name: &str, arguments: serde_json::Value) -> ToolInvocation {
        ToolInvocation {
            id: id.to_string(),
            name: name.to_string(),
            arguments: arguments.to_string(),
        }
    }

    #[async_trait]
    impl ChatModel for ScriptedModel {
        async fn complete(&self, messages: &[ChatMessage], _tools: &[ToolDefinition]) -> Result<ModelReply> {
            self.requests.lock().unwrap().push(messages.to_vec());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(AdvisorError::OpenAI("script exhausted".to_string())))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_serialization() {
        let json = serde_json::to_value(ChatMessage::tool_result("call_1", "done")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"role": "tool", "tool_call_id": "call_1", "content": "done"})
        );

        let json = serde_json::to_value(ChatMessage::assistant("hi")).unwrap();
        assert_eq!(json, serde_json::json!({"role": "assistant", "content": "hi"}));
    }
}
