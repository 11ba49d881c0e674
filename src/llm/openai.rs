//! OpenAI chat-completions implementation of [`ChatModel`].

use super::{ChatMessage, ChatModel, ModelReply, ToolDefinition, ToolInvocation};
use crate::config::OpenAiSettings;
use crate::error::{AdvisorError, Result};
use crate::openai::create_client;
use async_openai::types::{
    ChatCompletionMessageToolCall, ChatCompletionRequestAssistantMessageArgs,
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestToolMessageArgs, ChatCompletionRequestUserMessageArgs, ChatCompletionTool,
    ChatCompletionToolType, CreateChatCompletionRequestArgs, FunctionCall, FunctionObject,
};
use async_trait::async_trait;
use tracing::{debug, instrument};

/// Chat model backed by the OpenAI chat-completions API.
pub struct OpenAiChatModel {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
}

impl OpenAiChatModel {
    /// Create a chat model client.
    pub fn new(settings: &OpenAiSettings, model: &str) -> Result<Self> {
        Ok(Self {
            client: create_client(settings)?,
            model: model.to_string(),
        })
    }

    /// Name of the model requests are sent to.
    pub fn model(&self) -> &str {
        &self.model
    }
}

fn build_error(e: impl std::fmt::Display) -> AdvisorError {
    AdvisorError::Agent(e.to_string())
}

/// Convert a provider-neutral message into the request format.
fn to_request_message(message: &ChatMessage) -> Result<ChatCompletionRequestMessage> {
    let message = match message {
        ChatMessage::System { content } => ChatCompletionRequestSystemMessageArgs::default()
            .content(content.clone())
            .build()
            .map_err(build_error)?
            .into(),
        ChatMessage::User { content } => ChatCompletionRequestUserMessageArgs::default()
            .content(content.clone())
            .build()
            .map_err(build_error)?
            .into(),
        ChatMessage::Assistant { content, tool_calls } => {
            let mut args = ChatCompletionRequestAssistantMessageArgs::default();
            if let Some(content) = content {
                args.content(content.clone());
            }
            if !tool_calls.is_empty() {
                args.tool_calls(
                    tool_calls
                        .iter()
                        .map(|call| ChatCompletionMessageToolCall {
                            id: call.id.clone(),
                            r#type: ChatCompletionToolType::Function,
                            function: FunctionCall {
                                name: call.name.clone(),
                                arguments: call.arguments.clone(),
                            },
                        })
                        .collect::<Vec<_>>(),
                );
            }
            args.build().map_err(build_error)?.into()
        }
        ChatMessage::Tool {
            tool_call_id,
            content,
        } => ChatCompletionRequestToolMessageArgs::default()
            .tool_call_id(tool_call_id.clone())
            .content(content.clone())
            .build()
            .map_err(build_error)?
            .into(),
    };
    Ok(message)
}

fn to_tool(definition: &ToolDefinition) -> ChatCompletionTool {
    ChatCompletionTool {
        r#type: ChatCompletionToolType::Function,
        function: FunctionObject {
            name: definition.name.clone(),
            description: Some(definition.description.clone()),
            parameters: Some(definition.parameters.clone()),
            strict: None,
        },
    }
}

#[async_trait]
impl ChatModel for OpenAiChatModel {
    #[instrument(skip_all, fields(model = %self.model, messages = messages.len()))]
    async fn complete(&self, messages: &[ChatMessage], tools: &[ToolDefinition]) -> Result<ModelReply> {
        let messages = messages
            .iter()
            .map(to_request_message)
            .collect::<Result<Vec<_>>>()?;

        let mut args = CreateChatCompletionRequestArgs::default();
        args.model(&self.model).messages(messages);
        if !tools.is_empty() {
            args.tools(tools.iter().map(to_tool).collect::<Vec<_>>());
        }
        let request = args.build().map_err(build_error)?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| AdvisorError::OpenAI(format!("Chat API error: {}", e)))?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AdvisorError::Agent("No response from model".to_string()))?;

        match choice.message.tool_calls {
            Some(calls) if !calls.is_empty() => {
                debug!("Model requested {} tool call(s)", calls.len());
                Ok(ModelReply::ToolCalls(
                    calls
                        .into_iter()
                        .map(|call| ToolInvocation {
                            id: call.id,
                            name: call.function.name,
                            arguments: call.function.arguments,
                        })
                        .collect(),
                ))
            }
            _ => Ok(ModelReply::Answer(choice.message.content.unwrap_or_default())),
        }
    }
}
