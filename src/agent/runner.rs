//! Advisor turn runner with tool calling loop.

use super::tools::{parse_tool_call, ToolContext, ToolRegistry};
use crate::config::{ChatSettings, ExampleRole, Prompts, StatusGranularity, SummaryInjection};
use crate::error::{AdvisorError, Result};
use crate::llm::{ChatMessage, ChatModel, ModelReply, ToolInvocation};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Shown to the model when the lists cannot be read for a turn.
const LISTS_UNAVAILABLE: &str = "The movie history could not be loaded right now.";

/// Per-session advisor behavior.
#[derive(Debug, Clone)]
pub struct AdvisorOptions {
    pub user_name: String,
    pub assistant_name: String,
    pub language: Option<String>,
    pub summary_injection: SummaryInjection,
    pub granularity: StatusGranularity,
    /// Most recent turns kept as conversation history.
    pub max_history_turns: usize,
    /// Model calls allowed per turn.
    pub max_tool_iterations: usize,
}

impl From<&ChatSettings> for AdvisorOptions {
    fn from(chat: &ChatSettings) -> Self {
        Self {
            user_name: chat.user_name.clone(),
            assistant_name: chat.assistant_name.clone(),
            language: chat.language.clone().filter(|l| !l.trim().is_empty()),
            summary_injection: chat.summary_injection,
            granularity: chat.status_granularity,
            max_history_turns: chat.max_history_turns,
            max_tool_iterations: chat.max_tool_iterations.max(1),
        }
    }
}

impl Default for AdvisorOptions {
    fn default() -> Self {
        Self::from(&ChatSettings::default())
    }
}

/// One completed exchange kept in the history.
#[derive(Debug, Clone, PartialEq)]
struct HistoryTurn {
    user: String,
    assistant: String,
}

/// Movie advisor: builds the turn context, runs the model and dispatches its tool calls.
pub struct Advisor {
    model: Arc<dyn ChatModel>,
    registry: ToolRegistry,
    tools: ToolContext,
    prompts: Prompts,
    options: AdvisorOptions,
    history: VecDeque<HistoryTurn>,
}

impl Advisor {
    /// Create an advisor.
    ///
    /// The tool context's granularity overrides `options.granularity`.
    pub fn new(model: Arc<dyn ChatModel>, tools: ToolContext, prompts: Prompts, mut options: AdvisorOptions) -> Self {
        if options.granularity != tools.granularity {
            warn!(
                "Advisor options ask for {:?} granularity but the tools use {:?}; following the tools",
                options.granularity, tools.granularity
            );
            options.granularity = tools.granularity;
        }
        Self {
            model,
            registry: ToolRegistry::new(tools.granularity),
            tools,
            prompts,
            options,
            history: VecDeque::new(),
        }
    }

    pub fn options(&self) -> &AdvisorOptions {
        &self.options
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Number of turns currently remembered.
    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Render the current watch-list summary, fetched fresh from the store.
    pub async fn current_summary(&self) -> String {
        match self.tools.watch_list.summarize_lists(self.options.granularity).await {
            Ok(lists) => lists.to_string(),
            Err(e) => {
                warn!("Could not load watch lists: {}", e);
                LISTS_UNAVAILABLE.to_string()
            }
        }
    }

    fn template_vars(&self) -> HashMap<String, String> {
        let mut vars = HashMap::new();
        vars.insert("user_name".to_string(), self.options.user_name.clone());
        vars.insert("assistant_name".to_string(), self.options.assistant_name.clone());

        let lists = self
            .options
            .granularity
            .statuses()
            .iter()
            .map(|s| format!("- {} ({})", s.label(), s.as_str()))
            .collect::<Vec<_>>()
            .join("\n");
        vars.insert("lists".to_string(), lists);

        let language_instruction = match &self.options.language {
            Some(language) => {
                let mut lang = HashMap::new();
                lang.insert("language".to_string(), language.clone());
                Prompts::render(&self.prompts.advisor.language_instruction, &lang)
            }
            None => String::new(),
        };
        vars.insert("language_instruction".to_string(), language_instruction);
        vars
    }

    /// Assemble the messages sent to the model for one user input.
    ///
    /// Order: persona, few-shot examples, lists (separate mode), history, user message.
    /// In inline mode the summary is prepended to the user message instead.
    pub fn build_context(&self, summary: &str, input: &str) -> Vec<ChatMessage> {
        let vars = self.template_vars();
        let advisor = &self.prompts.advisor;

        let mut messages = vec![ChatMessage::system(
            self.prompts.render_with_custom(&advisor.system, &vars),
        )];

        for example in &advisor.examples {
            let content = self.prompts.render_with_custom(&example.content, &vars);
            messages.push(match example.role {
                ExampleRole::User => ChatMessage::user(content),
                ExampleRole::Assistant => ChatMessage::assistant(content),
            });
        }

        let user_message = match self.options.summary_injection {
            SummaryInjection::SeparateContext => {
                messages.push(ChatMessage::system(format!(
                    "{}\n{}",
                    advisor.history_label,
                    summary.trim_end()
                )));
                input.to_string()
            }
            SummaryInjection::Inline => format!("{}\n\n{}", summary.trim_end(), input),
        };

        for turn in &self.history {
            messages.push(ChatMessage::user(turn.user.clone()));
            messages.push(ChatMessage::assistant(turn.assistant.clone()));
        }

        messages.push(ChatMessage::user(user_message));
        messages
    }

    /// Run one turn: fetch the lists, then answer `input`.
    pub async fn respond(&mut self, input: &str) -> Result<AdvisorResponse> {
        let summary = self.current_summary().await;
        self.respond_with_summary(&summary, input).await
    }

    /// Run one turn against an already fetched summary.
    ///
    /// Tool invocations are dispatched in the order the model sent them, once
    /// each. History is only extended when the turn produces an answer.
    #[instrument(skip(self, summary), fields(history = self.history.len()))]
    pub async fn respond_with_summary(&mut self, summary: &str, input: &str) -> Result<AdvisorResponse> {
        let mut messages = self.build_context(summary, input);
        let mut tool_calls = Vec::new();

        for iteration in 1..=self.options.max_tool_iterations {
            debug!("Advisor iteration {}, {} messages", iteration, messages.len());

            match self.model.complete(&messages, self.registry.definitions()).await? {
                ModelReply::Answer(content) => {
                    self.remember(input, &content);
                    return Ok(AdvisorResponse {
                        content,
                        tool_calls,
                        iterations: iteration,
                    });
                }
                ModelReply::ToolCalls(invocations) => {
                    messages.push(ChatMessage::assistant_tool_calls(invocations.clone()));
                    for invocation in &invocations {
                        let record = self.execute_tool_call(invocation).await;
                        messages.push(ChatMessage::tool_result(&invocation.id, record.result.clone()));
                        tool_calls.push(record);
                    }
                }
            }
        }

        Err(AdvisorError::Agent(format!(
            "Advisor exceeded maximum tool iterations ({})",
            self.options.max_tool_iterations
        )))
    }

    /// Execute a single tool invocation and return a record of it.
    async fn execute_tool_call(&self, invocation: &ToolInvocation) -> ToolCallRecord {
        info!("Advisor calling tool: {} with args: {}", invocation.name, invocation.arguments);

        let (result, success) = match parse_tool_call(&invocation.name, &invocation.arguments) {
            Ok(tool) => match self.tools.execute(&tool).await {
                Ok(output) => (output, true),
                Err(e) => (format!("Tool error: {}", e), false),
            },
            Err(e) => (format!("Failed to parse tool call: {}", e), false),
        };

        ToolCallRecord {
            name: invocation.name.clone(),
            arguments: invocation.arguments.clone(),
            result,
            success,
        }
    }

    fn remember(&mut self, user: &str, assistant: &str) {
        if self.options.max_history_turns == 0 {
            return;
        }
        self.history.push_back(HistoryTurn {
            user: user.to_string(),
            assistant: assistant.to_string(),
        });
        while self.history.len() > self.options.max_history_turns {
            self.history.pop_front();
        }
    }
}

/// Result of one advisor turn.
#[derive(Debug)]
pub struct AdvisorResponse {
    /// The final answer.
    pub content: String,
    /// Every tool dispatched during the turn, in order.
    pub tool_calls: Vec<ToolCallRecord>,
    /// Number of model calls used.
    pub iterations: usize,
}

/// Record of a tool call made during a turn.
#[derive(Debug, Clone)]
pub struct ToolCallRecord {
    pub name: String,
    pub arguments: String,
    /// Text fed back to the model.
    pub result: String,
    pub success: bool,
}

impl std::fmt::Display for ToolCallRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.name, self.arguments)
    }
}
