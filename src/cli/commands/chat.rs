//! Interactive chat command.

use crate::agent::ChatLoop;
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::llm::OpenAiChatModel;
use crate::orchestrator::Orchestrator;
use anyhow::Result;
use std::io;
use std::sync::Arc;
use tracing::info;

/// Run the interactive chat command.
pub async fn run_chat(settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Chat, &settings) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let orchestrator = Orchestrator::new(settings.clone())?;
    orchestrator.prepare().await;

    let model = Arc::new(OpenAiChatModel::new(&settings.openai, &settings.chat.model)?);
    info!(
        "Chatting with {} (summary: {}, granularity: {})",
        model.model(),
        settings.chat.summary_injection,
        settings.chat.status_granularity
    );

    let advisor = orchestrator.advisor(model);
    let mut chat = ChatLoop::new(advisor).with_tool_echo(settings.chat.show_tool_calls);

    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut output = io::stdout();
    chat.run(&mut input, &mut output).await?;

    Ok(())
}
