//! Interactive read-answer loop around the [`Advisor`].

use super::runner::Advisor;
use crate::error::Result;
use console::style;
use std::io::{BufRead, Write};
use tracing::{debug, error};

/// States of the chat loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    AwaitingInput,
    Terminated,
}

/// Drives an [`Advisor`] from a line-oriented reader and writer.
pub struct ChatLoop {
    advisor: Advisor,
    show_tool_calls: bool,
    state: LoopState,
}

impl ChatLoop {
    pub fn new(advisor: Advisor) -> Self {
        Self {
            advisor,
            show_tool_calls: false,
            state: LoopState::AwaitingInput,
        }
    }

    /// Echo each dispatched tool as a dim `[tool-name]` line.
    pub fn with_tool_echo(mut self, show: bool) -> Self {
        self.show_tool_calls = show;
        self
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn advisor(&self) -> &Advisor {
        &self.advisor
    }

    /// Run until empty input or end of input.
    pub async fn run<R: BufRead, W: Write>(&mut self, input: &mut R, output: &mut W) -> Result<()> {
        let options = self.advisor.options();
        writeln!(output, "{}", style("# CHAT STARTED #").bold())?;
        writeln!(output, "{}", style("Leave input empty to exit.").dim())?;
        debug!(
            "Chat started (summary: {}, granularity: {})",
            options.summary_injection, options.granularity
        );

        while self.state == LoopState::AwaitingInput {
            self.state = self.step(input, output).await?;
        }

        writeln!(output, "{}", style("# CHAT ENDED #").bold())?;
        Ok(())
    }

    /// Process one turn and return the next state.
    ///
    /// The summary is fetched before reading so the turn sees current lists.
    /// Empty input or end of input terminates without calling the model. A
    /// failed turn or an undecodable line is reported and the loop keeps
    /// waiting for input.
    pub async fn step<R: BufRead, W: Write>(&mut self, input: &mut R, output: &mut W) -> Result<LoopState> {
        if self.state == LoopState::Terminated {
            return Ok(LoopState::Terminated);
        }

        let summary = self.advisor.current_summary().await;

        let user_name = &self.advisor.options().user_name;
        write!(output, "{} ", style(format!("{}:", user_name)).green().bold())?;
        output.flush()?;

        let mut line = String::new();
        match input.read_line(&mut line) {
            Ok(0) => {
                writeln!(output)?;
                return Ok(LoopState::Terminated);
            }
            Ok(_) => {}
            // The bad line is consumed; the next read starts after it
            Err(e) if e.kind() == std::io::ErrorKind::InvalidData => {
                error!("Unreadable input line: {}", e);
                writeln!(output, "{} Input was not valid UTF-8, please try again.", style(">>").red().bold())?;
                return Ok(LoopState::AwaitingInput);
            }
            Err(e) => return Err(e.into()),
        }

        let line = line.trim();
        if line.is_empty() {
            return Ok(LoopState::Terminated);
        }

        match self.advisor.respond_with_summary(&summary, line).await {
            Ok(response) => {
                if self.show_tool_calls {
                    for record in &response.tool_calls {
                        writeln!(output, "{}", style(format!("  [{}]", record.name)).dim())?;
                    }
                }
                let assistant_name = &self.advisor.options().assistant_name;
                writeln!(
                    output,
                    "{} {}",
                    style(format!("{}:", assistant_name)).cyan().bold(),
                    response.content
                )?;
            }
            Err(e) => {
                error!("Turn failed: {}", e);
                writeln!(output, "{} {}", style(">>").red().bold(), e)?;
            }
        }

        Ok(LoopState::AwaitingInput)
    }
}
