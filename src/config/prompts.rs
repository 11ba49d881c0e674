//! Prompt templates for the movie advisor.
//!
//! Prompts can be customized by placing an `advisor.toml` file in the custom prompts directory.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Who speaks in a few-shot example message.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ExampleRole {
    User,
    Assistant,
}

/// One fixed message used to prime the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExampleMessage {
    pub role: ExampleRole,
    pub content: String,
}

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Prompts {
    pub advisor: AdvisorPrompts,
    /// Custom variables from config, available in all prompts.
    #[serde(skip)]
    pub variables: HashMap<String, String>,
}

/// Prompts for the advisor chat.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdvisorPrompts {
    /// Persona and list policy. Placeholders: assistant_name, user_name, lists, language_instruction.
    pub system: String,
    /// Label placed before the watch lists when they are sent as a separate context block.
    pub history_label: String,
    /// Appended to the system prompt when a chat language is configured.
    pub language_instruction: String,
    /// Few-shot exchanges inserted between the system prompt and the conversation.
    pub examples: Vec<ExampleMessage>,
}

impl Default for AdvisorPrompts {
    fn default() -> Self {
        Self {
            system: r#"Your name is {{assistant_name}}. You are a helpful movie advisor chatting with {{user_name}}. You give recommendations and you keep {{user_name}}'s movie history up to date based on the answers, using your tools.

The movie history is made of these lists:
{{lists}}

Rules:
- A title lives in at most one list. Adding it to a list moves it there.
- Use 'remove-from-lists' when a title should disappear from every list.
- Never recommend a title that is already in the movie history.
- Store comments in English, translate them if necessary.
- Use 'search-personal-history' for questions about past opinions and preferences.
- Use 'query-external-movie-db' when you need facts about a movie (plot, cast, release date).
- Keep answers short and conversational.{{language_instruction}}"#
                .to_string(),

            history_label: "Current watch lists (always up to date):".to_string(),

            language_instruction: "\n- Always answer in this language: {{language}}.".to_string(),

            examples: vec![
                ExampleMessage {
                    role: ExampleRole::Assistant,
                    content: "Hi {{user_name}}! Looking for something to watch tonight?".to_string(),
                },
                ExampleMessage {
                    role: ExampleRole::User,
                    content: "Give me a good French comedy.".to_string(),
                },
                ExampleMessage {
                    role: ExampleRole::Assistant,
                    content: "How about 'Amélie'? A whimsical Parisian classic, if you haven't seen it yet."
                        .to_string(),
                },
            ],
        }
    }
}

impl Prompts {
    /// Load prompts from the default location, with optional custom directory and variables.
    pub fn load(
        custom_dir: Option<&str>,
        custom_variables: Option<&HashMap<String, String>>,
    ) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(vars) = custom_variables {
            prompts.variables = vars.clone();
        }

        if let Some(dir) = custom_dir {
            let custom_path = PathBuf::from(shellexpand::tilde(dir).to_string());

            let advisor_path = custom_path.join("advisor.toml");
            if advisor_path.exists() {
                let content = std::fs::read_to_string(&advisor_path)?;
                prompts.advisor = toml::from_str(&content)?;
            }
        }

        Ok(prompts)
    }

    /// Render a prompt template with the given variables.
    pub fn render(template: &str, vars: &HashMap<String, String>) -> String {
        let mut result = template.to_string();
        for (key, value) in vars {
            result = result.replace(&format!("{{{{{}}}}}", key), value);
        }
        result
    }

    /// Render a prompt template with both provided variables and custom config variables.
    /// Provided variables take precedence over custom config variables.
    pub fn render_with_custom(&self, template: &str, vars: &HashMap<String, String>) -> String {
        let mut merged = self.variables.clone();
        for (key, value) in vars {
            merged.insert(key.clone(), value.clone());
        }
        Self::render(template, &merged)
    }
}
