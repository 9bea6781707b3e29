//! Tool-mediated answer generation.
//!
//! A query costs at most two model calls:
//! 1. system prompt + user query + tool declarations
//! 2. only if the first reply stops for `tool_use`: the original user
//!    message, the assistant's tool-use message verbatim and one user message
//!    carrying the tool results, with no tools declared
//!
//! At most one tool is executed per query. Any further tool-use blocks are
//! answered with an error result so the transcript stays well-formed.

use crate::client::{ConverseRequest, LlmClient};
use crate::tools::ToolExecutor;
use crate::types::{ContentBlock, Message, StopReason, ToolCall};
use std::sync::Arc;
use syllabus_core::config::GenerationSettings;
use syllabus_core::AppResult;
use syllabus_prompt::{build_system_prompt, SystemPromptDefinition};

/// Tool result sent for tool calls beyond the first in one response.
pub const SEARCH_LIMIT_MESSAGE: &str =
    "Not executed: only one search is allowed per query. Answer using the first search result.";

/// Wraps an LLM client with the system prompt and the tool-use protocol.
pub struct GenerationClient {
    client: Arc<dyn LlmClient>,
    model: String,
    max_tokens: u32,
    temperature: f32,
    prompt: SystemPromptDefinition,
}

impl GenerationClient {
    /// Create a generation client with the built-in prompt, 800 max tokens
    /// and temperature 0.
    pub fn new(client: Arc<dyn LlmClient>, model: impl Into<String>) -> Self {
        let settings = GenerationSettings::default();
        Self {
            client,
            model: model.into(),
            max_tokens: settings.max_tokens,
            temperature: settings.temperature,
            prompt: SystemPromptDefinition::builtin(),
        }
    }

    /// Apply sampling settings from configuration.
    pub fn with_settings(mut self, settings: &GenerationSettings) -> Self {
        self.max_tokens = settings.max_tokens;
        self.temperature = settings.temperature;
        self
    }

    /// Replace the system prompt definition.
    pub fn with_prompt(mut self, prompt: SystemPromptDefinition) -> Self {
        self.prompt = prompt;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Answer `query`, letting the model call at most one tool.
    ///
    /// `history` is injected into the system prompt verbatim. Provider
    /// failures abort with `AppError::GenerationProvider`; no retry is made.
    pub async fn generate(
        &self,
        query: &str,
        history: Option<&str>,
        tools: Option<&mut dyn ToolExecutor>,
    ) -> AppResult<String> {
        let system = build_system_prompt(&self.prompt, history)?;
        let declarations = tools
            .as_ref()
            .map(|executor| executor.declarations())
            .unwrap_or_default();

        let user_message = Message::user_text(query);

        let first_request = self
            .request(system.clone(), vec![user_message.clone()])
            .with_tools(declarations);
        let first = self.client.converse(&first_request).await?;

        if first.stop_reason != StopReason::ToolUse {
            tracing::debug!("Answered without tool use");
            return Ok(first.text());
        }

        let calls = first.tool_calls();
        let executor = match tools {
            Some(executor) if !calls.is_empty() => executor,
            _ => {
                tracing::warn!("Model requested tool use but no tool could be run");
                return Ok(first.text());
            }
        };

        let results = run_tool_calls(executor, &calls).await;

        let messages = vec![
            user_message,
            Message::assistant(first.content),
            Message::user(results),
        ];
        let second = self.client.converse(&self.request(system, messages)).await?;

        Ok(second.text())
    }

    fn request(&self, system: String, messages: Vec<Message>) -> ConverseRequest {
        ConverseRequest::new(self.model.clone(), messages)
            .with_system(system)
            .with_max_tokens(self.max_tokens)
            .with_temperature(self.temperature)
    }
}

/// Execute the first call and refuse the rest.
async fn run_tool_calls(executor: &mut dyn ToolExecutor, calls: &[ToolCall]) -> Vec<ContentBlock> {
    let mut results = Vec::with_capacity(calls.len());

    for (index, call) in calls.iter().enumerate() {
        if index > 0 {
            tracing::debug!(tool = %call.name, "Skipping tool call beyond the per-query limit");
            results.push(ContentBlock::tool_error(&call.id, SEARCH_LIMIT_MESSAGE));
            continue;
        }

        tracing::debug!(tool = %call.name, input = %call.input, "Executing tool");
        let block = match executor.execute(&call.name, &call.input).await {
            Ok(text) => ContentBlock::tool_result(&call.id, text),
            Err(e) => {
                tracing::warn!(tool = %call.name, "Tool execution failed: {}", e);
                ContentBlock::tool_error(&call.id, e.to_string())
            }
        };
        results.push(block);
    }

    results
}
