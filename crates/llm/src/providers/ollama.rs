//! Ollama LLM provider implementation.
//!
//! This module provides integration with Ollama, a local LLM runtime, through
//! its chat endpoint with function tools.
//! Ollama API: https://github.com/ollama/ollama/blob/main/docs/api.md

use crate::client::{ConverseRequest, ConverseResponse, LlmClient, LlmUsage};
use crate::types::{ContentBlock, Message, Role, StopReason};
use serde::{Deserialize, Serialize};
use syllabus_core::{AppError, AppResult};

/// Ollama chat request format.
#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<ChatTool>,
    stream: bool,
    options: ChatOptions,
}

#[derive(Debug, Serialize)]
struct ChatOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
struct ChatMessage {
    role: String,
    #[serde(default)]
    content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    tool_calls: Vec<ChatToolCall>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
struct ChatToolCall {
    function: ChatFunctionCall,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
struct ChatFunctionCall {
    name: String,
    #[serde(default)]
    arguments: serde_json::Value,
}

#[derive(Debug, Serialize)]
struct ChatTool {
    #[serde(rename = "type")]
    kind: &'static str,
    function: ChatFunction,
}

#[derive(Debug, Serialize)]
struct ChatFunction {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

/// Ollama chat response format.
#[derive(Debug, Deserialize)]
struct ChatResponse {
    model: String,
    message: ChatMessage,
    #[serde(default)]
    done_reason: Option<String>,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
    #[serde(default)]
    eval_count: Option<u32>,
}

/// Ollama LLM client.
pub struct OllamaClient {
    /// Base URL for Ollama API
    base_url: String,

    /// HTTP client
    client: reqwest::Client,
}

impl OllamaClient {
    /// Create a new Ollama client with default settings.
    ///
    /// Default URL: http://localhost:11434
    pub fn new() -> Self {
        Self::with_base_url("http://localhost:11434")
    }

    /// Create a new Ollama client with a custom base URL.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Convert a ConverseRequest to Ollama chat format.
    ///
    /// Tool results travel as separate `tool` role messages; tool-use blocks
    /// become `tool_calls` on the assistant message.
    fn to_chat_request(&self, request: &ConverseRequest) -> ChatRequest {
        let mut messages = Vec::with_capacity(request.messages.len() + 1);

        if let Some(system) = &request.system {
            messages.push(ChatMessage {
                role: "system".to_string(),
                content: system.clone(),
                tool_calls: Vec::new(),
            });
        }

        for message in &request.messages {
            messages.extend(convert_message(message));
        }

        let tools = request
            .tools
            .iter()
            .flatten()
            .map(|tool| ChatTool {
                kind: "function",
                function: ChatFunction {
                    name: tool.name.clone(),
                    description: tool.description.clone(),
                    parameters: tool.input_schema.clone(),
                },
            })
            .collect();

        ChatRequest {
            model: request.model.clone(),
            messages,
            tools,
            stream: false,
            options: ChatOptions {
                temperature: request.temperature,
                num_predict: request.max_tokens,
            },
        }
    }

    /// Convert an Ollama chat response to a ConverseResponse.
    ///
    /// Ollama does not assign tool call ids, so positional ids are synthesised.
    fn convert_response(&self, response: ChatResponse) -> ConverseResponse {
        let mut content = Vec::new();

        if !response.message.content.is_empty() {
            content.push(ContentBlock::text(response.message.content));
        }

        let has_tool_calls = !response.message.tool_calls.is_empty();
        for (index, call) in response.message.tool_calls.into_iter().enumerate() {
            content.push(ContentBlock::ToolUse {
                id: format!("ollama_call_{}", index),
                name: call.function.name,
                input: call.function.arguments,
            });
        }

        let stop_reason = if has_tool_calls {
            StopReason::ToolUse
        } else if response.done_reason.as_deref() == Some("length") {
            StopReason::MaxTokens
        } else {
            StopReason::EndTurn
        };

        ConverseResponse {
            content,
            stop_reason,
            model: response.model,
            usage: LlmUsage::new(
                response.prompt_eval_count.unwrap_or(0),
                response.eval_count.unwrap_or(0),
            ),
        }
    }
}

fn convert_message(message: &Message) -> Vec<ChatMessage> {
    let role = match message.role {
        Role::User => "user",
        Role::Assistant => "assistant",
    };

    let mut text = String::new();
    let mut tool_calls = Vec::new();
    let mut tool_results = Vec::new();

    for block in &message.content {
        match block {
            ContentBlock::Text { text: t } => text.push_str(t),
            ContentBlock::ToolUse { name, input, .. } => tool_calls.push(ChatToolCall {
                function: ChatFunctionCall {
                    name: name.clone(),
                    arguments: input.clone(),
                },
            }),
            ContentBlock::ToolResult { content, .. } => tool_results.push(ChatMessage {
                role: "tool".to_string(),
                content: content.clone(),
                tool_calls: Vec::new(),
            }),
        }
    }

    let mut out = Vec::new();
    if !text.is_empty() || !tool_calls.is_empty() {
        out.push(ChatMessage {
            role: role.to_string(),
            content: text,
            tool_calls,
        });
    }
    out.extend(tool_results);
    out
}

impl Default for OllamaClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl LlmClient for OllamaClient {
    fn provider_name(&self) -> &str {
        "ollama"
    }

    #[tracing::instrument(skip(self, request), fields(model = %request.model, messages = request.messages.len()))]
    async fn converse(&self, request: &ConverseRequest) -> AppResult<ConverseResponse> {
        tracing::debug!("Sending chat request to Ollama");

        let chat_request = self.to_chat_request(request);
        let url = format!("{}/api/chat", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(&chat_request)
            .send()
            .await
            .map_err(|e| {
                AppError::GenerationProvider(format!("Failed to send request to Ollama: {}", e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::GenerationProvider(format!(
                "Ollama API error ({}): {}",
                status, error_text
            )));
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .map_err(|e| AppError::Llm(format!("Failed to parse Ollama response: {}", e)))?;

        tracing::debug!("Received chat response from Ollama");

        Ok(self.convert_response(chat_response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ToolDeclaration;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_ollama_client_creation() {
        let client = OllamaClient::new();
        assert_eq!(client.provider_name(), "ollama");
        assert_eq!(client.base_url, "http://localhost:11434");
    }

    #[test]
    fn test_chat_request_conversion() {
        let client = OllamaClient::new();
        let request = ConverseRequest::new(
            "llama3.2",
            vec![
                Message::user_text("Find lesson 2"),
                Message::assistant(vec![ContentBlock::ToolUse {
                    id: "ollama_call_0".to_string(),
                    name: "search_course_content".to_string(),
                    input: json!({"query": "lesson 2"}),
                }]),
                Message::user(vec![ContentBlock::tool_result("ollama_call_0", "results")]),
            ],
        )
        .with_system("sys")
        .with_tools(vec![ToolDeclaration {
            name: "search_course_content".to_string(),
            description: "Search".to_string(),
            input_schema: json!({"type": "object"}),
        }])
        .with_temperature(0.7)
        .with_max_tokens(100);

        let chat = client.to_chat_request(&request);
        let roles: Vec<&str> = chat.messages.iter().map(|m| m.role.as_str()).collect();
        assert_eq!(roles, vec!["system", "user", "assistant", "tool"]);
        assert_eq!(chat.messages[2].tool_calls[0].function.name, "search_course_content");
        assert_eq!(chat.messages[3].content, "results");
        assert_eq!(chat.tools.len(), 1);
        assert_eq!(chat.options.temperature, 0.7);
        assert_eq!(chat.options.num_predict, 100);
    }

    #[tokio::test]
    async fn test_converse_synthesises_tool_ids() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "model": "llama3.2",
                "message": {
                    "role": "assistant",
                    "content": "",
                    "tool_calls": [
                        {"function": {"name": "search_course_content", "arguments": {"query": "mcp"}}}
                    ]
                },
                "done": true,
                "prompt_eval_count": 20,
                "eval_count": 4
            })))
            .mount(&server)
            .await;

        let client = OllamaClient::with_base_url(server.uri());
        let request = ConverseRequest::new("llama3.2", vec![Message::user_text("mcp?")]);
        let response = client.converse(&request).await.unwrap();

        assert_eq!(response.stop_reason, StopReason::ToolUse);
        let calls = response.tool_calls();
        assert_eq!(calls[0].id, "ollama_call_0");
        assert_eq!(calls[0].input["query"], "mcp");
        assert_eq!(response.usage.total_tokens, 24);
    }

    #[tokio::test]
    async fn test_server_error_is_provider_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = OllamaClient::with_base_url(server.uri());
        let request = ConverseRequest::new("llama3.2", vec![Message::user_text("hi")]);
        let err = client.converse(&request).await.unwrap_err();
        assert!(err.is_provider_failure());
    }
}
