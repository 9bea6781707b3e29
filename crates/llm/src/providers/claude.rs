//! Claude (Anthropic Messages API) provider.
//!
//! API reference: https://docs.anthropic.com/en/api/messages

use crate::client::{ConverseRequest, ConverseResponse, LlmClient, LlmUsage};
use crate::types::{ContentBlock, Message, StopReason, ToolDeclaration};
use serde::{Deserialize, Serialize};
use syllabus_core::{AppError, AppResult};

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const DEFAULT_API_VERSION: &str = "2023-06-01";

/// Messages API request body.
#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    messages: &'a [Message],
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<&'a [ToolDeclaration]>,
}

/// Messages API response body.
#[derive(Debug, Deserialize)]
struct MessagesResponse {
    model: String,
    content: Vec<ContentBlock>,
    #[serde(default)]
    stop_reason: Option<StopReason>,
    #[serde(default)]
    usage: Option<MessagesUsage>,
}

#[derive(Debug, Deserialize)]
struct MessagesUsage {
    #[serde(default)]
    input_tokens: u32,
    #[serde(default)]
    output_tokens: u32,
}

/// Claude client.
pub struct ClaudeClient {
    /// Base URL for the Anthropic API
    base_url: String,

    api_key: String,

    /// Value of the `anthropic-version` header
    api_version: String,

    /// HTTP client
    client: reqwest::Client,
}

impl ClaudeClient {
    /// Create a client against the public Anthropic endpoint.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(DEFAULT_BASE_URL, api_key)
    }

    /// Create a client against a custom endpoint (proxies, tests).
    pub fn with_base_url(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            api_version: DEFAULT_API_VERSION.to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Override the `anthropic-version` header.
    pub fn with_api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = api_version.into();
        self
    }

    fn to_messages_request<'a>(&self, request: &'a ConverseRequest) -> MessagesRequest<'a> {
        MessagesRequest {
            model: &request.model,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            system: request.system.as_deref(),
            messages: &request.messages,
            tools: request.tools.as_deref(),
        }
    }
}

#[async_trait::async_trait]
impl LlmClient for ClaudeClient {
    fn provider_name(&self) -> &str {
        "claude"
    }

    #[tracing::instrument(skip(self, request), fields(model = %request.model, messages = request.messages.len()))]
    async fn converse(&self, request: &ConverseRequest) -> AppResult<ConverseResponse> {
        tracing::debug!(
            "Sending converse request to Claude (tools: {})",
            request.tools.as_ref().map_or(0, Vec::len)
        );

        let url = format!("{}/v1/messages", self.base_url);

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", &self.api_version)
            .json(&self.to_messages_request(request))
            .send()
            .await
            .map_err(|e| {
                AppError::GenerationProvider(format!("Failed to reach Claude API: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(match status.as_u16() {
                401 | 403 => AppError::GenerationProvider(format!(
                    "Claude API authentication failed ({}): {}",
                    status, text
                )),
                429 => AppError::GenerationProvider(format!(
                    "Claude API rate limit exceeded: {}",
                    text
                )),
                _ => AppError::GenerationProvider(format!(
                    "Claude API error ({}): {}",
                    status, text
                )),
            });
        }

        let body: MessagesResponse = response
            .json()
            .await
            .map_err(|e| AppError::Llm(format!("Failed to parse Claude response: {}", e)))?;

        let usage = body
            .usage
            .map(|u| LlmUsage::new(u.input_tokens, u.output_tokens))
            .unwrap_or_default();

        let stop_reason = body.stop_reason.unwrap_or_default();
        tracing::debug!(?stop_reason, total_tokens = usage.total_tokens, "Received Claude response");

        Ok(ConverseResponse {
            content: body.content,
            stop_reason,
            model: body.model,
            usage,
        })
    }
}
