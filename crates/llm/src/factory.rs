//! LLM provider factory.
//!
//! Creates LLM clients from a provider name, endpoint and secret.

use crate::client::LlmClient;
use crate::providers::{ClaudeClient, OllamaClient};
use crate::types::ProviderType;
use std::sync::Arc;
use syllabus_core::{AppError, AppResult};

/// Create an LLM client based on the provider name.
///
/// # Arguments
/// * `provider` - Provider identifier ("claude", "anthropic", "ollama")
/// * `endpoint` - Optional custom endpoint URL
/// * `api_key` - API key (required for Claude)
///
/// # Errors
/// Returns `AppError::Config` if the provider is unknown or a required
/// secret is missing.
pub fn create_client(
    provider: &str,
    endpoint: Option<&str>,
    api_key: Option<&str>,
) -> AppResult<Arc<dyn LlmClient>> {
    let provider_type = ProviderType::parse(provider)
        .ok_or_else(|| AppError::Config(format!("Unknown provider: {}", provider)))?;

    tracing::debug!("Creating {} client", provider_type.as_str());

    match provider_type {
        ProviderType::Ollama => {
            let base_url = endpoint.unwrap_or("http://localhost:11434");
            Ok(Arc::new(OllamaClient::with_base_url(base_url)))
        }
        ProviderType::Claude => {
            let api_key = api_key
                .ok_or_else(|| AppError::Config("Claude provider requires API key".to_string()))?;
            let client = match endpoint {
                Some(url) => ClaudeClient::with_base_url(url, api_key),
                None => ClaudeClient::new(api_key),
            };
            Ok(Arc::new(client))
        }
    }
}
