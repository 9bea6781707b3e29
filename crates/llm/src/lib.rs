//! LLM integration crate for Syllabus.
//!
//! This crate provides a provider-agnostic `converse` abstraction, the
//! Claude and Ollama providers behind it, and the `GenerationClient` that
//! runs the tool-use protocol for a query.
//!
//! # Providers
//! - **Claude**: Anthropic Messages API (default)
//! - **Ollama**: Local LLM runtime
//!
//! # Example
//! ```no_run
//! use syllabus_llm::{create_client, GenerationClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = create_client("ollama", None, None)?;
//! let generator = GenerationClient::new(client, "llama3.2");
//! let answer = generator.generate("What is a vector index?", None, None).await?;
//! println!("{}", answer);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod factory;
pub mod generation;
pub mod providers;
pub mod tools;
pub mod types;

// Re-export main types
pub use client::{ConverseRequest, ConverseResponse, LlmClient, LlmUsage};
pub use factory::create_client;
pub use generation::GenerationClient;
pub use providers::{ClaudeClient, OllamaClient};
pub use tools::ToolExecutor;
pub use types::{ContentBlock, Message, ProviderType, Role, StopReason, ToolCall, ToolDeclaration};
