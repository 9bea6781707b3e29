//! System prompt management for Syllabus.
//!
//! This crate provides:
//! - YAML-based system prompt definitions with a built-in default
//! - Handlebars rendering of instructions plus injected conversation history

pub mod builder;
pub mod loader;
pub mod types;

// Re-export main types
pub use builder::build_system_prompt;
pub use loader::{load_prompt, load_prompt_or_builtin};
pub use types::{SystemPromptDefinition, DEFAULT_PROMPT_ID};
