//! System prompt rendering with injected conversation history.

use crate::types::SystemPromptDefinition;
use handlebars::Handlebars;
use std::collections::HashMap;
use syllabus_core::{AppError, AppResult};

/// Render the system prompt for one generation call.
///
/// The history text is injected verbatim under a "Previous conversation:"
/// heading. Empty or absent history renders the bare instructions.
///
/// # Example
/// ```
/// use syllabus_prompt::{build_system_prompt, SystemPromptDefinition};
///
/// let def = SystemPromptDefinition::builtin();
/// let system = build_system_prompt(&def, Some("User: hi\nAssistant: hello")).unwrap();
/// assert!(system.contains("Previous conversation:"));
/// ```
pub fn build_system_prompt(
    definition: &SystemPromptDefinition,
    history: Option<&str>,
) -> AppResult<String> {
    let mut variables = HashMap::new();
    variables.insert("instructions", definition.instructions.as_str());

    if let Some(history) = history.filter(|h| !h.trim().is_empty()) {
        variables.insert("history", history);
        tracing::debug!("Injected {} bytes of conversation history", history.len());
    }

    render_template(&definition.template, &variables)
}

/// Render a Handlebars template with variables.
fn render_template(template: &str, variables: &HashMap<&str, &str>) -> AppResult<String> {
    let mut handlebars = Handlebars::new();

    // Disable HTML escaping for plain text
    handlebars.register_escape_fn(handlebars::no_escape);

    handlebars
        .register_template_string("system", template)
        .map_err(|e| AppError::Prompt(format!("Failed to register template: {}", e)))?;

    handlebars
        .render("system", variables)
        .map_err(|e| AppError::Prompt(format!("Failed to render template: {}", e)))
}
