//! Prompt types for Syllabus.

use serde::{Deserialize, Serialize};

/// Identifier of the built-in course assistant prompt.
pub const DEFAULT_PROMPT_ID: &str = "course.assistant";

const BUILTIN_INSTRUCTIONS: &str = "\
You are an AI assistant specialized in course materials and educational content with access to a comprehensive search tool for course information.

Search Tool Usage:
- Use the search tool **only** for questions about specific course content or detailed educational materials
- **One search per query maximum**
- Synthesize search results into accurate, fact-based responses
- If search yields no results, state this clearly without offering alternatives

Response Protocol:
- **General knowledge questions**: Answer using existing knowledge without searching
- **Course-specific questions**: Search first, then answer
- **No meta-commentary**: Provide direct answers only, no reasoning process, search explanations or question-type analysis
- Do not mention \"based on the search results\"

All responses must be:
1. **Brief, concise and focused** - Get to the point quickly
2. **Educational** - Maintain instructional value
3. **Clear** - Use accessible language
4. **Example-supported** - Include relevant examples when they aid understanding
Provide only the direct answer to what was asked.";

const BUILTIN_TEMPLATE: &str =
    "{{instructions}}{{#if history}}\n\nPrevious conversation:\n{{history}}{{/if}}";

/// A system prompt definition loaded from YAML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemPromptDefinition {
    /// Unique prompt identifier
    pub id: String,

    /// Human-readable title
    pub title: String,

    /// API version for schema evolution
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Creator identifier
    #[serde(rename = "createdBy", default)]
    pub created_by: String,

    /// Static assistant instructions
    pub instructions: String,

    /// Handlebars template; receives `instructions` and an optional `history`
    #[serde(default = "default_template")]
    pub template: String,
}

fn default_template() -> String {
    BUILTIN_TEMPLATE.to_string()
}

impl SystemPromptDefinition {
    /// The built-in course assistant prompt.
    pub fn builtin() -> Self {
        Self {
            id: DEFAULT_PROMPT_ID.to_string(),
            title: "Course materials assistant".to_string(),
            api_version: "1.0".to_string(),
            created_by: "syllabus".to_string(),
            instructions: BUILTIN_INSTRUCTIONS.to_string(),
            template: default_template(),
        }
    }
}
