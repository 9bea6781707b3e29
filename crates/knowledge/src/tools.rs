//! Tools the model can call, and the per-query invoker that runs them.
//!
//! A [`Tool`] declares itself with a JSON schema and turns parameters into
//! text for the model plus display sources for the caller. The
//! [`ToolRegistry`] maps names to tools; a [`ToolInvoker`] is created per
//! query so the sources of one search never leak into another.

use crate::retriever::Retriever;
use crate::types::{SearchQuery, SearchResults, SourceRecord};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use syllabus_core::{AppError, AppResult};
use syllabus_llm::{ToolDeclaration, ToolExecutor};

/// Name under which the content search tool is declared.
pub const COURSE_SEARCH_TOOL: &str = "search_course_content";

/// Result of one tool invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    /// Text handed back to the model
    pub text: String,

    /// Provenance of the text, for display
    pub sources: Vec<SourceRecord>,
}

/// A capability the model can invoke.
#[async_trait::async_trait]
pub trait Tool: Send + Sync {
    fn declaration(&self) -> ToolDeclaration;

    /// Run the tool.
    ///
    /// Return `Err(InvalidToolParameters)` for malformed input. Failures of
    /// the underlying work belong in the output text.
    async fn invoke(&self, input: &Value) -> AppResult<ToolOutput>;
}

/// Semantic search over course content, with optional course and lesson
/// filters.
pub struct CourseSearchTool {
    retriever: Arc<Retriever>,
}

impl CourseSearchTool {
    pub fn new(retriever: Arc<Retriever>) -> Self {
        Self { retriever }
    }

    fn invalid(reason: impl Into<String>) -> AppError {
        AppError::InvalidToolParameters {
            tool: COURSE_SEARCH_TOOL.to_string(),
            reason: reason.into(),
        }
    }

    fn parse_params(input: &Value) -> AppResult<SearchQuery> {
        let params = input
            .as_object()
            .ok_or_else(|| Self::invalid("parameters must be an object"))?;

        let query = match params.get("query") {
            Some(Value::String(query)) => query.clone(),
            Some(_) => return Err(Self::invalid("'query' must be a string")),
            None => return Err(Self::invalid("missing required parameter 'query'")),
        };

        let course_name = match params.get("course_name") {
            None | Some(Value::Null) => None,
            Some(Value::String(name)) => Some(name.clone()),
            Some(_) => return Err(Self::invalid("'course_name' must be a string")),
        };

        let lesson_number = match params.get("lesson_number") {
            None | Some(Value::Null) => None,
            Some(value) => Some(
                coerce_lesson_number(value)
                    .ok_or_else(|| Self::invalid("'lesson_number' must be a non-negative integer"))?,
            ),
        };

        Ok(SearchQuery {
            query,
            course_name,
            lesson_number,
        })
    }

    fn format_results(&self, results: &SearchResults) -> ToolOutput {
        let mut blocks = Vec::with_capacity(results.hits.len());
        let mut sources = Vec::with_capacity(results.hits.len());

        for hit in &results.hits {
            let chunk = &hit.chunk;
            let label = match chunk.lesson_number {
                Some(number) => format!("{} - Lesson {}", chunk.course_title, number),
                None => chunk.course_title.clone(),
            };

            let link = chunk
                .lesson_number
                .and_then(|number| self.retriever.lesson_link(&chunk.course_title, number))
                .or_else(|| self.retriever.course_link(&chunk.course_title));

            blocks.push(format!("[{}]\n{}", label, chunk.text));
            sources.push(SourceRecord { text: label, link });
        }

        ToolOutput {
            text: blocks.join("\n\n"),
            sources,
        }
    }
}

#[async_trait::async_trait]
impl Tool for CourseSearchTool {
    fn declaration(&self) -> ToolDeclaration {
        ToolDeclaration {
            name: COURSE_SEARCH_TOOL.to_string(),
            description: "Search course materials with smart course name matching and lesson filtering"
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "What to search for in the course content"
                    },
                    "course_name": {
                        "type": "string",
                        "description": "Course title (partial matches work, e.g. 'MCP', 'Introduction')"
                    },
                    "lesson_number": {
                        "type": "integer",
                        "description": "Specific lesson number to search within (e.g. 1, 2, 3)"
                    }
                },
                "required": ["query"]
            }),
        }
    }

    async fn invoke(&self, input: &Value) -> AppResult<ToolOutput> {
        let params = Self::parse_params(input)?;

        let results = match self
            .retriever
            .search(&params.query, params.course_name.as_deref(), params.lesson_number)
            .await
        {
            Ok(results) => results,
            Err(e) => {
                tracing::warn!("Course search failed: {}", e);
                return Ok(ToolOutput {
                    text: format!("Search error: {}", e),
                    sources: Vec::new(),
                });
            }
        };

        if let Some(error) = results.error {
            return Ok(ToolOutput {
                text: error,
                sources: Vec::new(),
            });
        }

        if results.hits.is_empty() {
            return Ok(ToolOutput {
                text: no_results_message(params.course_name.as_deref(), params.lesson_number),
                sources: Vec::new(),
            });
        }

        Ok(self.format_results(&results))
    }
}

fn no_results_message(course_name: Option<&str>, lesson_number: Option<u32>) -> String {
    let mut message = String::from("No relevant content found");
    if let Some(course) = course_name.filter(|c| !c.trim().is_empty()) {
        message.push_str(&format!(" in course '{}'", course));
    }
    if let Some(number) = lesson_number {
        message.push_str(&format!(" in lesson {}", number));
    }
    message.push('.');
    message
}

/// Accept integers, integral floats and numeric strings.
fn coerce_lesson_number(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_u64() {
                u32::try_from(i).ok()
            } else {
                n.as_f64()
                    .filter(|f| f.fract() == 0.0 && *f >= 0.0 && *f <= u32::MAX as f64)
                    .map(|f| f as u32)
            }
        }
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Tools by name.
#[derive(Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the course search tool over `retriever`.
    pub fn with_course_search(retriever: Arc<Retriever>) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(CourseSearchTool::new(retriever)));
        registry
    }

    /// Add a tool under its declared name, replacing any previous holder.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.declaration().name;
        if self.tools.insert(name.clone(), tool).is_some() {
            tracing::warn!("Replaced previously registered tool '{}'", name);
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Declarations in name order.
    pub fn declarations(&self) -> Vec<ToolDeclaration> {
        self.tools.values().map(|tool| tool.declaration()).collect()
    }

    pub fn names(&self) -> Vec<String> {
        self.tools.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

/// Runs registered tools for one query and keeps the sources of the last
/// successful invocation.
pub struct ToolInvoker {
    registry: Arc<ToolRegistry>,
    last_sources: Vec<SourceRecord>,
}

impl ToolInvoker {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self {
            registry,
            last_sources: Vec::new(),
        }
    }

    /// Sources of the last invocation; empty if none ran.
    pub fn get_last_sources(&self) -> &[SourceRecord] {
        &self.last_sources
    }

    pub fn reset_sources(&mut self) {
        self.last_sources.clear();
    }

    /// Move the last sources out, leaving none behind.
    pub fn take_sources(&mut self) -> Vec<SourceRecord> {
        std::mem::take(&mut self.last_sources)
    }
}

#[async_trait::async_trait]
impl ToolExecutor for ToolInvoker {
    fn declarations(&self) -> Vec<ToolDeclaration> {
        self.registry.declarations()
    }

    async fn execute(&mut self, name: &str, input: &Value) -> AppResult<String> {
        let tool = self
            .registry
            .get(name)
            .ok_or_else(|| AppError::InvalidToolName(name.to_string()))?;

        let output = tool.invoke(input).await?;
        self.last_sources = output.sources;
        Ok(output.text)
    }
}
