//! The seam between generation and tool execution.

use crate::types::ToolDeclaration;
use syllabus_core::AppResult;

/// Executes tools on behalf of the model.
///
/// Implementations are scoped to a single query: they may record state (such
/// as the sources of the last search) that the caller reads afterwards.
#[async_trait::async_trait]
pub trait ToolExecutor: Send {
    /// Declarations of every tool this executor can run.
    fn declarations(&self) -> Vec<ToolDeclaration>;

    /// Run the named tool and return its text result.
    ///
    /// Failures inside a tool are reported in the returned text; `Err` is
    /// reserved for caller errors such as `InvalidToolName` and
    /// `InvalidToolParameters`.
    async fn execute(&mut self, name: &str, input: &serde_json::Value) -> AppResult<String>;
}
