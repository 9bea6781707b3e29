//! Course knowledge retrieval and question answering.
//!
//! Two vector indexes back the [`Retriever`]: a catalog of courses embedded
//! by title and the chunked lesson content. The [`QueryOrchestrator`] threads
//! session history into a tool-enabled generation call whose only tool is the
//! course content search.

pub mod embeddings;
pub mod memory;
pub mod memory_index;
pub mod orchestrator;
pub mod retriever;
pub mod sqlite_index;
pub mod tools;
pub mod types;
pub mod vector_index;

#[cfg(test)]
mod tests;

// Re-export commonly used types
pub use embeddings::{create_provider, EmbeddingConfig, EmbeddingProvider};
pub use memory::{Exchange, SessionStore};
pub use orchestrator::QueryOrchestrator;
pub use retriever::Retriever;
pub use tools::{CourseSearchTool, Tool, ToolInvoker, ToolOutput, ToolRegistry, COURSE_SEARCH_TOOL};
pub use types::{
    CatalogEntry, CatalogSummary, ContentChunk, IngestBatch, IngestStats, LessonRef,
    QueryResponse, SearchHit, SearchQuery, SearchResults, SourceRecord,
};
pub use vector_index::{IndexRecord, MetadataFilter, VectorIndex};
