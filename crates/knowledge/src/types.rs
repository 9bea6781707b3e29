//! Course knowledge type definitions.

use serde::{Deserialize, Serialize};

/// One lesson of a course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LessonRef {
    /// Lesson number within the course
    pub number: u32,

    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

/// Course-level metadata, embedded by title for semantic lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Course title; unique and the join key for content chunks
    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructor: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub course_link: Option<String>,

    /// Lessons in course order
    #[serde(default)]
    pub lessons: Vec<LessonRef>,
}

impl CatalogEntry {
    /// Look up a lesson by number.
    pub fn lesson(&self, number: u32) -> Option<&LessonRef> {
        self.lessons.iter().find(|lesson| lesson.number == number)
    }
}

/// A chunk of lesson text belonging to exactly one course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentChunk {
    pub text: String,

    /// Title of the owning catalog entry
    pub course_title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lesson_number: Option<u32>,

    /// Position of the chunk within its course
    pub chunk_index: u32,
}

impl ContentChunk {
    /// Stable index id: `<course_title>_<chunk_index>`.
    pub fn id(&self) -> String {
        format!("{}_{}", self.course_title, self.chunk_index)
    }
}

/// Parameters of one search.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchQuery {
    pub query: String,

    /// Loose course reference, resolved against the catalog
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub course_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lesson_number: Option<u32>,
}

/// A ranked content chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub chunk: ContentChunk,

    /// Cosine distance to the query (lower is closer)
    pub distance: f32,
}

/// Outcome of a search.
///
/// An empty `hits` list with no `error` means nothing matched; that is a
/// normal outcome, distinct from a failed search.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResults {
    /// Hits ordered by ascending distance
    pub hits: Vec<SearchHit>,

    /// Exact course title the hint resolved to, if a hint was given
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_course: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SearchResults {
    /// A result set carrying only an error message.
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Default::default()
        }
    }

    /// True when the search ran and matched nothing.
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty() && self.error.is_none()
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }
}

/// Display-ready provenance for a search hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRecord {
    /// Course and lesson label, e.g. "Intro to MCP - Lesson 2"
    pub text: String,

    pub link: Option<String>,
}

/// Read-only view of the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogSummary {
    pub total_courses: usize,
    pub titles: Vec<String>,
}

/// A batch of pre-parsed records to ingest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestBatch {
    #[serde(default)]
    pub catalog: Vec<CatalogEntry>,

    #[serde(default)]
    pub chunks: Vec<ContentChunk>,
}

/// Counts from an ingestion run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestStats {
    pub courses: usize,
    pub chunks: usize,
}

/// Answer to a query, as returned to the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryResponse {
    pub answer: String,
    pub sources: Vec<SourceRecord>,
    pub session_id: String,
}
