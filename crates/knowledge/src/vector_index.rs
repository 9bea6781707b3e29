//! Vector index abstraction.
//!
//! Defines a trait for backend-agnostic nearest-neighbour storage, the
//! metadata filter applied to queries, and the ranking shared by backends.

use serde::{Deserialize, Serialize};
use syllabus_core::AppResult;

/// A stored vector with its text and metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexRecord {
    pub id: String,
    pub text: String,
    pub embedding: Vec<f32>,
    /// Arbitrary JSON object; filters match against top-level keys
    pub metadata: serde_json::Value,
}

/// Equality filter on content metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataFilter {
    pub course_title: Option<String>,
    pub lesson_number: Option<u32>,
}

impl MetadataFilter {
    pub fn new(course_title: Option<String>, lesson_number: Option<u32>) -> Self {
        Self {
            course_title,
            lesson_number,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.course_title.is_none() && self.lesson_number.is_none()
    }

    /// Whether a record's metadata satisfies every set condition.
    pub fn matches(&self, metadata: &serde_json::Value) -> bool {
        let course_ok = self.course_title.as_deref().map_or(true, |title| {
            metadata.get("course_title").and_then(|v| v.as_str()) == Some(title)
        });

        let lesson_ok = self.lesson_number.map_or(true, |number| {
            metadata.get("lesson_number").and_then(|v| v.as_u64()) == Some(number as u64)
        });

        course_ok && lesson_ok
    }
}

/// Trait for vector index backends.
///
/// Methods take `&self`; backends use interior mutability so one index can
/// be shared behind an `Arc` by concurrent queries.
pub trait VectorIndex: Send + Sync {
    /// Insert or replace records by id.
    fn upsert(&self, records: Vec<IndexRecord>) -> AppResult<()>;

    /// The `top_k` records matching `filter`, nearest first, with their
    /// cosine distance. Ties are broken by id.
    fn query(
        &self,
        embedding: &[f32],
        top_k: usize,
        filter: &MetadataFilter,
    ) -> AppResult<Vec<(IndexRecord, f32)>>;

    /// Fetch a record by exact id.
    fn get(&self, id: &str) -> AppResult<Option<IndexRecord>>;

    /// All record ids in ascending order.
    fn ids(&self) -> AppResult<Vec<String>>;

    fn count(&self) -> AppResult<usize>;

    /// Remove every record.
    fn clear(&self) -> AppResult<()>;
}

/// Filter, score and order candidates.
pub fn rank(
    candidates: impl IntoIterator<Item = IndexRecord>,
    embedding: &[f32],
    top_k: usize,
    filter: &MetadataFilter,
) -> Vec<(IndexRecord, f32)> {
    let mut scored: Vec<(IndexRecord, f32)> = candidates
        .into_iter()
        .filter(|record| filter.matches(&record.metadata))
        .map(|record| {
            let distance = 1.0 - cosine_similarity(embedding, &record.embedding);
            (record, distance)
        })
        .collect();

    scored.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.id.cmp(&b.0.id)));
    scored.truncate(top_k);
    scored
}

/// Calculate cosine similarity between two vectors.
///
/// Mismatched lengths and zero vectors score 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}
