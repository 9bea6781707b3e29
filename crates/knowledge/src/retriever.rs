//! Two-phase semantic search over the course catalog and content indexes.
//!
//! Phase 1 resolves a loose course reference ("MCP", a typo'd title) to the
//! nearest catalog entry. Phase 2 searches content chunks restricted to the
//! resolved title and, optionally, a lesson number.

use crate::embeddings::{create_provider, EmbeddingConfig, EmbeddingProvider};
use crate::memory_index::MemoryIndex;
use crate::sqlite_index::SqliteIndex;
use crate::types::{
    CatalogEntry, CatalogSummary, ContentChunk, IngestBatch, IngestStats, SearchHit,
    SearchResults,
};
use crate::vector_index::{IndexRecord, MetadataFilter, VectorIndex};
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use syllabus_core::{AppConfig, AppError, AppResult};

/// Table holding one record per course, embedded by title.
pub const CATALOG_TABLE: &str = "course_catalog";

/// Table holding lesson text chunks.
pub const CONTENT_TABLE: &str = "course_content";

pub const DEFAULT_MAX_RESULTS: usize = 5;

/// Semantic search over course materials.
pub struct Retriever {
    embedder: Arc<dyn EmbeddingProvider>,
    catalog: Arc<dyn VectorIndex>,
    content: Arc<dyn VectorIndex>,
    max_results: usize,
    /// Minimum cosine similarity for course resolution; `None` accepts the
    /// nearest entry whatever its distance
    min_course_similarity: Option<f32>,
}

impl Retriever {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        catalog: Arc<dyn VectorIndex>,
        content: Arc<dyn VectorIndex>,
    ) -> Self {
        Self {
            embedder,
            catalog,
            content,
            max_results: DEFAULT_MAX_RESULTS,
            min_course_similarity: None,
        }
    }

    /// A retriever backed by process-memory indexes.
    pub fn in_memory(embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self::new(
            embedder,
            Arc::new(MemoryIndex::new()),
            Arc::new(MemoryIndex::new()),
        )
    }

    /// A retriever backed by the SQLite database at `path`.
    pub fn open(path: &Path, embedder: Arc<dyn EmbeddingProvider>) -> AppResult<Self> {
        let catalog = SqliteIndex::open(path, CATALOG_TABLE)?;
        let content = SqliteIndex::open(path, CONTENT_TABLE)?;
        Ok(Self::new(embedder, Arc::new(catalog), Arc::new(content)))
    }

    /// Build the embedder and open the persistent index described by `config`.
    pub fn from_config(config: &AppConfig) -> AppResult<Self> {
        let embedder = create_provider(&EmbeddingConfig::from(&config.embedding))?;
        let retriever = Self::open(&config.resolved_index_path(), embedder)?
            .with_max_results(config.retrieval.max_results)
            .with_min_course_similarity(config.retrieval.min_course_similarity);
        Ok(retriever)
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    pub fn with_min_course_similarity(mut self, floor: Option<f32>) -> Self {
        self.min_course_similarity = floor;
        self
    }

    pub fn max_results(&self) -> usize {
        self.max_results
    }

    /// Embed and store catalog entries, replacing any with the same title.
    pub async fn add_catalog_entries(&self, entries: &[CatalogEntry]) -> AppResult<usize> {
        if entries.is_empty() {
            return Ok(0);
        }

        let titles: Vec<String> = entries.iter().map(|e| e.title.clone()).collect();
        let embeddings = self.embedder.embed_batch(&titles).await?;
        check_batch_len(titles.len(), embeddings.len())?;

        let records = entries
            .iter()
            .zip(embeddings)
            .map(|(entry, embedding)| {
                Ok(IndexRecord {
                    id: entry.title.clone(),
                    text: entry.title.clone(),
                    embedding,
                    metadata: serde_json::to_value(entry)?,
                })
            })
            .collect::<AppResult<Vec<_>>>()?;

        self.catalog.upsert(records)?;
        tracing::info!("Indexed {} catalog entries", entries.len());
        Ok(entries.len())
    }

    /// Embed and store content chunks, replacing any with the same id.
    pub async fn add_content_chunks(&self, chunks: &[ContentChunk]) -> AppResult<usize> {
        if chunks.is_empty() {
            return Ok(0);
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;
        check_batch_len(texts.len(), embeddings.len())?;

        let records = chunks
            .iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| IndexRecord {
                id: chunk.id(),
                text: chunk.text.clone(),
                embedding,
                metadata: json!({
                    "course_title": chunk.course_title,
                    "lesson_number": chunk.lesson_number,
                    "chunk_index": chunk.chunk_index,
                }),
            })
            .collect();

        self.content.upsert(records)?;
        tracing::info!("Indexed {} content chunks", chunks.len());
        Ok(chunks.len())
    }

    /// Store a pre-parsed batch: catalog first, then content.
    pub async fn ingest(&self, batch: &IngestBatch) -> AppResult<IngestStats> {
        let courses = self.add_catalog_entries(&batch.catalog).await?;
        let chunks = self.add_content_chunks(&batch.chunks).await?;
        Ok(IngestStats { courses, chunks })
    }

    /// Search content, optionally restricted to a course and lesson.
    ///
    /// A blank `course_name` counts as absent. An empty catalog (when a hint
    /// is given) and a rejected resolution come back as error results, not
    /// `Err`; `Err` means the index or embedder failed.
    pub async fn search(
        &self,
        query: &str,
        course_name: Option<&str>,
        lesson_number: Option<u32>,
    ) -> AppResult<SearchResults> {
        let hint = course_name.map(str::trim).filter(|h| !h.is_empty());

        let resolved_course = match hint {
            Some(hint) => match self.resolve_course(hint).await? {
                None => {
                    tracing::debug!(hint, "Course resolution against an empty catalog");
                    return Ok(SearchResults::failed(
                        AppError::ResolutionEmpty(hint.to_string()).to_string(),
                    ));
                }
                Some((title, distance)) => {
                    if let Some(floor) = self.min_course_similarity {
                        if 1.0 - distance < floor {
                            tracing::debug!(hint, %title, distance, "Nearest course below similarity floor");
                            return Ok(SearchResults::failed(format!(
                                "No course found matching '{}'",
                                hint
                            )));
                        }
                    }
                    Some(title)
                }
            },
            None => None,
        };

        let filter = MetadataFilter::new(resolved_course.clone(), lesson_number);
        let embedding = self.embedder.embed(query).await?;
        let matches = self.content.query(&embedding, self.max_results, &filter)?;

        let hits = matches
            .into_iter()
            .map(|(record, distance)| {
                Ok(SearchHit {
                    chunk: chunk_from_record(record)?,
                    distance,
                })
            })
            .collect::<AppResult<Vec<_>>>()?;

        tracing::debug!(
            query,
            course = ?resolved_course,
            lesson = ?lesson_number,
            "Content search returned {} hits",
            hits.len()
        );

        Ok(SearchResults {
            hits,
            resolved_course,
            error: None,
        })
    }

    /// The catalog title nearest to `hint` and its distance, or `None` when
    /// the catalog is empty.
    pub async fn resolve_course(&self, hint: &str) -> AppResult<Option<(String, f32)>> {
        let embedding = self.embedder.embed(hint).await?;
        let nearest = self
            .catalog
            .query(&embedding, 1, &MetadataFilter::default())?
            .into_iter()
            .next()
            .map(|(record, distance)| (record.id, distance));

        if let Some((title, distance)) = &nearest {
            tracing::debug!(hint, %title, distance, "Resolved course");
        }

        Ok(nearest)
    }

    /// Catalog entry by exact title. Lookup failures read as missing.
    pub fn catalog_entry(&self, title: &str) -> Option<CatalogEntry> {
        match self.catalog.get(title) {
            Ok(record) => record.and_then(|r| serde_json::from_value(r.metadata).ok()),
            Err(e) => {
                tracing::warn!("Catalog lookup for '{}' failed: {}", title, e);
                None
            }
        }
    }

    pub fn course_link(&self, title: &str) -> Option<String> {
        self.catalog_entry(title)?.course_link
    }

    pub fn lesson_link(&self, title: &str, lesson_number: u32) -> Option<String> {
        self.catalog_entry(title)?.lesson(lesson_number)?.link.clone()
    }

    pub fn catalog_summary(&self) -> AppResult<CatalogSummary> {
        let titles = self.catalog.ids()?;
        Ok(CatalogSummary {
            total_courses: titles.len(),
            titles,
        })
    }

    /// Remove every catalog entry and content chunk.
    pub fn clear(&self) -> AppResult<()> {
        self.catalog.clear()?;
        self.content.clear()?;
        Ok(())
    }
}

fn check_batch_len(expected: usize, actual: usize) -> AppResult<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(AppError::Knowledge(format!(
            "Embedding provider returned {} vectors for {} texts",
            actual, expected
        )))
    }
}

fn chunk_from_record(record: IndexRecord) -> AppResult<ContentChunk> {
    let mut metadata = record.metadata;
    match metadata.as_object_mut() {
        Some(fields) => {
            fields.insert("text".to_string(), serde_json::Value::String(record.text));
        }
        None => {
            return Err(AppError::Knowledge(format!(
                "Content record '{}' has malformed metadata",
                record.id
            )))
        }
    }
    Ok(serde_json::from_value(metadata)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::providers::TrigramProvider;
    use crate::types::LessonRef;
    use tempfile::TempDir;

    fn retriever() -> Retriever {
        Retriever::in_memory(Arc::new(TrigramProvider::new(384)))
    }

    fn course(title: &str) -> CatalogEntry {
        CatalogEntry {
            title: title.to_string(),
            instructor: Some("Ada".to_string()),
            course_link: Some(format!("https://courses.example.com/{}", title.len())),
            lessons: vec![
                LessonRef {
                    number: 1,
                    title: "Basics".to_string(),
                    link: Some("https://courses.example.com/lesson1".to_string()),
                },
                LessonRef {
                    number: 2,
                    title: "Advanced".to_string(),
                    link: None,
                },
            ],
        }
    }

    fn chunk(course: &str, lesson: Option<u32>, index: u32, text: &str) -> ContentChunk {
        ContentChunk {
            text: text.to_string(),
            course_title: course.to_string(),
            lesson_number: lesson,
            chunk_index: index,
        }
    }

    #[tokio::test]
    async fn test_hint_against_empty_catalog_is_error_result() {
        let retriever = retriever();
        retriever
            .add_content_chunks(&[chunk("MCP", Some(1), 0, "servers expose tools")])
            .await
            .unwrap();

        let results = retriever.search("tools", Some("MCP"), None).await.unwrap();
        assert!(results.is_error());
        assert!(results.error.unwrap().contains("catalog is empty"));
    }

    #[tokio::test]
    async fn test_no_hint_skips_resolution() {
        let retriever = retriever();
        retriever
            .add_content_chunks(&[chunk("MCP", Some(1), 0, "servers expose tools")])
            .await
            .unwrap();

        let results = retriever.search("tools", None, None).await.unwrap();
        assert_eq!(results.len(), 1);
        assert!(results.resolved_course.is_none());

        let blank = retriever.search("tools", Some("   "), None).await.unwrap();
        assert_eq!(blank.len(), 1);
        assert!(!blank.is_error());
    }

    #[tokio::test]
    async fn test_resolved_course_restricts_content() {
        let retriever = retriever();
        retriever
            .ingest(&IngestBatch {
                catalog: vec![course("Retrieval Augmented Generation")],
                chunks: vec![
                    chunk("Retrieval Augmented Generation", Some(1), 0, "embeddings and vector stores"),
                    chunk("Other Course", Some(1), 0, "embeddings and vector stores"),
                ],
            })
            .await
            .unwrap();

        let results = retriever
            .search("vector stores", Some("retrieval"), None)
            .await
            .unwrap();

        assert_eq!(
            results.resolved_course.as_deref(),
            Some("Retrieval Augmented Generation")
        );
        assert_eq!(results.len(), 1);
        assert_eq!(results.hits[0].chunk.course_title, "Retrieval Augmented Generation");
    }

    #[tokio::test]
    async fn test_lesson_filter_without_course() {
        let retriever = retriever();
        retriever
            .add_content_chunks(&[
                chunk("A", Some(1), 0, "lesson one text"),
                chunk("A", Some(2), 1, "lesson two text"),
                chunk("B", None, 0, "unnumbered text"),
            ])
            .await
            .unwrap();

        let results = retriever.search("text", None, Some(2)).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results.hits[0].chunk.text, "lesson two text");
    }

    #[tokio::test]
    async fn test_max_results_caps_hits() {
        let retriever = retriever().with_max_results(2);
        let chunks: Vec<ContentChunk> = (0..5)
            .map(|i| chunk("A", Some(1), i, &format!("chunk number {}", i)))
            .collect();
        retriever.add_content_chunks(&chunks).await.unwrap();

        let results = retriever.search("chunk", None, None).await.unwrap();
        assert_eq!(results.len(), 2);
        assert!(results.hits[0].distance <= results.hits[1].distance);
    }

    #[tokio::test]
    async fn test_similarity_floor_rejects_distant_course() {
        let retriever = retriever().with_min_course_similarity(Some(0.99));
        retriever
            .add_catalog_entries(&[course("Introduction to Model Context Protocol")])
            .await
            .unwrap();

        let rejected = retriever
            .search("anything", Some("Quantum Basket Weaving"), None)
            .await
            .unwrap();
        assert_eq!(
            rejected.error.as_deref(),
            Some("No course found matching 'Quantum Basket Weaving'")
        );

        let accepted = retriever
            .search("anything", Some("Introduction to Model Context Protocol"), None)
            .await
            .unwrap();
        assert!(!accepted.is_error());
        assert!(accepted.is_empty());
    }

    #[tokio::test]
    async fn test_links_and_summary() {
        let retriever = retriever();
        retriever
            .add_catalog_entries(&[course("Zeta Course"), course("Alpha Course")])
            .await
            .unwrap();

        assert_eq!(
            retriever.lesson_link("Alpha Course", 1).as_deref(),
            Some("https://courses.example.com/lesson1")
        );
        assert_eq!(retriever.lesson_link("Alpha Course", 2), None);
        assert_eq!(retriever.lesson_link("Alpha Course", 9), None);
        assert!(retriever.course_link("Alpha Course").is_some());
        assert_eq!(retriever.course_link("Missing"), None);

        let summary = retriever.catalog_summary().unwrap();
        assert_eq!(summary.total_courses, 2);
        assert_eq!(summary.titles, vec!["Alpha Course", "Zeta Course"]);
    }

    #[tokio::test]
    async fn test_reingest_replaces_by_id_and_clear() {
        let retriever = retriever();
        let batch = IngestBatch {
            catalog: vec![course("A")],
            chunks: vec![chunk("A", Some(1), 0, "first version")],
        };
        retriever.ingest(&batch).await.unwrap();

        let stats = retriever
            .ingest(&IngestBatch {
                catalog: vec![course("A")],
                chunks: vec![chunk("A", Some(1), 0, "second version")],
            })
            .await
            .unwrap();
        assert_eq!(stats, IngestStats { courses: 1, chunks: 1 });

        let results = retriever.search("version", None, None).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results.hits[0].chunk.text, "second version");

        retriever.clear().unwrap();
        assert_eq!(retriever.catalog_summary().unwrap().total_courses, 0);
        assert!(retriever.search("version", None, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_persistent_index_survives_reopen() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("index.sqlite");
        let embedder: Arc<dyn EmbeddingProvider> = Arc::new(TrigramProvider::new(384));

        {
            let retriever = Retriever::open(&path, embedder.clone()).unwrap();
            retriever
                .ingest(&IngestBatch {
                    catalog: vec![course("Persistent Course")],
                    chunks: vec![chunk("Persistent Course", Some(2), 3, "stored on disk")],
                })
                .await
                .unwrap();
        }

        let reopened = Retriever::open(&path, embedder).unwrap();
        let results = reopened
            .search("disk", Some("Persistent Course"), Some(2))
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results.hits[0].chunk, chunk("Persistent Course", Some(2), 3, "stored on disk"));
    }
}
