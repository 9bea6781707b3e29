//! Cross-module tests: retrieval properties and end-to-end query scenarios.

mod query_scenarios;

use crate::embeddings::providers::TrigramProvider;
use crate::retriever::Retriever;
use crate::types::{CatalogEntry, ContentChunk, IngestBatch, LessonRef};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use syllabus_core::{AppError, AppResult};
use syllabus_llm::{
    ContentBlock, ConverseRequest, ConverseResponse, LlmClient, LlmUsage, StopReason,
};

/// Replays canned provider responses and records every request.
pub(crate) struct ScriptedClient {
    responses: Mutex<VecDeque<AppResult<ConverseResponse>>>,
    requests: Mutex<Vec<ConverseRequest>>,
}

impl ScriptedClient {
    pub(crate) fn new(responses: Vec<AppResult<ConverseResponse>>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub(crate) fn requests(&self) -> Vec<ConverseRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl LlmClient for ScriptedClient {
    fn provider_name(&self) -> &str {
        "scripted"
    }

    async fn converse(&self, request: &ConverseRequest) -> AppResult<ConverseResponse> {
        self.requests.lock().unwrap().push(request.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(AppError::Other("script exhausted".to_string())))
    }
}

pub(crate) fn text_response(text: &str) -> AppResult<ConverseResponse> {
    Ok(ConverseResponse {
        content: vec![ContentBlock::text(text)],
        stop_reason: StopReason::EndTurn,
        model: "scripted-model".to_string(),
        usage: LlmUsage::default(),
    })
}

/// A response asking for `search_course_content` once per input.
pub(crate) fn tool_response(inputs: Vec<Value>) -> AppResult<ConverseResponse> {
    Ok(ConverseResponse {
        content: inputs
            .into_iter()
            .enumerate()
            .map(|(i, input)| ContentBlock::ToolUse {
                id: format!("toolu_{}", i),
                name: "search_course_content".to_string(),
                input,
            })
            .collect(),
        stop_reason: StopReason::ToolUse,
        model: "scripted-model".to_string(),
        usage: LlmUsage::default(),
    })
}

pub(crate) fn trigram_retriever() -> Retriever {
    Retriever::in_memory(Arc::new(TrigramProvider::new(384)))
}

pub(crate) fn course(title: &str, lessons: u32) -> CatalogEntry {
    CatalogEntry {
        title: title.to_string(),
        instructor: Some("Instructor".to_string()),
        course_link: Some(format!("https://learn.example.com/{}", slug(title))),
        lessons: (1..=lessons)
            .map(|number| LessonRef {
                number,
                title: format!("Lesson {}", number),
                link: Some(format!(
                    "https://learn.example.com/{}/lesson-{}",
                    slug(title),
                    number
                )),
            })
            .collect(),
    }
}

pub(crate) fn chunk(course: &str, lesson: Option<u32>, index: u32, text: &str) -> ContentChunk {
    ContentChunk {
        text: text.to_string(),
        course_title: course.to_string(),
        lesson_number: lesson,
        chunk_index: index,
    }
}

fn slug(title: &str) -> String {
    title.to_lowercase().replace(' ', "-")
}

/// Two courses with a few lessons each.
pub(crate) fn sample_batch() -> IngestBatch {
    let mcp = "Introduction to Model Context Protocol";
    let rag = "Advanced Retrieval for AI with Chroma";

    IngestBatch {
        catalog: vec![course(mcp, 3), course(rag, 2)],
        chunks: vec![
            chunk(mcp, Some(1), 0, "MCP standardizes how applications provide context to models."),
            chunk(mcp, Some(2), 1, "Servers expose tools, resources and prompts to clients."),
            chunk(mcp, Some(3), 2, "Tool calling lets the model ask the host to run a function."),
            chunk(rag, Some(1), 0, "Chroma stores embeddings and supports nearest neighbour queries."),
            chunk(rag, Some(2), 1, "Query expansion and cross-encoder reranking improve retrieval."),
        ],
    }
}
