//! End-to-end queries through the orchestrator with a scripted provider.

use super::{sample_batch, text_response, tool_response, trigram_retriever, ScriptedClient};
use crate::memory::SessionStore;
use crate::orchestrator::QueryOrchestrator;
use serde_json::json;
use std::sync::Arc;
use syllabus_core::AppError;
use syllabus_llm::{ContentBlock, GenerationClient, Role};

async fn orchestrator(client: Arc<ScriptedClient>) -> QueryOrchestrator {
    let retriever = Arc::new(trigram_retriever());
    retriever.ingest(&sample_batch()).await.unwrap();

    let generator = GenerationClient::new(client, "scripted-model");
    QueryOrchestrator::new(retriever, generator, Arc::new(SessionStore::default()))
}

#[tokio::test]
async fn test_tool_round_trip_uses_three_messages() {
    let client = ScriptedClient::new(vec![
        tool_response(vec![json!({"query": "tool calling"})]),
        text_response("Tool calling lets the model request a function call."),
    ]);
    let orchestrator = orchestrator(client.clone()).await;

    let response = orchestrator.query("What is tool calling?", None).await.unwrap();

    assert_eq!(response.answer, "Tool calling lets the model request a function call.");
    assert_eq!(response.session_id, "session_1");
    assert_eq!(response.sources.len(), 5);

    let requests = client.requests();
    assert_eq!(requests.len(), 2);

    let first = &requests[0];
    assert_eq!(first.messages.len(), 1);
    assert_eq!(
        first.messages[0].content,
        vec![ContentBlock::text(
            "Answer this question about course materials: What is tool calling?"
        )]
    );
    let tools = first.tools.as_ref().unwrap();
    assert_eq!(tools.len(), 1);
    assert_eq!(tools[0].name, "search_course_content");

    let second = &requests[1];
    assert!(second.tools.is_none());
    assert_eq!(second.messages.len(), 3);
    assert_eq!(second.messages[0], first.messages[0]);
    assert_eq!(second.messages[1].role, Role::Assistant);
    assert_eq!(second.messages[2].role, Role::User);

    match &second.messages[2].content[..] {
        [ContentBlock::ToolResult {
            tool_use_id,
            content,
            is_error,
        }] => {
            assert_eq!(tool_use_id, "toolu_0");
            assert!(!is_error);
            assert!(content.contains("[Introduction to Model Context Protocol - Lesson 3]"));
        }
        other => panic!("unexpected tool result content: {:?}", other),
    }
}

#[tokio::test]
async fn test_only_first_of_many_tool_calls_runs() {
    let client = ScriptedClient::new(vec![
        tool_response(vec![
            json!({
                "query": "tool calling",
                "course_name": "Introduction to Model Context Protocol",
                "lesson_number": 3
            }),
            json!({"query": "chroma"}),
            json!({"query": "reranking"}),
        ]),
        text_response("Answer."),
    ]);
    let orchestrator = orchestrator(client.clone()).await;

    let response = orchestrator.query("Tell me everything", None).await.unwrap();

    // Sources come from the single executed search
    assert_eq!(response.sources.len(), 1);
    assert_eq!(response.sources[0].text, "Introduction to Model Context Protocol - Lesson 3");
    assert_eq!(
        response.sources[0].link.as_deref(),
        Some("https://learn.example.com/introduction-to-model-context-protocol/lesson-3")
    );

    let requests = client.requests();
    assert_eq!(requests.len(), 2);
    let results = &requests[1].messages[2].content;
    assert_eq!(results.len(), 3);

    let errors: Vec<bool> = results
        .iter()
        .map(|block| match block {
            ContentBlock::ToolResult { is_error, .. } => *is_error,
            other => panic!("unexpected block: {:?}", other),
        })
        .collect();
    assert_eq!(errors, vec![false, true, true]);
}

#[tokio::test]
async fn test_history_injected_oldest_first() {
    let client = ScriptedClient::new(vec![text_response("Third answer.")]);
    let orchestrator = orchestrator(client.clone()).await;

    orchestrator
        .sessions()
        .add_exchange("s1", "First question", "First answer.");
    orchestrator
        .sessions()
        .add_exchange("s1", "Second question", "Second answer.");

    let response = orchestrator.query("Third question", Some("s1")).await.unwrap();
    assert_eq!(response.session_id, "s1");

    let system = client.requests()[0].system.clone().unwrap();
    assert!(system.contains(
        "User: First question\nAssistant: First answer.\nUser: Second question\nAssistant: Second answer."
    ));
    assert!(!system.contains("Third question"));

    let history = orchestrator.sessions().get_history("s1").unwrap();
    assert_eq!(
        history,
        "User: Second question\nAssistant: Second answer.\nUser: Third question\nAssistant: Third answer."
    );
}

#[tokio::test]
async fn test_provider_failure_appends_nothing() {
    let client = ScriptedClient::new(vec![Err(AppError::GenerationProvider(
        "connection refused".to_string(),
    ))]);
    let orchestrator = orchestrator(client.clone()).await;
    orchestrator.sessions().add_exchange("s1", "Earlier", "Reply.");

    let err = orchestrator.query("What is MCP?", Some("s1")).await.unwrap_err();

    assert!(err.is_provider_failure());
    assert_eq!(client.requests().len(), 1);
    assert_eq!(orchestrator.sessions().exchanges("s1").len(), 1);
}

#[tokio::test]
async fn test_sources_do_not_leak_between_queries() {
    let client = ScriptedClient::new(vec![
        tool_response(vec![json!({"query": "chroma", "lesson_number": 1})]),
        text_response("Chroma stores embeddings."),
        text_response("Hello!"),
    ]);
    let orchestrator = orchestrator(client).await;

    let first = orchestrator.query("What is Chroma?", None).await.unwrap();
    assert!(!first.sources.is_empty());

    let second = orchestrator
        .query("Hi there", Some(&first.session_id))
        .await
        .unwrap();
    assert!(second.sources.is_empty());
    assert_eq!(second.session_id, first.session_id);
    assert_eq!(orchestrator.sessions().exchanges(&first.session_id).len(), 2);
}

#[tokio::test]
async fn test_exchange_stores_raw_query() {
    let client = ScriptedClient::new(vec![text_response("Yes.")]);
    let orchestrator = orchestrator(client).await;

    let response = orchestrator.query("Is MCP open?", None).await.unwrap();
    let exchanges = orchestrator.sessions().exchanges(&response.session_id);

    assert_eq!(exchanges.len(), 1);
    assert_eq!(exchanges[0].user, "Is MCP open?");
    assert_eq!(exchanges[0].assistant, "Yes.");
}

#[tokio::test]
async fn test_catalog_summary_passes_through() {
    let orchestrator = orchestrator(ScriptedClient::new(Vec::new())).await;
    let summary = orchestrator.catalog_summary().unwrap();

    assert_eq!(summary.total_courses, 2);
    assert_eq!(
        summary.titles,
        vec![
            "Advanced Retrieval for AI with Chroma",
            "Introduction to Model Context Protocol"
        ]
    );
}
