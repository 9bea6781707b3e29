//! Query entry point: history in, answer and sources out.

use crate::memory::SessionStore;
use crate::retriever::Retriever;
use crate::tools::{ToolInvoker, ToolRegistry};
use crate::types::{CatalogSummary, QueryResponse};
use std::sync::Arc;
use syllabus_core::{AppConfig, AppResult};
use syllabus_llm::{create_client, GenerationClient};
use syllabus_prompt::{load_prompt_or_builtin, DEFAULT_PROMPT_ID};

/// Answers questions about course materials for many sessions.
///
/// Safe to share between concurrent queries: each query gets its own
/// [`ToolInvoker`], and the session store is internally locked.
pub struct QueryOrchestrator {
    retriever: Arc<Retriever>,
    generator: GenerationClient,
    sessions: Arc<SessionStore>,
    tools: Arc<ToolRegistry>,
}

impl QueryOrchestrator {
    /// Wire an orchestrator with the course search tool registered.
    pub fn new(
        retriever: Arc<Retriever>,
        generator: GenerationClient,
        sessions: Arc<SessionStore>,
    ) -> Self {
        let tools = Arc::new(ToolRegistry::with_course_search(retriever.clone()));
        Self::with_tools(retriever, generator, sessions, tools)
    }

    pub fn with_tools(
        retriever: Arc<Retriever>,
        generator: GenerationClient,
        sessions: Arc<SessionStore>,
        tools: Arc<ToolRegistry>,
    ) -> Self {
        Self {
            retriever,
            generator,
            sessions,
            tools,
        }
    }

    /// Build the LLM client, prompt, retriever and session store from config.
    pub fn from_config(config: &AppConfig) -> AppResult<Self> {
        let api_key = config.resolve_api_key(&config.provider);
        let client = create_client(
            &config.provider,
            config.endpoint.as_deref(),
            api_key.as_deref(),
        )?;

        let prompt = load_prompt_or_builtin(&config.workspace, DEFAULT_PROMPT_ID)?;
        let generator = GenerationClient::new(client, config.model.clone())
            .with_settings(&config.generation)
            .with_prompt(prompt);

        let retriever = Arc::new(Retriever::from_config(config)?);
        let sessions = Arc::new(SessionStore::new(config.retrieval.max_history));

        tracing::info!(
            provider = %config.provider,
            model = %config.model,
            "Query orchestrator ready"
        );

        Ok(Self::new(retriever, generator, sessions))
    }

    pub fn retriever(&self) -> &Arc<Retriever> {
        &self.retriever
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    /// Answer `query` within a session.
    ///
    /// Without `session_id` a new session is created. An unknown id is
    /// adopted as-is. The exchange is recorded only when generation
    /// succeeds; provider failures propagate and leave history untouched.
    #[tracing::instrument(skip(self, query), fields(session = tracing::field::Empty))]
    pub async fn query(&self, query: &str, session_id: Option<&str>) -> AppResult<QueryResponse> {
        let session_id = match session_id {
            Some(id) => id.to_string(),
            None => self.sessions.create_session(),
        };
        tracing::Span::current().record("session", session_id.as_str());

        let history = self.sessions.get_history(&session_id);
        let prompt = format!("Answer this question about course materials: {}", query);

        let mut invoker = ToolInvoker::new(self.tools.clone());
        let answer = self
            .generator
            .generate(&prompt, history.as_deref(), Some(&mut invoker))
            .await?;

        let sources = invoker.take_sources();
        self.sessions.add_exchange(&session_id, query, &answer);

        tracing::info!(sources = sources.len(), "Answered query");

        Ok(QueryResponse {
            answer,
            sources,
            session_id,
        })
    }

    /// Course count and titles from the catalog index.
    pub fn catalog_summary(&self) -> AppResult<CatalogSummary> {
        self.retriever.catalog_summary()
    }
}
