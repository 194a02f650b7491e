//! The backend behind the HTTP handlers.
//!
//! `RuntimeBackend` wires a turn together from its request: the chat client
//! and feedback store are built fresh from the request's settings, never
//! cached across turns. The only process-wide state is the token ledger.

use std::sync::Arc;

use async_trait::async_trait;

use statecraft_agents::{ChatOutcome, Orchestrator, TurnRequest, DEFAULT_BUDGET};
use statecraft_core::error::{Error, Result};
use statecraft_core::setting::Setting;
use statecraft_feedback::{Feedback, FeedbackStore};
use statecraft_providers::{OpenAiChatClient, OpenAiEmbeddingClient};
use statecraft_stats::TokenLedger;
use statecraft_tools::{build_tool_set, RequestToolSpec};
use statecraft_vectorstore::HttpVectorStore;

/// Everything the HTTP surface needs from the runtime.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn chat(
        &self,
        request: TurnRequest,
        request_tools: Vec<RequestToolSpec>,
    ) -> Result<ChatOutcome>;

    async fn learn(&self, settings: &Setting, feedbacks: Vec<Feedback>) -> Result<Vec<String>>;

    async fn list_feedbacks(
        &self,
        agent_name: &str,
        vector_db_url: &str,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Feedback>>;

    async fn clear_feedbacks(&self, agent_name: &str, vector_db_url: &str) -> Result<()>;

    async fn drop_collection(&self, agent_name: &str, vector_db_url: &str) -> Result<()>;
}

/// The production backend.
pub struct RuntimeBackend {
    ledger: Arc<TokenLedger>,
    budget: u64,
}

impl RuntimeBackend {
    pub fn new(ledger: Arc<TokenLedger>) -> Self {
        Self {
            ledger,
            budget: DEFAULT_BUDGET,
        }
    }

    pub fn with_budget(mut self, budget: u64) -> Self {
        self.budget = budget.max(1);
        self
    }

    fn feedback_store(&self, setting: &Setting) -> Result<Option<FeedbackStore>> {
        if !setting.feedback_enabled() {
            return Ok(None);
        }
        let index = HttpVectorStore::new(&setting.vector_db_url)?;
        let embedder = OpenAiEmbeddingClient::new(&setting.embedding_model)?;
        Ok(Some(FeedbackStore::new(
            Arc::new(index),
            Arc::new(embedder),
        )))
    }

    fn bare_store(vector_db_url: &str) -> Result<FeedbackStore> {
        if vector_db_url.is_empty() {
            return Err(Error::config("vector_db_url is required"));
        }
        let index = HttpVectorStore::new(vector_db_url)?;
        Ok(FeedbackStore::without_embedder(Arc::new(index)))
    }
}

#[async_trait]
impl ChatBackend for RuntimeBackend {
    async fn chat(
        &self,
        request: TurnRequest,
        request_tools: Vec<RequestToolSpec>,
    ) -> Result<ChatOutcome> {
        request.setting.validate()?;

        let tools = build_tool_set(&request_tools)?;
        let completer = Arc::new(OpenAiChatClient::new(&request.setting.chat_model)?);
        let feedback = self.feedback_store(&request.setting)?;

        let orchestrator = Orchestrator::new(Arc::clone(&self.ledger)).with_budget(self.budget);
        Ok(orchestrator
            .run_turn(completer, feedback.as_ref(), request, &tools)
            .await)
    }

    async fn learn(&self, settings: &Setting, feedbacks: Vec<Feedback>) -> Result<Vec<String>> {
        if settings.agent_name.trim().is_empty() {
            return Err(Error::config("agent_name must be non-empty"));
        }
        if !settings.feedback_enabled() {
            return Err(Error::config("vector_db_url is required to learn"));
        }

        let store = self
            .feedback_store(settings)?
            .ok_or_else(|| Error::config("vector_db_url is required to learn"))?;
        store.add(&settings.agent_name, &feedbacks).await
    }

    async fn list_feedbacks(
        &self,
        agent_name: &str,
        vector_db_url: &str,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Feedback>> {
        Self::bare_store(vector_db_url)?
            .list(agent_name, offset, limit)
            .await
    }

    async fn clear_feedbacks(&self, agent_name: &str, vector_db_url: &str) -> Result<()> {
        Self::bare_store(vector_db_url)?.clear(agent_name).await
    }

    async fn drop_collection(&self, agent_name: &str, vector_db_url: &str) -> Result<()> {
        Self::bare_store(vector_db_url)?
            .drop_collection(agent_name)
            .await
    }
}
