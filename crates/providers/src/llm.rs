//! The per-turn LLM gateway.
//!
//! Wraps a [`ChatCompleter`] with the three ask modes the agents need and
//! with session-keyed token accounting. A gateway is constructed fresh for
//! every turn with the turn's session id; every call it makes is recorded
//! under that id, so the totals the orchestrator reads at the end of the
//! turn are exactly the calls this gateway made.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use statecraft_core::chatml::ChatMessage;
use statecraft_core::error::ProviderError;
use statecraft_core::provider::{ChatCompleter, Completion, CompletionRequest};
use statecraft_core::setting::ChatModelConfig;
use statecraft_core::tool::ToolDefinition;
use statecraft_stats::TokenLedger;

/// Floor applied when the caller leaves `max_completion_tokens` unset.
const DEFAULT_MAX_COMPLETION_TOKENS: u32 = 1024;

/// Rate-limit responses are retried at most this many times.
const MAX_RATE_LIMIT_RETRIES: u32 = 2;

/// Transport failures are retried once.
const MAX_TRANSPORT_RETRIES: u32 = 1;

pub struct LlmGateway {
    completer: Arc<dyn ChatCompleter>,
    ledger: Arc<TokenLedger>,
    session_id: String,
    temperature: f32,
    top_p: f32,
    max_completion_tokens: u32,
}

impl LlmGateway {
    pub fn new(
        completer: Arc<dyn ChatCompleter>,
        ledger: Arc<TokenLedger>,
        session_id: impl Into<String>,
        config: &ChatModelConfig,
    ) -> Self {
        Self {
            completer,
            ledger,
            session_id: session_id.into(),
            temperature: config.temperature,
            top_p: config.top_p,
            max_completion_tokens: DEFAULT_MAX_COMPLETION_TOKENS,
        }
    }

    pub fn with_max_completion_tokens(mut self, max: u32) -> Self {
        self.max_completion_tokens = max.max(1);
        self
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    fn request(&self, messages: Vec<ChatMessage>) -> CompletionRequest {
        CompletionRequest {
            messages,
            tools: Vec::new(),
            temperature: self.temperature,
            top_p: self.top_p,
            max_completion_tokens: self.max_completion_tokens,
            response_schema: None,
        }
    }

    /// Send a request, retrying transient failures, and record usage.
    async fn send(&self, request: CompletionRequest) -> Result<Completion, ProviderError> {
        let mut rate_limit_retries = 0;
        let mut transport_retries = 0;

        loop {
            match self.completer.complete(request.clone()).await {
                Ok(completion) => {
                    let usage = completion.usage.unwrap_or_default();
                    self.ledger
                        .add(&self.session_id, usage.input_tokens, usage.output_tokens);
                    return Ok(completion);
                }
                Err(ProviderError::RateLimited { retry_after_secs })
                    if rate_limit_retries < MAX_RATE_LIMIT_RETRIES =>
                {
                    rate_limit_retries += 1;
                    let delay = backoff(Duration::from_secs(retry_after_secs.min(10)));
                    warn!(retry = rate_limit_retries, ?delay, "Rate limited, backing off");
                    tokio::time::sleep(delay).await;
                }
                Err(err @ (ProviderError::Network(_) | ProviderError::Timeout(_)))
                    if transport_retries < MAX_TRANSPORT_RETRIES =>
                {
                    transport_retries += 1;
                    let delay = backoff(Duration::from_millis(500));
                    warn!(error = %err, ?delay, "Transport failure, retrying");
                    tokio::time::sleep(delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Plain completion: one system prompt, one user prompt, text back.
    pub async fn ask(&self, system: &str, user: &str) -> Result<String, ProviderError> {
        let completion = self
            .send(self.request(vec![
                ChatMessage::system(system),
                ChatMessage::user(user),
            ]))
            .await?;
        Ok(completion.content.unwrap_or_default())
    }

    /// Tool-calling completion: returns the raw assistant message with any
    /// textual content and the tool-call list.
    pub async fn ask_with_tools(
        &self,
        messages: Vec<ChatMessage>,
        tools: Vec<ToolDefinition>,
    ) -> Result<Completion, ProviderError> {
        let mut request = self.request(messages);
        request.tools = tools;
        self.send(request).await
    }

    /// JSON completion conforming to `schema`, with one repair attempt when
    /// the first reply does not parse.
    pub async fn ask_structured<T: DeserializeOwned>(
        &self,
        messages: Vec<ChatMessage>,
        schema: Value,
    ) -> Result<T, ProviderError> {
        let mut request = self.request(messages.clone());
        request.response_schema = Some(schema.clone());

        let completion = self.send(request).await?;
        let text = completion.content.unwrap_or_default();

        let parse_error = match serde_json::from_str::<T>(&text) {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };

        debug!(error = %parse_error, "Structured reply did not parse, re-asking once");

        let mut repair_messages = messages;
        repair_messages.push(ChatMessage::assistant(&text));
        repair_messages.push(ChatMessage::user(format!(
            "The previous reply was not valid JSON for the required schema ({parse_error}). \
             Respond again with only a JSON object matching the schema."
        )));

        let mut repair = self.request(repair_messages);
        repair.response_schema = Some(schema);

        let second = self.send(repair).await?;
        let text = second.content.unwrap_or_default();
        serde_json::from_str::<T>(&text)
            .map_err(|e| ProviderError::BadResponse(format!("structured output: {e}")))
    }
}

fn backoff(base: Duration) -> Duration {
    let jitter = rand::thread_rng().gen_range(0..250);
    base + Duration::from_millis(jitter)
}
