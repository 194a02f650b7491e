//! Route handlers and wire DTOs.
//!
//! Request bodies are parsed by hand from JSON so malformed input (unknown
//! ChatML roles included) answers 400 rather than the framework's default
//! rejection.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{delete, get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::warn;

use statecraft_agents::{ResultType, TurnRequest};
use statecraft_core::chatml::UserInput;
use statecraft_core::error::{Error, VectorStoreError};
use statecraft_core::memory::Memory;
use statecraft_core::setting::Setting;
use statecraft_feedback::Feedback;
use statecraft_tools::RequestToolSpec;

use crate::service::ChatBackend;

type Backend = Arc<dyn ChatBackend>;

/// Build the router with all gateway routes.
pub fn build_router(backend: Backend) -> Router {
    Router::new()
        .route("/chat", post(chat_handler))
        .route("/learn", post(learn_handler))
        .route("/feedbacks", get(list_feedbacks_handler))
        .route("/feedbacks", delete(clear_feedbacks_handler))
        .route("/collections/{agent_name}", delete(drop_collection_handler))
        .route("/health", get(health_handler))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(backend)
}

// ── Request / Response types ──────────────────────────────────────────────

#[derive(Deserialize)]
struct ChatRequest {
    user_message: UserInput,
    #[serde(default)]
    edited_last_response: Option<String>,
    #[serde(default)]
    recall_last_user_message: bool,
    settings: Setting,
    #[serde(default)]
    memory: Memory,
    #[serde(default)]
    request_tools: Vec<RequestToolSpec>,
}

#[derive(Serialize)]
struct ChatResponse {
    response: Memory,
    memory: Memory,
    result_type: ResultType,
    llm_calling_times: u64,
    total_input_token: u64,
    total_output_token: u64,
}

#[derive(Deserialize)]
struct LearnRequest {
    settings: Setting,
    feedbacks: Vec<Feedback>,
}

#[derive(Serialize)]
struct LearnResponse {
    status: &'static str,
    data: Vec<String>,
}

#[derive(Deserialize)]
struct FeedbackParams {
    agent_name: String,
    vector_db_url: String,
    #[serde(default)]
    offset: usize,
    #[serde(default = "default_limit")]
    limit: usize,
}

fn default_limit() -> usize {
    100
}

#[derive(Deserialize)]
struct CollectionParams {
    vector_db_url: String,
}

// ── Error mapping ─────────────────────────────────────────────────────────

struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        Self(e)
    }
}

impl ApiError {
    fn status_and_message(&self) -> (StatusCode, String) {
        let status = match &self.0 {
            Error::Config { .. } => StatusCode::BAD_REQUEST,
            Error::VectorStore(VectorStoreError::PageTooLarge { .. }) => StatusCode::BAD_REQUEST,
            Error::VectorStore(VectorStoreError::DimensionConflict { .. }) => StatusCode::CONFLICT,
            Error::VectorStore(_) | Error::Provider(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, self.0.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();
        warn!(status = %status, error = %message, "Request failed");
        (status, Json(json!({ "error": message }))).into_response()
    }
}

fn bad_request(message: impl std::fmt::Display) -> ApiError {
    ApiError(Error::config(message.to_string()))
}

// ── Handlers ──────────────────────────────────────────────────────────────

async fn chat_handler(
    State(backend): State<Backend>,
    Json(raw): Json<Value>,
) -> Result<Json<ChatResponse>, ApiError> {
    let request: ChatRequest =
        serde_json::from_value(raw).map_err(|e| bad_request(format!("invalid request: {e}")))?;

    let outcome = backend
        .chat(
            TurnRequest {
                user_message: request.user_message,
                edited_last_response: request.edited_last_response,
                recall_last_user_message: request.recall_last_user_message,
                setting: request.settings,
                memory: request.memory,
            },
            request.request_tools,
        )
        .await?;

    Ok(Json(ChatResponse {
        response: outcome.memory.clone(),
        memory: outcome.memory,
        result_type: outcome.result_type,
        llm_calling_times: outcome.llm_calls,
        total_input_token: outcome.total_input_tokens,
        total_output_token: outcome.total_output_tokens,
    }))
}

async fn learn_handler(
    State(backend): State<Backend>,
    Json(raw): Json<Value>,
) -> Response {
    let request: LearnRequest = match serde_json::from_value(raw) {
        Ok(request) => request,
        Err(e) => return bad_request(format!("invalid request: {e}")).into_response(),
    };

    // Learning fails loudly, but still in the documented response shape
    match backend.learn(&request.settings, request.feedbacks).await {
        Ok(ids) => Json(LearnResponse {
            status: "Success",
            data: ids,
        })
        .into_response(),
        Err(e) => {
            let status = ApiError(e).status_and_message();
            (
                status.0,
                Json(LearnResponse {
                    status: "Failed",
                    data: vec![status.1],
                }),
            )
                .into_response()
        }
    }
}

async fn list_feedbacks_handler(
    State(backend): State<Backend>,
    Query(params): Query<FeedbackParams>,
) -> Result<Json<Vec<Feedback>>, ApiError> {
    let feedbacks = backend
        .list_feedbacks(
            &params.agent_name,
            &params.vector_db_url,
            params.offset,
            params.limit,
        )
        .await?;
    Ok(Json(feedbacks))
}

async fn clear_feedbacks_handler(
    State(backend): State<Backend>,
    Query(params): Query<FeedbackParams>,
) -> Result<StatusCode, ApiError> {
    backend
        .clear_feedbacks(&params.agent_name, &params.vector_db_url)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn drop_collection_handler(
    State(backend): State<Backend>,
    Path(agent_name): Path<String>,
    Query(params): Query<CollectionParams>,
) -> Result<StatusCode, ApiError> {
    backend
        .drop_collection(&agent_name, &params.vector_db_url)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn health_handler() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
