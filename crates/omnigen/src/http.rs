// SPDX-FileCopyrightText: 2026 Omnigen Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP API for the Omnigen service.
//!
//! Routes, request/response bodies, and the error-to-status mapping.
//! Handlers are thin: every operation delegates to the orchestrator and
//! serializes what it returns.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;

use omnigen_core::{
    ChatMessage, GenerationOptions, GenerationRequest, HealthReport, HealthState, Modality,
    OmnigenError, Page, TaskFilter, TaskState,
};
use omnigen_orchestrator::Orchestrator;
use omnigen_registry::CatalogEntry;

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    /// Process start time for uptime reporting.
    pub start_time: Instant,
}

/// Builds the API router over the given state.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(get_liveness))
        .route("/v1/health", get(get_health))
        .route("/v1/models", get(get_models))
        .route("/v1/generations", post(post_generations))
        .route("/v1/tasks", get(get_tasks))
        .route("/v1/tasks/{id}", get(get_task))
        .route("/v1/tasks/{id}/refresh", post(post_task_refresh))
        .route("/v1/tasks/{id}/cancel", post(post_task_cancel))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Request body for POST /v1/generations.
#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    /// Registry name of the provider to use.
    pub provider: String,
    /// Model identifier, exactly as priced by the provider.
    pub model: String,
    /// The prompt (for chat models, the final user turn).
    pub prompt: String,
    #[serde(default)]
    pub system_prompt: Option<String>,
    /// Prior conversation turns for chat models.
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub options: GenerationOptions,
}

/// Response body for GET /v1/health.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// `ok`, or `degraded` when any provider is down.
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    /// Per-provider health reports, keyed by registry name.
    pub providers: BTreeMap<String, HealthReport>,
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error description.
    pub error: String,
}

/// Query parameters for GET /v1/tasks/{id}.
#[derive(Debug, Default, Deserialize)]
pub struct StatusQuery {
    /// Probe the provider for a fresh status before answering.
    #[serde(default)]
    pub refresh: bool,
}

/// Query parameters for GET /v1/tasks.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub provider: Option<String>,
    pub status: Option<TaskState>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

/// Query parameters for GET /v1/models.
#[derive(Debug, Default, Deserialize)]
pub struct ModelsQuery {
    pub modality: Option<Modality>,
}

/// Maps an orchestrator error onto an HTTP status and error body.
fn error_response(err: OmnigenError) -> Response {
    let status = match &err {
        OmnigenError::TaskNotFound { .. } | OmnigenError::ProviderNotFound { .. } => {
            StatusCode::NOT_FOUND
        }
        OmnigenError::UnknownModel { .. } | OmnigenError::MissingCredential { .. } => {
            StatusCode::BAD_REQUEST
        }
        OmnigenError::InvalidTransition { .. } => StatusCode::CONFLICT,
        OmnigenError::Config(_) | OmnigenError::Store { .. } | OmnigenError::Internal(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
        }),
    )
        .into_response()
}

/// GET /health
///
/// Unauthenticated liveness probe; answers without touching providers.
async fn get_liveness() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// GET /v1/health
///
/// Health-checks every registered provider and reports uptime.
async fn get_health(State(state): State<AppState>) -> Json<HealthResponse> {
    let providers = state.orchestrator.registry().health_check_all().await;
    let status = if providers
        .values()
        .any(|report| report.status == HealthState::Down)
    {
        "degraded"
    } else {
        "ok"
    };
    Json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        providers,
    })
}

/// GET /v1/models
///
/// The provider catalog with per-model prices, optionally filtered by
/// modality.
async fn get_models(
    State(state): State<AppState>,
    Query(query): Query<ModelsQuery>,
) -> Json<Vec<CatalogEntry>> {
    Json(state.orchestrator.registry().catalog(query.modality, true))
}

/// POST /v1/generations
///
/// Submits a generation request. The returned record is terminal for
/// synchronous providers and `processing` for task-based ones.
async fn post_generations(
    State(state): State<AppState>,
    Json(body): Json<SubmitRequest>,
) -> Response {
    let mut request = GenerationRequest::new(body.model, body.prompt);
    request.system_prompt = body.system_prompt;
    request.messages = body.messages;
    request.options = body.options;

    match state.orchestrator.submit(&body.provider, request).await {
        Ok(record) => (StatusCode::OK, Json(record)).into_response(),
        Err(err) => error_response(err),
    }
}

/// GET /v1/tasks
async fn get_tasks(State(state): State<AppState>, Query(query): Query<ListQuery>) -> Response {
    let filter = TaskFilter {
        provider: query.provider,
        status: query.status,
    };
    let mut page = Page::default();
    if let Some(limit) = query.limit {
        page.limit = limit;
    }
    if let Some(offset) = query.offset {
        page.offset = offset;
    }

    match state.orchestrator.list_tasks(&filter, &page).await {
        Ok(tasks) => (StatusCode::OK, Json(tasks)).into_response(),
        Err(err) => error_response(err),
    }
}

/// GET /v1/tasks/{id}
///
/// The task record and its audit trail; `?refresh=true` probes the
/// provider first.
async fn get_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<StatusQuery>,
) -> Response {
    match state.orchestrator.get_status(&id, query.refresh).await {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(err) => error_response(err),
    }
}

/// POST /v1/tasks/{id}/refresh
async fn post_task_refresh(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    match state.orchestrator.refresh(&id).await {
        Ok(record) => (StatusCode::OK, Json(record)).into_response(),
        Err(err) => error_response(err),
    }
}

/// POST /v1/tasks/{id}/cancel
async fn post_task_cancel(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    match state.orchestrator.cancel(&id).await {
        Ok(record) => (StatusCode::OK, Json(record)).into_response(),
        Err(err) => error_response(err),
    }
}
