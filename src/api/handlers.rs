//! HTTP request handlers

use super::sse::sse_stream;
use super::types::{
    DocQueryRequest, DocQueryResponse, DocsResponse, ErrorResponse, IceBreakersResponse,
    SendMessageRequest, SendMessageResponse, SuccessResponse,
};
use super::AppState;
use crate::oracle::{self, DocSection, FALLBACK_QUESTIONS, ORACLE_UNREACHABLE};
use crate::runtime::{ConsoleError, ConsoleView};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Console projection
        .route("/api/console", get(get_console))
        .route("/api/console/stream", get(stream_console))
        // Console intents
        .route("/api/console/messages", post(send_message))
        .route("/api/console/focus", post(focus))
        .route("/api/console/blur", post(blur))
        .route("/api/console/purge", post(purge))
        // Documentation Oracle
        .route("/api/docs", get(list_docs))
        .route("/api/docs/query", post(query_docs))
        .route("/api/docs/:id/ice-breakers", get(get_ice_breakers))
        // Version
        .route("/version", get(get_version))
        .with_state(state)
}

// ============================================================
// Console Projection
// ============================================================

async fn get_console(State(state): State<AppState>) -> Json<ConsoleView> {
    Json(state.console.view())
}

async fn stream_console(State(state): State<AppState>) -> impl IntoResponse {
    // Subscribe before snapshotting so no change falls between the two
    let broadcast_rx = state.console.subscribe();
    sse_stream(state.console.view(), broadcast_rx)
}

// ============================================================
// Console Intents
// ============================================================

async fn send_message(
    State(state): State<AppState>,
    Json(req): Json<SendMessageRequest>,
) -> Result<Json<SendMessageResponse>, AppError> {
    let request_id = state
        .console
        .send_message(req.text, req.vector, req.images)
        .await?;
    Ok(Json(SendMessageResponse { request_id }))
}

async fn focus(State(state): State<AppState>) -> Result<Json<SuccessResponse>, AppError> {
    state.console.focus().await?;
    Ok(Json(SuccessResponse { success: true }))
}

async fn blur(State(state): State<AppState>) -> Result<Json<SuccessResponse>, AppError> {
    state.console.blur().await?;
    Ok(Json(SuccessResponse { success: true }))
}

async fn purge(State(state): State<AppState>) -> Result<Json<SuccessResponse>, AppError> {
    state.console.purge().await?;
    Ok(Json(SuccessResponse { success: true }))
}

// ============================================================
// Documentation Oracle
// ============================================================

async fn list_docs(State(state): State<AppState>) -> Json<DocsResponse> {
    Json(DocsResponse {
        docs: state.docs.sections().to_vec(),
    })
}

async fn query_docs(
    State(state): State<AppState>,
    Json(req): Json<DocQueryRequest>,
) -> Result<Json<DocQueryResponse>, AppError> {
    let active_doc = req
        .active_doc
        .as_deref()
        .map(|id| find_doc(&state, id))
        .transpose()?;

    let answer = match state.oracle.clone() {
        Some(llm) => {
            oracle::query_docs(llm, &state.docs, &req.query, active_doc, &req.history).await
        }
        None => {
            tracing::warn!("Oracle query without a configured model");
            ORACLE_UNREACHABLE.to_string()
        }
    };
    Ok(Json(DocQueryResponse { answer }))
}

async fn get_ice_breakers(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<IceBreakersResponse>, AppError> {
    let doc = find_doc(&state, &id)?;
    let questions = match state.oracle.clone() {
        Some(llm) => oracle::ice_breakers(llm, doc).await,
        None => FALLBACK_QUESTIONS.iter().map(ToString::to_string).collect(),
    };
    Ok(Json(IceBreakersResponse { questions }))
}

fn find_doc<'a>(state: &'a AppState, id: &str) -> Result<&'a DocSection, AppError> {
    state
        .docs
        .get(id)
        .ok_or_else(|| AppError::NotFound(format!("Unknown doc: {id}")))
}

// ============================================================
// Version
// ============================================================

async fn get_version() -> &'static str {
    concat!("vra-console ", env!("CARGO_PKG_VERSION"))
}

// ============================================================
// Error Handling
// ============================================================

#[derive(Debug)]
enum AppError {
    BadRequest(String),
    NotFound(String),
    /// Intent not accepted in the current phase
    Conflict(String),
    Unavailable(String),
}

impl From<ConsoleError> for AppError {
    fn from(err: ConsoleError) -> Self {
        match err {
            ConsoleError::Busy(_) => AppError::Conflict(err.to_string()),
            ConsoleError::EmptyMessage => AppError::BadRequest(err.to_string()),
            ConsoleError::Stopped => AppError::Unavailable(err.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}
