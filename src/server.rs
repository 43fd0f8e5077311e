//! HTTP chat server.
//!
//! A thin JSON layer over [`Assistant`]: every route maps to one assistant
//! call. Sessions are keyed by the client-supplied `session_id`; a request
//! without one starts a new session and the generated id is returned.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/chat` | `{session_id?, message}` → `{session_id, reply}` |
//! | `POST` | `/refresh` | Reload content → `{ok, documents}` |
//! | `GET`  | `/documents` | Stored chunks, without embedding vectors |
//! | `DELETE` | `/sessions/{id}` | Forget a session's conversation state |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "message must not be empty" } }
//! ```
//!
//! Error codes: `bad_request` (400), `not_found` (404).
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so the chat widget can
//! be embedded on any site.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tracing::info;
use uuid::Uuid;

use crate::assistant::Assistant;
use crate::config::Config;
use crate::scheduler::spawn_refresh_loop;

#[derive(Clone)]
struct AppState {
    assistant: Arc<Assistant>,
}

/// Build the router. Exposed separately from [`run_server`] so callers can
/// mount it elsewhere or serve it on their own listener.
pub fn router(assistant: Arc<Assistant>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/chat", post(handle_chat))
        .route("/refresh", post(handle_refresh))
        .route("/documents", get(handle_documents))
        .route("/sessions/{id}", delete(handle_end_session))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(AppState { assistant })
}

/// Serve on `[server].bind` until the process is terminated.
///
/// Starts the refresh scheduler first when `[refresh].interval_secs` is
/// non-zero. The assistant is expected to have done its initial load.
pub async fn run_server(config: &Config, assistant: Arc<Assistant>) -> anyhow::Result<()> {
    if config.refresh.interval_secs > 0 {
        spawn_refresh_loop(
            assistant.clone(),
            Duration::from_secs(config.refresh.interval_secs),
        );
    }

    let app = router(assistant);
    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    info!(bind = %config.server.bind, "chat server listening");
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

fn not_found(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not_found".to_string(),
        message: message.into(),
    }
}

// ============ POST /chat ============

#[derive(Deserialize)]
struct ChatRequest {
    #[serde(default)]
    session_id: Option<String>,
    message: String,
}

#[derive(Serialize)]
struct ChatResponse {
    session_id: String,
    reply: String,
}

async fn handle_chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    if req.message.trim().is_empty() {
        return Err(bad_request("message must not be empty"));
    }
    let session_id = req
        .session_id
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let reply = state.assistant.respond(&session_id, &req.message).await;
    Ok(Json(ChatResponse { session_id, reply }))
}

// ============ POST /refresh ============

#[derive(Serialize)]
struct RefreshResponse {
    ok: bool,
    documents: usize,
}

async fn handle_refresh(State(state): State<AppState>) -> Json<RefreshResponse> {
    let ok = state.assistant.refresh().await;
    Json(RefreshResponse {
        ok,
        documents: state.assistant.document_count(),
    })
}

// ============ GET /documents ============

/// A stored chunk as listed over HTTP. Vectors are reduced to a flag.
#[derive(Serialize)]
struct DocumentView {
    id: String,
    text: String,
    source: String,
    date: String,
    embedded: bool,
}

#[derive(Serialize)]
struct DocumentsResponse {
    count: usize,
    documents: Vec<DocumentView>,
}

async fn handle_documents(State(state): State<AppState>) -> Json<DocumentsResponse> {
    let documents: Vec<DocumentView> = state
        .assistant
        .documents()
        .into_iter()
        .map(|c| DocumentView {
            embedded: c.is_embedded(),
            id: c.id,
            text: c.text,
            source: c.source,
            date: c.date,
        })
        .collect();

    Json(DocumentsResponse {
        count: documents.len(),
        documents,
    })
}

// ============ DELETE /sessions/{id} ============

async fn handle_end_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    if state.assistant.end_session(&id) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found(format!("no session with id: {}", id)))
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
