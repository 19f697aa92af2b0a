//! HTTP server for the answer gate.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/ask` | Run a question through the gate |
//! | `GET`  | `/unknowns?teacher_id=<id>` | Read back a teacher's deflection log |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! `POST /ask` answers `200` for every gate outcome; deflections carry the
//! policy fallback text, never an error status. Other failures use the
//! envelope:
//!
//! ```json
//! { "error": { "code": "internal", "message": "Malformed audit log: ..." } }
//! ```
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so classroom web pages
//! served from another origin can call the API.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::config::Config;
use crate::gate::AnswerGate;
use crate::models::{AskRequest, AskResponse, DEFAULT_TEACHER_ID};

/// Shared application state passed to all route handlers via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    gate: Arc<AnswerGate>,
}

impl AppState {
    pub fn new(gate: Arc<AnswerGate>) -> Self {
        Self { gate }
    }
}

/// Starts the HTTP server.
///
/// Loads the policy (a malformed policy aborts here, before binding),
/// wires the gate, binds to `[server].bind`, and serves until the process
/// is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let gate = AnswerGate::from_config(config)?;
    let app = build_router(AppState::new(Arc::new(gate)));

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    tracing::info!(bind = %config.server.bind, "aita listening on http://{}", config.server.bind);
    axum::serve(listener, app).await?;

    Ok(())
}

/// Builds the router with all routes and the CORS layer.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/ask", post(handle_ask))
        .route("/unknowns", get(handle_unknowns))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(state)
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

/// Internal error type that converts into an Axum HTTP response.
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

fn internal(err: anyhow::Error) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal".to_string(),
        message: format!("{:#}", err),
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

// ============ POST /ask ============

/// Handler for `POST /ask`.
///
/// The gate never fails; the outcome's deflection reason stays server-side
/// (audit log and tracing) and only the answer text is returned.
async fn handle_ask(
    State(state): State<AppState>,
    Json(req): Json<AskRequest>,
) -> Json<AskResponse> {
    tracing::debug!(teacher_id = %req.teacher_id, mode = ?req.mode, "ask");
    let outcome = state.gate.ask(&req).await;
    Json(AskResponse {
        answer: outcome.answer,
    })
}

// ============ GET /unknowns ============

#[derive(Deserialize)]
struct UnknownsQuery {
    teacher_id: Option<String>,
}

/// `{"header": [...], "rows": [...]}`, or just `{"rows": []}` before the
/// first deflection for the teacher.
#[derive(Serialize)]
struct UnknownsResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    header: Option<Vec<String>>,
    rows: Vec<Vec<String>>,
}

async fn handle_unknowns(
    State(state): State<AppState>,
    Query(query): Query<UnknownsQuery>,
) -> Result<Json<UnknownsResponse>, AppError> {
    let teacher_id = query
        .teacher_id
        .unwrap_or_else(|| DEFAULT_TEACHER_ID.to_string());

    let audit = state.gate.audit().clone();
    let table = tokio::task::spawn_blocking(move || audit.read(&teacher_id))
        .await
        .map_err(|e| internal(e.into()))?
        .map_err(internal)?;
    let body = match table {
        Some(t) => UnknownsResponse {
            header: Some(t.header),
            rows: t.rows,
        },
        None => UnknownsResponse {
            header: None,
            rows: Vec::new(),
        },
    };
    Ok(Json(body))
}
