//! Axum transport over the orchestrator.
//!
//! Routes:
//!
//! - `POST /workflows/{name}` starts a thread (optionally with a caller-chosen
//!   thread id) and returns the result envelope
//! - `POST /workflows/{name}/{thread_id}` feeds a message into an existing
//!   thread
//! - `GET  /workflows/{name}/{thread_id}` returns the latest persisted state
//! - `GET  /workflows/available` lists registered workflow names
//! - `GET  /health` liveness probe with uptime
//!
//! Failures map from [`ErrorKind`] onto status codes; error bodies carry
//! `{message, description, canRetry}` so callers can distinguish retryable
//! outages from terminal failures.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

use crate::error::ErrorKind;
use crate::message::Message;
use crate::orchestrator::{Envelope, Orchestrator};

#[derive(Clone)]
struct AppState {
    orchestrator: Arc<Orchestrator>,
    started_at: Instant,
}

/// Message payload accepted by the POST routes: `{content, type, role}`,
/// with `type` and `role` defaulting like an ordinary user message.
#[derive(Debug, Deserialize)]
pub struct MessageBody {
    pub content: String,
    #[serde(rename = "type", default = "MessageBody::default_kind")]
    pub kind: String,
    #[serde(default = "MessageBody::default_role")]
    pub role: String,
}

impl MessageBody {
    fn default_kind() -> String {
        Message::DEFAULT_KIND.to_string()
    }

    fn default_role() -> String {
        Message::USER.to_string()
    }

    fn into_message(self) -> Message {
        Message::new(&self.role, &self.kind, &self.content)
    }
}

/// Body for starting a workflow thread. A caller-chosen `thread_id` is an
/// optional extension; omitted ids are minted server-side.
#[derive(Debug, Deserialize)]
pub struct StartRequest {
    #[serde(flatten)]
    pub message: MessageBody,
    #[serde(default)]
    pub thread_id: Option<String>,
}

/// Error payload for non-2xx responses.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub message: String,
    pub description: String,
    #[serde(rename = "canRetry")]
    pub can_retry: bool,
}

#[derive(Debug, Serialize)]
struct HealthBody {
    status: &'static str,
    timestamp: String,
    uptime: u64,
}

#[derive(Debug, Serialize)]
struct AvailableBody {
    status: &'static str,
    workflows: Vec<String>,
    message: &'static str,
}

/// Build the service router around a fully registered orchestrator.
#[must_use]
pub fn router(orchestrator: Arc<Orchestrator>) -> Router {
    let state = AppState {
        orchestrator,
        started_at: Instant::now(),
    };
    Router::new()
        .route("/health", get(health))
        .route("/workflows/available", get(available))
        .route("/workflows/{name}", post(start_workflow))
        .route("/workflows/{name}/{thread_id}", post(chat).get(get_state))
        .with_state(state)
}

/// Bind and serve until ctrl-c.
pub async fn serve(router: Router, port: u16) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    info!(port, "listening");
    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutting down");
        })
        .await
}

async fn health(State(state): State<AppState>) -> Json<HealthBody> {
    Json(HealthBody {
        status: "UP",
        timestamp: Utc::now().to_rfc3339(),
        uptime: state.started_at.elapsed().as_secs(),
    })
}

async fn available(State(state): State<AppState>) -> Json<AvailableBody> {
    Json(AvailableBody {
        status: "success",
        workflows: state.orchestrator.available_workflows(),
        message: "Available workflows retrieved successfully",
    })
}

async fn start_workflow(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(body): Json<StartRequest>,
) -> Response {
    if let Some(rejection) = reject_empty_content(&body.message.content) {
        return rejection;
    }
    let envelope = state
        .orchestrator
        .start_workflow(&name, body.message.into_message(), body.thread_id)
        .await;
    envelope_response(envelope)
}

async fn chat(
    State(state): State<AppState>,
    Path((name, thread_id)): Path<(String, String)>,
    Json(body): Json<MessageBody>,
) -> Response {
    if let Some(rejection) = reject_blank_thread_id(&thread_id) {
        return rejection;
    }
    if let Some(rejection) = reject_empty_content(&body.content) {
        return rejection;
    }
    let envelope = state
        .orchestrator
        .chat(&name, &thread_id, body.into_message())
        .await;
    envelope_response(envelope)
}

async fn get_state(
    State(state): State<AppState>,
    Path((name, thread_id)): Path<(String, String)>,
) -> Response {
    if let Some(rejection) = reject_blank_thread_id(&thread_id) {
        return rejection;
    }
    let envelope = state.orchestrator.get_workflow_state(&name, &thread_id).await;
    envelope_response(envelope)
}

fn reject_empty_content(content: &str) -> Option<Response> {
    if content.trim().is_empty() {
        return Some(bad_request(
            "invalid input: empty message content",
            "The content field must be non-empty.",
        ));
    }
    None
}

fn reject_blank_thread_id(thread_id: &str) -> Option<Response> {
    if thread_id.trim().is_empty() {
        return Some(bad_request(
            "invalid input: blank thread id",
            "The thread id path segment must be non-blank.",
        ));
    }
    None
}

fn bad_request(message: &str, description: &str) -> Response {
    let body = ErrorBody {
        message: message.to_string(),
        description: description.to_string(),
        can_retry: false,
    };
    (StatusCode::BAD_REQUEST, Json(body)).into_response()
}

fn envelope_response(envelope: Envelope) -> Response {
    let Some(kind) = envelope.error_kind else {
        return (StatusCode::OK, Json(envelope)).into_response();
    };
    let status = match kind {
        ErrorKind::UnknownWorkflow | ErrorKind::ThreadNotFound => StatusCode::NOT_FOUND,
        ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
        ErrorKind::ConcurrentModification => StatusCode::CONFLICT,
        ErrorKind::NodeExecution | ErrorKind::StoreUnavailable | ErrorKind::Serialization => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    let body = ErrorBody {
        message: envelope.error.unwrap_or_else(|| "error".to_string()),
        description: envelope.message.unwrap_or_default(),
        can_retry: kind.can_retry(),
    };
    (status, Json(body)).into_response()
}
