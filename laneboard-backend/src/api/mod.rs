use axum::{
    body::Bytes,
    http::StatusCode,
    response::Json,
    routing::{get, post, put},
    Router,
};
use laneboard_core::board::{BoardError, ErrorKind};
use serde::de::DeserializeOwned;
use serde::Serialize;

mod lanes;
mod status;
mod tasks;

use crate::state::AppState;

/// Axum REST API routes (nested under /api).
///
///   GET    /status                 -> API status, csrf token, endpoint list
///   GET    /lanes                  -> structured swimlanes (+ lastModified)
///   GET    /lanes/raw              -> lane rows as stored
///   POST   /lanes/swimlane         -> add swimlane
///   PUT    /lanes/swimlane         -> rename swimlane (cascades to tasks)
///   DELETE /lanes/swimlane         -> delete swimlane (tasks move to fallback)
///   POST   /lanes/column           -> add column
///   PUT    /lanes/column           -> rename column (cascades to tasks)
///   DELETE /lanes/column           -> delete column (tasks move to fallback)
///   POST   /lanes/meta             -> update colors and order
///   GET    /tasks                  -> tasks grouped by swimlane and column
///   GET    /tasks/list             -> all tasks
///   GET    /tasks/stats            -> count + last-modified times
///   GET    /tasks/:id              -> one task
///   POST   /tasks                  -> create task
///   PUT    /tasks/:id              -> update task
///   PUT    /tasks/:id/move         -> move task
///   DELETE /tasks/:id              -> delete task
pub fn api_router() -> Router<AppState> {
    Router::new()
        .route("/", get(status::status))
        .route("/status", get(status::status))
        .route("/lanes", get(lanes::structured))
        .route("/lanes/structured", get(lanes::structured))
        .route("/lanes/raw", get(lanes::raw))
        .route(
            "/lanes/swimlane",
            post(lanes::add_swimlane)
                .put(lanes::rename_swimlane)
                .delete(lanes::delete_swimlane),
        )
        .route(
            "/lanes/column",
            post(lanes::add_column)
                .put(lanes::rename_column)
                .delete(lanes::delete_column),
        )
        .route("/lanes/meta", post(lanes::update_meta))
        .route("/tasks", get(tasks::grouped).post(tasks::create_task))
        .route("/tasks/grouped", get(tasks::grouped))
        .route("/tasks/list", get(tasks::list_tasks))
        .route("/tasks/stats", get(tasks::stats))
        .route(
            "/tasks/{id}",
            get(tasks::get_task)
                .put(tasks::update_task)
                .delete(tasks::delete_task),
        )
        .route("/tasks/{id}/move", put(tasks::move_task))
}

// ── Shared types and helpers used across sub-modules ────────────────────

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub kind: &'static str,
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);
pub type ApiResult = Result<(StatusCode, Json<serde_json::Value>), ApiError>;

fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::BadInput => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Map a board error to its HTTP response and log it.
fn board_error(target: &'static str, e: BoardError) -> ApiError {
    let kind = e.kind();
    let status = status_for(kind);
    log_api_issue(status, target, e.to_string());
    (
        status,
        Json(ErrorResponse {
            error: e.to_string(),
            kind: kind.as_str(),
        }),
    )
}

/// Parse a JSON request body. An empty body means "all fields absent".
fn parse_body<T: DeserializeOwned + Default>(
    target: &'static str,
    body: &Bytes,
) -> Result<T, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|e| {
        let status = StatusCode::BAD_REQUEST;
        let error = format!("Invalid JSON body: {}", e);
        log_api_issue(status, target, &error);
        (
            status,
            Json(ErrorResponse {
                error,
                kind: ErrorKind::BadInput.as_str(),
            }),
        )
    })
}

fn message(status: StatusCode, text: &str) -> (StatusCode, Json<serde_json::Value>) {
    (status, Json(serde_json::json!({ "message": text })))
}

fn log_api_issue(status: StatusCode, target: &'static str, message: impl AsRef<str>) {
    let message = message.as_ref();
    if status.is_server_error() {
        log::error!(target: target, "{}", message);
    } else {
        log::warn!(target: target, "{}", message);
    }
}
