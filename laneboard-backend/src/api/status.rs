use axum::{extract::State, http::StatusCode, response::Json};
use serde_json::{json, Map, Value};

use super::ApiResult;
use crate::state::AppState;

const API_VERSION: &str = "1.0";

const ENDPOINTS: &[(&str, &str)] = &[
    ("GET /api/status", "API status"),
    ("GET /api/lanes", "Get swimlanes structure"),
    ("GET /api/lanes/raw", "Get lane rows"),
    ("POST /api/lanes/swimlane", "Add swimlane"),
    ("PUT /api/lanes/swimlane", "Rename swimlane"),
    ("DELETE /api/lanes/swimlane", "Delete swimlane"),
    ("POST /api/lanes/column", "Add column"),
    ("PUT /api/lanes/column", "Rename column"),
    ("DELETE /api/lanes/column", "Delete column"),
    ("POST /api/lanes/meta", "Update colors and order"),
    ("GET /api/tasks", "Get tasks grouped"),
    ("GET /api/tasks/list", "Get all tasks"),
    ("GET /api/tasks/stats", "Get task stats"),
    ("GET /api/tasks/{id}", "Get task by ID"),
    ("POST /api/tasks", "Create task"),
    ("PUT /api/tasks/{id}", "Update task"),
    ("PUT /api/tasks/{id}/move", "Move task"),
    ("DELETE /api/tasks/{id}", "Delete task"),
];

pub async fn status(State(state): State<AppState>) -> ApiResult {
    let endpoints: Map<String, Value> = ENDPOINTS
        .iter()
        .map(|(route, description)| (route.to_string(), Value::from(*description)))
        .collect();

    Ok((
        StatusCode::OK,
        Json(json!({
            "status": "ok",
            "version": API_VERSION,
            "csrf": state.csrf_token,
            "endpoints": endpoints,
        })),
    ))
}
