use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use laneboard_core::types::{TaskInput, TaskMove};
use serde_json::json;

use super::{board_error, message, parse_body, ApiResult};
use crate::state::AppState;

const TARGET: &str = "laneboard.api.tasks";

pub async fn grouped(State(state): State<AppState>) -> ApiResult {
    let (grouped, lanes) = state.board.grouped().map_err(|e| board_error(TARGET, e))?;
    Ok((
        StatusCode::OK,
        Json(json!({
            "grouped": grouped,
            "swimlanes": lanes,
            "lastModified": {
                "tasks": state.board.tasks().last_modified(),
                "lanes": state.board.lanes().last_modified(),
            },
        })),
    ))
}

pub async fn list_tasks(State(state): State<AppState>) -> ApiResult {
    let tasks = state.board.list_tasks().map_err(|e| board_error(TARGET, e))?;
    Ok((
        StatusCode::OK,
        Json(json!({
            "tasks": tasks,
            "lastModified": state.board.tasks().last_modified(),
        })),
    ))
}

pub async fn stats(State(state): State<AppState>) -> ApiResult {
    let stats = state.board.stats().map_err(|e| board_error(TARGET, e))?;
    Ok((StatusCode::OK, Json(json!(stats))))
}

pub async fn get_task(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult {
    let task = state.board.get_task(&id).map_err(|e| board_error(TARGET, e))?;
    Ok((StatusCode::OK, Json(json!({ "task": task }))))
}

pub async fn create_task(State(state): State<AppState>, body: Bytes) -> ApiResult {
    let input: TaskInput = parse_body(TARGET, &body)?;
    let task = state
        .board
        .create_task(&input)
        .map_err(|e| board_error(TARGET, e))?;
    log::info!(
        target: TARGET,
        "Created task {} in ({:?}, {:?})",
        task.id,
        task.swimlane,
        task.column
    );
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Task created",
            "id": task.id,
            "task": task,
        })),
    ))
}

pub async fn update_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> ApiResult {
    let input: TaskInput = parse_body(TARGET, &body)?;
    let task = state
        .board
        .update_task(&id, &input)
        .map_err(|e| board_error(TARGET, e))?;
    Ok((
        StatusCode::OK,
        Json(json!({
            "message": "Task updated",
            "task": task,
        })),
    ))
}

pub async fn move_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> ApiResult {
    let target: TaskMove = parse_body(TARGET, &body)?;
    state
        .board
        .move_task(&id, &target)
        .map_err(|e| board_error(TARGET, e))?;
    Ok(message(StatusCode::OK, "Task moved"))
}

pub async fn delete_task(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult {
    state.board.delete_task(&id).map_err(|e| board_error(TARGET, e))?;
    Ok(message(StatusCode::OK, "Task deleted"))
}
