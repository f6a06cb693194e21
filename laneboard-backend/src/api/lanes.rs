use axum::{body::Bytes, extract::State, http::StatusCode, response::Json};
use laneboard_core::types::BoardMeta;
use serde::Deserialize;
use serde_json::json;

use super::{board_error, message, parse_body, ApiResult};
use crate::state::AppState;

const TARGET: &str = "laneboard.api.lanes";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AddSwimlaneRequest {
    pub swimlane: String,
    pub first_column: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RenameSwimlaneRequest {
    pub old_swimlane: String,
    pub new_swimlane: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DeleteSwimlaneRequest {
    pub swimlane: String,
    pub fallback_swimlane: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AddColumnRequest {
    pub swimlane: String,
    pub column: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RenameColumnRequest {
    pub swimlane: String,
    pub old_column: String,
    pub new_column: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DeleteColumnRequest {
    pub swimlane: String,
    pub column: String,
    pub fallback_column: String,
}

pub async fn structured(State(state): State<AppState>) -> ApiResult {
    let lanes = state
        .board
        .structured_lanes()
        .map_err(|e| board_error(TARGET, e))?;
    Ok((
        StatusCode::OK,
        Json(json!({
            "swimlanes": lanes,
            "lastModified": state.board.lanes().last_modified(),
        })),
    ))
}

pub async fn raw(State(state): State<AppState>) -> ApiResult {
    let rows = state.board.raw_lanes().map_err(|e| board_error(TARGET, e))?;
    Ok((StatusCode::OK, Json(json!({ "lanes": rows }))))
}

pub async fn add_swimlane(State(state): State<AppState>, body: Bytes) -> ApiResult {
    let req: AddSwimlaneRequest = parse_body(TARGET, &body)?;
    state
        .board
        .add_swimlane(&req.swimlane, &req.first_column)
        .map_err(|e| board_error(TARGET, e))?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Swimlane added",
            "swimlane": req.swimlane.trim(),
        })),
    ))
}

pub async fn rename_swimlane(State(state): State<AppState>, body: Bytes) -> ApiResult {
    let req: RenameSwimlaneRequest = parse_body(TARGET, &body)?;
    state
        .board
        .rename_swimlane(&req.old_swimlane, &req.new_swimlane)
        .map_err(|e| board_error(TARGET, e))?;
    Ok(message(StatusCode::OK, "Swimlane renamed"))
}

pub async fn delete_swimlane(State(state): State<AppState>, body: Bytes) -> ApiResult {
    let req: DeleteSwimlaneRequest = parse_body(TARGET, &body)?;
    state
        .board
        .delete_swimlane(&req.swimlane, &req.fallback_swimlane)
        .map_err(|e| board_error(TARGET, e))?;
    Ok(message(StatusCode::OK, "Swimlane deleted"))
}

pub async fn add_column(State(state): State<AppState>, body: Bytes) -> ApiResult {
    let req: AddColumnRequest = parse_body(TARGET, &body)?;
    state
        .board
        .add_column(&req.swimlane, &req.column)
        .map_err(|e| board_error(TARGET, e))?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Column added",
            "column": req.column.trim(),
        })),
    ))
}

pub async fn rename_column(State(state): State<AppState>, body: Bytes) -> ApiResult {
    let req: RenameColumnRequest = parse_body(TARGET, &body)?;
    state
        .board
        .rename_column(&req.swimlane, &req.old_column, &req.new_column)
        .map_err(|e| board_error(TARGET, e))?;
    Ok(message(StatusCode::OK, "Column renamed"))
}

pub async fn delete_column(State(state): State<AppState>, body: Bytes) -> ApiResult {
    let req: DeleteColumnRequest = parse_body(TARGET, &body)?;
    state
        .board
        .delete_column(&req.swimlane, &req.column, &req.fallback_column)
        .map_err(|e| board_error(TARGET, e))?;
    Ok(message(StatusCode::OK, "Column deleted"))
}

pub async fn update_meta(State(state): State<AppState>, body: Bytes) -> ApiResult {
    let meta: BoardMeta = parse_body(TARGET, &body)?;
    state
        .board
        .update_meta(&meta)
        .map_err(|e| board_error(TARGET, e))?;
    Ok(message(StatusCode::OK, "Settings saved"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use laneboard_core::board::BoardService;
    use laneboard_core::types::TaskInput;
    use tempfile::TempDir;

    fn test_state() -> (TempDir, AppState) {
        let dir = TempDir::new().unwrap();
        let board = BoardService::open(dir.path()).unwrap();
        (dir, AppState::new(board, 0, "127.0.0.1".to_string()))
    }

    fn body(value: serde_json::Value) -> Bytes {
        Bytes::from(value.to_string())
    }

    #[tokio::test]
    async fn test_structured_seeds_defaults() {
        let (_dir, state) = test_state();
        let (status, Json(value)) = structured(State(state)).await.unwrap();
        assert_eq!(status, StatusCode::OK);
        let names: Vec<&String> = value["swimlanes"].as_object().unwrap().keys().collect();
        assert_eq!(names, vec!["Incidents", "Ops backlog"]);
        assert_eq!(value["swimlanes"]["Incidents"]["cols"][0], "Detected");
        assert!(value["lastModified"].is_string());
    }

    #[tokio::test]
    async fn test_add_swimlane_created_then_conflict() {
        let (_dir, state) = test_state();
        let req = body(json!({ "swimlane": " Infra ", "first_column": "Todo" }));
        let (status, Json(value)) = add_swimlane(State(state.clone()), req.clone()).await.unwrap();
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(value["swimlane"], "Infra");

        let (status, Json(err)) = add_swimlane(State(state), req).await.unwrap_err();
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(err.kind, "conflict");
    }

    #[tokio::test]
    async fn test_add_swimlane_empty_body_is_bad_input() {
        let (_dir, state) = test_state();
        let (status, Json(err)) = add_swimlane(State(state), Bytes::new()).await.unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(err.kind, "bad_input");
    }

    #[tokio::test]
    async fn test_rename_swimlane_moves_tasks() {
        let (_dir, state) = test_state();
        let task = state
            .board
            .create_task(&TaskInput {
                title: "disk full".into(),
                swimlane: "Incidents".into(),
                column: "Fixing".into(),
                ..Default::default()
            })
            .unwrap();

        let req = body(json!({ "old_swimlane": "Incidents", "new_swimlane": "Outages" }));
        let (status, Json(value)) = rename_swimlane(State(state.clone()), req).await.unwrap();
        assert_eq!(status, StatusCode::OK);
        assert_eq!(value["message"], "Swimlane renamed");
        assert_eq!(state.board.get_task(&task.id).unwrap().swimlane, "Outages");
    }

    #[tokio::test]
    async fn test_delete_unknown_column_is_not_found() {
        let (_dir, state) = test_state();
        let req = body(json!({
            "swimlane": "Incidents",
            "column": "Nope",
            "fallback_column": "Detected",
        }));
        let (status, _) = delete_column(State(state), req).await.unwrap_err();
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_update_meta_accepts_string_order() {
        let (_dir, state) = test_state();
        let req = body(json!({
            "swimlanes": { "Ops backlog": { "order": "-1", "color": "#112233" } }
        }));
        let (status, Json(value)) = update_meta(State(state.clone()), req).await.unwrap();
        assert_eq!(status, StatusCode::OK);
        assert_eq!(value["message"], "Settings saved");

        let lanes = state.board.structured_lanes().unwrap();
        assert_eq!(lanes.first_swimlane(), Some("Ops backlog"));
        assert_eq!(lanes.get("Ops backlog").unwrap().color, "#112233");
    }
}
