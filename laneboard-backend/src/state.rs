//! Shared application state passed to axum handlers.

use laneboard_core::board::BoardService;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub board: Arc<BoardService>,
    /// Opaque per-process anti-forgery token handed to the UI via /status.
    pub csrf_token: String,
    pub port: u16,
    pub bind_address: String,
}

impl AppState {
    pub fn new(board: BoardService, port: u16, bind_address: String) -> Self {
        Self {
            board: Arc::new(board),
            csrf_token: uuid::Uuid::new_v4().simple().to_string(),
            port,
            bind_address,
        }
    }
}
