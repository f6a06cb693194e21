pub mod api;
/// Laneboard backend: config loading, board init, HTTP server.
pub mod config;
pub mod server;
pub mod state;

use crate::state::AppState;
use laneboard_core::board::BoardService;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = config::default_config_path();
    let config = config::load_config(&config_path);

    let data_dir = config.resolved_data_dir();
    let board = BoardService::open(&data_dir).map_err(|e| {
        log::error!("Failed to open board data in {}: {}", data_dir.display(), e);
        e
    })?;
    log::info!("Board data directory: {}", data_dir.display());

    let state = AppState::new(board, config.port, config.bind_address.clone());
    server::serve(state).await
}
