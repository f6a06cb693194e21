//! HTTP server: binds the listener and serves until Ctrl-C.

use crate::api::api_router;
use crate::state::AppState;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};

pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .nest("/api", api_router())
        .layer(cors)
        .with_state(state)
}

pub async fn serve(state: AppState) -> Result<(), Box<dyn std::error::Error>> {
    let port = state.port;
    let bind_addr = state.bind_address.clone();
    let app = app(state);

    let listener = tokio::net::TcpListener::bind(format!("{}:{}", bind_addr, port)).await?;
    let actual_port = listener.local_addr()?.port();

    log::info!(
        "HTTP server listening on http://{}:{}",
        bind_addr,
        actual_port
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    log::info!("[laneboard.shutdown] HTTP server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    log::info!("[laneboard.shutdown] Shutdown signal received");
}
