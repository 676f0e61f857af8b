//! HEXTANK Server - WebSocket backend
//!
//! This crate provides the network layer:
//! - WebSocket endpoint for matchmaking and match play
//! - JSON envelope protocol
//! - Per-match locking so concurrent matches proceed independently

pub mod protocol;
mod routes;
mod state;
mod ws;

use axum::{routing::get, Router};
use std::net::SocketAddr;
use std::sync::Arc;

pub use state::ServerState;

/// Server configuration
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: 8080 }
    }
}

/// Create the router with all routes
pub fn create_router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route("/api/status", get(routes::status::status_handler))
        .route("/ws", get(ws::ws_handler))
        .with_state(state)
}

/// Start the server
pub async fn run_server(config: ServerConfig) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let state = Arc::new(ServerState::new());
    let router = create_router(state);

    tracing::info!("HEXTANK Server starting on ws://0.0.0.0:{}/ws", config.port);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}
