//! Status endpoint

use crate::state::ServerState;
use axum::extract::State;
use axum::Json;
use serde::Serialize;
use std::sync::Arc;

#[derive(Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub active_matches: usize,
    pub queued_players: usize,
}

pub async fn status_handler(State(state): State<Arc<ServerState>>) -> Json<StatusResponse> {
    let active_matches = state.matches.read().await.len();
    let queued_players = state.queue.lock().await.waiting();
    Json(StatusResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        active_matches,
        queued_players,
    })
}
