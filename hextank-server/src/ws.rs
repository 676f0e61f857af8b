//! WebSocket session handling.
//!
//! Each connection is bound to the player id of its first message. Inbound
//! frames are dispatched against the shared [`ServerState`]; outbound
//! traffic goes through a per-connection mpsc channel so match logic never
//! touches the socket directly.

use crate::protocol::{ClientEnvelope, ServerEnvelope};
use crate::state::{game_over_notices, ServerState};
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use hextank_core::{matchmaking, MatchState, MoveError, PlayerId, PlayerSlot, QueueClass};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

const OUTBOX_CAPACITY: usize = 32;

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<ServerState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<ServerState>) {
    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = mpsc::channel::<ServerEnvelope>(OUTBOX_CAPACITY);

    let send_task = tokio::spawn(async move {
        while let Some(envelope) = rx.recv().await {
            match envelope.to_json() {
                Ok(text) => {
                    if sink.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
                Err(err) => error!("failed to serialize outbound envelope: {err}"),
            }
        }
    });

    let mut identity: Option<PlayerId> = None;
    while let Some(frame) = stream.next().await {
        let frame = match frame {
            Ok(frame) => frame,
            Err(err) => {
                debug!("websocket read error: {err}");
                break;
            }
        };
        match frame {
            Message::Text(text) => {
                dispatch(&text, &tx, &mut identity, &state).await;
            }
            Message::Close(_) => break,
            // Pings are answered by axum itself; binary is not part of the
            // protocol.
            _ => {}
        }
    }

    if let Some(player) = identity {
        handle_disconnect(&player, &state).await;
    }
    send_task.abort();
}

async fn dispatch(
    text: &str,
    tx: &mpsc::Sender<ServerEnvelope>,
    identity: &mut Option<PlayerId>,
    state: &Arc<ServerState>,
) {
    let envelope = match ClientEnvelope::from_json(text) {
        Ok(envelope) => envelope,
        Err(err) => {
            debug!("unrecognized client message: {err}");
            let _ = tx
                .send(ServerEnvelope::error(
                    "UNRECOGNIZED_MESSAGE",
                    format!("could not parse message: {err}"),
                ))
                .await;
            return;
        }
    };

    let player = envelope.player_id().clone();
    match identity {
        None => {
            *identity = Some(player.clone());
            state.register_connection(player.clone(), tx.clone()).await;
        }
        Some(bound) if *bound != player => {
            let _ = tx
                .send(ServerEnvelope::error(
                    "IDENTITY_MISMATCH",
                    "connection is bound to a different player id",
                ))
                .await;
            return;
        }
        Some(_) => {}
    }

    match envelope {
        ClientEnvelope::JoinQueue { class, .. } => {
            handle_join_queue(&player, class, state).await;
        }
        ClientEnvelope::CancelQueue { .. } => {
            handle_cancel_queue(&player, state).await;
        }
        ClientEnvelope::MoveTank {
            tank_id,
            destination,
            ..
        } => {
            handle_move(&player, tank_id, destination, state).await;
        }
        ClientEnvelope::EndTurn { .. } => {
            handle_end_turn(&player, state).await;
        }
    }
}

async fn handle_join_queue(player: &PlayerId, class: QueueClass, state: &Arc<ServerState>) {
    if state.match_of(player).await.is_some() {
        state
            .send_to(player, ServerEnvelope::error("ALREADY_IN_MATCH", "finish the current match first"))
            .await;
        return;
    }

    // The queue lock is released before any match gets created.
    let paired = {
        let mut queue = state.queue.lock().await;
        queue.enqueue(player.clone(), class)
    };

    match paired {
        Err(err) => {
            state
                .send_to(player, ServerEnvelope::error("ALREADY_QUEUED", err.to_string()))
                .await;
        }
        Ok(None) => {
            debug!("{player} waiting in {class:?} queue");
            state.send_to(player, ServerEnvelope::QueueJoined { class }).await;
        }
        Ok(Some((first, second))) => {
            start_match(first, second, state).await;
        }
    }
}

async fn start_match(first: PlayerId, second: PlayerId, state: &Arc<ServerState>) {
    let id = state.allocate_match_id();
    let seed = map_seed(id.0);
    let match_state = matchmaking::create_match(id, first.clone(), second.clone(), seed);
    info!("{id} starting: {first} vs {second}");

    let shared = state
        .register_match(match_state, [&first, &second])
        .await;

    let mut outbox: Vec<(PlayerId, ServerEnvelope)> = Vec::new();
    {
        let match_state = shared.lock().await;
        for (me, opponent, slot) in [
            (&first, &second, PlayerSlot::P1),
            (&second, &first, PlayerSlot::P2),
        ] {
            outbox.push((
                me.clone(),
                ServerEnvelope::MatchFound {
                    match_id: id,
                    slot,
                    opponent: opponent.clone(),
                    you_move_first: slot == PlayerSlot::P1,
                },
            ));
            if let Some(snapshot) = match_state.visible_state(me) {
                outbox.push((me.clone(), ServerEnvelope::StateSnapshot { snapshot }));
            }
        }
    }
    for (recipient, envelope) in outbox {
        state.send_to(&recipient, envelope).await;
    }

    // A participant may have dropped in the window between pairing and
    // registration; their socket teardown ran against an empty registry and
    // nothing else would ever look at them again.
    if let Some(notices) = state.settle_vanished(id).await {
        warn!("{id}: participant vanished during matchmaking");
        for (recipient, envelope) in notices {
            state.send_to(&recipient, envelope).await;
        }
    }
}

async fn handle_cancel_queue(player: &PlayerId, state: &Arc<ServerState>) {
    let removed = state.queue.lock().await.cancel(player);
    if removed {
        state.send_to(player, ServerEnvelope::QueueCancelled).await;
    } else {
        state
            .send_to(player, ServerEnvelope::error("NOT_QUEUED", "player is not waiting in any queue"))
            .await;
    }
}

async fn handle_move(
    player: &PlayerId,
    tank_id: hextank_core::TankId,
    destination: hextank_core::Hex,
    state: &Arc<ServerState>,
) {
    let Some(shared) = state.match_of(player).await else {
        state
            .send_to(player, ServerEnvelope::error("NOT_IN_MATCH", "no active match for this player"))
            .await;
        return;
    };

    let mut outbox: Vec<(PlayerId, ServerEnvelope)> = Vec::new();
    let mut finished = None;
    {
        let mut match_state = shared.lock().await;
        let id = match_state.id();
        match match_state.attempt_move(player, tank_id, destination) {
            Ok(report) => {
                let game_over = report.game_over;
                let winner = report.winner.clone();
                outbox.push((
                    player.clone(),
                    ServerEnvelope::MoveResult {
                        accepted: true,
                        report: Some(report),
                        reason: None,
                    },
                ));
                queue_snapshots(&match_state, &mut outbox);
                if game_over {
                    info!("{id} over, winner: {winner:?}");
                    outbox.extend(game_over_notices(&match_state, winner));
                    finished = Some(id);
                }
            }
            Err(err @ MoveError::Inconsistent(_)) => {
                // The engine already forced the match over with no winner.
                error!("{id} aborted: {err}");
                outbox.push((
                    player.clone(),
                    ServerEnvelope::MoveResult {
                        accepted: false,
                        report: None,
                        reason: Some(err.code().to_string()),
                    },
                ));
                outbox.extend(game_over_notices(&match_state, None));
                finished = Some(id);
            }
            Err(err) => {
                debug!("{id}: move by {player} rejected: {err}");
                outbox.push((
                    player.clone(),
                    ServerEnvelope::MoveResult {
                        accepted: false,
                        report: None,
                        reason: Some(err.code().to_string()),
                    },
                ));
            }
        }
    }

    for (recipient, envelope) in outbox {
        state.send_to(&recipient, envelope).await;
    }
    if let Some(id) = finished {
        state.remove_match(id).await;
    }
}

async fn handle_end_turn(player: &PlayerId, state: &Arc<ServerState>) {
    let Some(shared) = state.match_of(player).await else {
        state
            .send_to(player, ServerEnvelope::error("NOT_IN_MATCH", "no active match for this player"))
            .await;
        return;
    };

    let mut outbox: Vec<(PlayerId, ServerEnvelope)> = Vec::new();
    {
        let mut match_state = shared.lock().await;
        match match_state.end_turn_voluntarily(player) {
            Ok(()) => queue_snapshots(&match_state, &mut outbox),
            Err(err) => {
                debug!("{}: end turn by {player} rejected: {err}", match_state.id());
                outbox.push((
                    player.clone(),
                    ServerEnvelope::error(err.code(), err.to_string()),
                ));
            }
        }
    }
    for (recipient, envelope) in outbox {
        state.send_to(&recipient, envelope).await;
    }
}

/// A vanished connection forfeits: the opponent wins whatever is left of
/// the match, and any queue slot is released.
async fn handle_disconnect(player: &PlayerId, state: &Arc<ServerState>) {
    state.drop_connection(player).await;
    let notices = state.forfeit(player).await;
    if !notices.is_empty() {
        warn!("{player} disconnected, match forfeited");
    }
    for (recipient, envelope) in notices {
        state.send_to(&recipient, envelope).await;
    }
}

fn queue_snapshots(match_state: &MatchState, outbox: &mut Vec<(PlayerId, ServerEnvelope)>) {
    for slot in [PlayerSlot::P1, PlayerSlot::P2] {
        let id = match_state.player(slot).id.clone();
        if let Some(snapshot) = match_state.visible_state(&id) {
            outbox.push((id, ServerEnvelope::StateSnapshot { snapshot }));
        }
    }
}

/// Per-match map seed: wall clock mixed with the match counter so two
/// matches created in the same instant still differ.
fn map_seed(match_counter: u64) -> u64 {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0);
    nanos ^ match_counter.rotate_left(32)
}
