//! Server state management
//!
//! All shared state lives in this one context object; nothing is global.
//! Each match sits behind its own lock so concurrent matches never block
//! each other, and the matchmaking queue has a lock of its own. Locks are
//! never held across one another.

use crate::protocol::ServerEnvelope;
use hextank_core::{MatchId, MatchState, MatchmakingQueue, PlayerId, PlayerSlot};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex, RwLock};

/// Server-wide shared state.
pub struct ServerState {
    /// Live matches, each independently lockable.
    pub matches: RwLock<HashMap<MatchId, Arc<Mutex<MatchState>>>>,
    /// Which match a player currently belongs to.
    pub player_matches: RwLock<HashMap<PlayerId, MatchId>>,
    /// Waiting players.
    pub queue: Mutex<MatchmakingQueue>,
    /// Outbound channel per connected player.
    pub connections: RwLock<HashMap<PlayerId, mpsc::Sender<ServerEnvelope>>>,
    next_match_id: AtomicU64,
}

impl ServerState {
    pub fn new() -> Self {
        Self {
            matches: RwLock::new(HashMap::new()),
            player_matches: RwLock::new(HashMap::new()),
            queue: Mutex::new(MatchmakingQueue::new()),
            connections: RwLock::new(HashMap::new()),
            next_match_id: AtomicU64::new(1),
        }
    }

    pub fn allocate_match_id(&self) -> MatchId {
        MatchId(self.next_match_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Store a freshly created match and index both players to it.
    pub async fn register_match(
        &self,
        state: MatchState,
        players: [&PlayerId; 2],
    ) -> Arc<Mutex<MatchState>> {
        let id = state.id();
        let shared = Arc::new(Mutex::new(state));
        self.matches.write().await.insert(id, shared.clone());
        let mut index = self.player_matches.write().await;
        for player in players {
            index.insert(player.clone(), id);
        }
        shared
    }

    /// Look up the match a player is in, if any.
    pub async fn match_of(&self, player: &PlayerId) -> Option<Arc<Mutex<MatchState>>> {
        let id = *self.player_matches.read().await.get(player)?;
        self.matches.read().await.get(&id).cloned()
    }

    /// Drop a finished match and its player index entries.
    pub async fn remove_match(&self, id: MatchId) {
        self.matches.write().await.remove(&id);
        self.player_matches.write().await.retain(|_, m| *m != id);
    }

    pub async fn register_connection(
        &self,
        player: PlayerId,
        sender: mpsc::Sender<ServerEnvelope>,
    ) {
        self.connections.write().await.insert(player, sender);
    }

    pub async fn drop_connection(&self, player: &PlayerId) {
        self.connections.write().await.remove(player);
    }

    /// Push an envelope to a player. A player whose connection is gone is
    /// simply skipped; abandonment handling runs from the socket teardown.
    pub async fn send_to(&self, player: &PlayerId, envelope: ServerEnvelope) {
        let sender = self.connections.read().await.get(player).cloned();
        if let Some(sender) = sender {
            if sender.send(envelope).await.is_err() {
                tracing::debug!("connection of {player} closed mid-send");
            }
        }
    }

    /// Forfeit for a player who is gone: releases any queue slot and ends a
    /// live match in favor of the opponent. Returns the notices to deliver.
    pub async fn forfeit(&self, player: &PlayerId) -> Vec<(PlayerId, ServerEnvelope)> {
        self.queue.lock().await.cancel(player);
        let Some(shared) = self.match_of(player).await else {
            return Vec::new();
        };
        let mut notices = Vec::new();
        let id = {
            let mut match_state = shared.lock().await;
            if !match_state.is_over() {
                if let Some(slot) = match_state.slot_of(player) {
                    match_state.abandon(slot.opponent());
                }
                let winner = match_state.winner_id().cloned();
                notices = game_over_notices(&match_state, winner);
            }
            match_state.id()
        };
        self.remove_match(id).await;
        notices
    }

    /// Sweep a freshly registered match for a participant who disconnected
    /// while it was being created: such a player already ran their socket
    /// teardown against an empty registry and will never be looked at again.
    /// Settles the match in favor of whoever still has a connection.
    /// Returns `None` when both players are present.
    pub async fn settle_vanished(
        &self,
        id: MatchId,
    ) -> Option<Vec<(PlayerId, ServerEnvelope)>> {
        let shared = self.matches.read().await.get(&id).cloned()?;
        let (p1, p2) = {
            let match_state = shared.lock().await;
            (
                match_state.player(PlayerSlot::P1).id.clone(),
                match_state.player(PlayerSlot::P2).id.clone(),
            )
        };
        let (p1_connected, p2_connected) = {
            let connections = self.connections.read().await;
            (connections.contains_key(&p1), connections.contains_key(&p2))
        };
        if p1_connected && p2_connected {
            return None;
        }

        let mut notices = Vec::new();
        {
            let mut match_state = shared.lock().await;
            let remaining = match (p1_connected, p2_connected) {
                (true, false) => Some(PlayerSlot::P1),
                (false, true) => Some(PlayerSlot::P2),
                _ => None,
            };
            if let Some(slot) = remaining {
                match_state.abandon(slot);
                let winner = match_state.winner_id().cloned();
                notices = game_over_notices(&match_state, winner);
            }
        }
        self.remove_match(id).await;
        Some(notices)
    }
}

/// Game-over notices for both seats of a match.
pub fn game_over_notices(
    match_state: &MatchState,
    winner: Option<PlayerId>,
) -> Vec<(PlayerId, ServerEnvelope)> {
    [PlayerSlot::P1, PlayerSlot::P2]
        .into_iter()
        .map(|slot| {
            (
                match_state.player(slot).id.clone(),
                ServerEnvelope::GameOver {
                    match_id: match_state.id(),
                    winner: winner.clone(),
                },
            )
        })
        .collect()
}

impl Default for ServerState {
    fn default() -> Self {
        Self::new()
    }
}
