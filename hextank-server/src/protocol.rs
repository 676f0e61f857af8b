//! Wire format for client-server communication over WebSocket.
//!
//! Every frame is a JSON envelope `{"kind": ..., "payload": ...}` with a
//! SCREAMING_SNAKE_CASE kind tag. Unknown kinds and malformed payloads are
//! reported back as an `ERROR` envelope, never dropped silently.

use hextank_core::{Hex, MatchId, MoveReport, PlayerId, PlayerSlot, QueueClass, Snapshot, TankId};
use serde::{Deserialize, Serialize};

/// Messages sent from client to server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientEnvelope {
    /// Enter matchmaking. The first message a client sends; also binds the
    /// connection to the player id it carries.
    JoinQueue {
        player_id: PlayerId,
        #[serde(default)]
        class: QueueClass,
    },
    /// Leave matchmaking before a match is found.
    CancelQueue { player_id: PlayerId },
    /// Move one tank to an adjacent cell.
    MoveTank {
        player_id: PlayerId,
        tank_id: TankId,
        destination: Hex,
    },
    /// End the turn without spending the remaining movement points.
    EndTurn { player_id: PlayerId },
}

/// Messages sent from server to client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServerEnvelope {
    /// Waiting in the queue.
    QueueJoined { class: QueueClass },
    /// Left the queue.
    QueueCancelled,
    /// Paired up; a snapshot follows immediately.
    MatchFound {
        match_id: MatchId,
        slot: PlayerSlot,
        opponent: PlayerId,
        you_move_first: bool,
    },
    /// Outcome of the sender's own move attempt.
    MoveResult {
        accepted: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        report: Option<MoveReport>,
        #[serde(skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
    /// Fresh per-player view, pushed to both sides after every state change.
    StateSnapshot { snapshot: Snapshot },
    /// The match ended; `winner` is absent on mutual destruction.
    GameOver {
        match_id: MatchId,
        winner: Option<PlayerId>,
    },
    /// Request-level failure: unknown kind, bad payload, wrong context.
    Error { code: String, message: String },
}

impl ClientEnvelope {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// The player id every client message carries.
    pub fn player_id(&self) -> &PlayerId {
        match self {
            ClientEnvelope::JoinQueue { player_id, .. }
            | ClientEnvelope::CancelQueue { player_id }
            | ClientEnvelope::MoveTank { player_id, .. }
            | ClientEnvelope::EndTurn { player_id } => player_id,
        }
    }
}

impl ServerEnvelope {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn error(code: &str, message: impl Into<String>) -> Self {
        ServerEnvelope::Error {
            code: code.to_string(),
            message: message.into(),
        }
    }
}
