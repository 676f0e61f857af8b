//! HEXTANK Core - authoritative match engine
//!
//! This crate provides the server-side game logic for HEXTANK:
//! - Board geometry (hex grid with axial coordinates)
//! - Terrain maps with passability
//! - Tank units, movement rules and combat resolution
//! - Match state and the turn/phase state machine
//! - Matchmaking queues that instantiate matches
//!
//! Transport, rendering and page serving live outside this crate; the only
//! contract exposed to them is the operations on [`MatchState`] and
//! [`MatchmakingQueue`] plus the per-player [`Snapshot`] query.

pub mod board;
pub mod game;
pub mod map;
pub mod matchmaking;
pub mod snapshot;
pub mod tanks;

// Re-exports for convenient access
pub use board::{Hex, DIRECTIONS};
pub use game::{
    MatchId, MatchState, MoveError, MoveReport, Phase, Player, PlayerId, PlayerSlot,
    MOVEMENT_POINTS_PER_TURN,
};
pub use map::{GameMap, MapError, TerrainKind, MAP_RADIUS};
pub use matchmaking::{create_match, MatchmakingQueue, QueueClass, QueueError};
pub use snapshot::Snapshot;
pub use tanks::{
    resolve_combat, CombatOutcome, MoveBudget, Tank, TankClass, TankId, UNIT_MOVES_PER_TURN,
};
