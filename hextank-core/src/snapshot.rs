//! Per-player views of a match.
//!
//! A [`Snapshot`] is everything one player is allowed to see. Enemy tanks
//! expose position and destruction status only; their class and remaining
//! moves are deliberately absent from the type so they can never leak
//! through serialization.

use crate::board::Hex;
use crate::game::{MatchId, PlayerId};
use crate::map::TerrainKind;
use crate::tanks::{MoveBudget, TankClass, TankId};
use serde::{Deserialize, Serialize};

/// One board cell and its terrain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerrainCell {
    pub position: Hex,
    pub terrain: TerrainKind,
}

/// Full detail on one of the viewer's own tanks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnTankView {
    pub id: TankId,
    pub class: TankClass,
    pub position: Hex,
    pub reached_goal: bool,
    pub destroyed: bool,
    pub moves_remaining: MoveBudget,
}

/// What the viewer sees of an opposing tank.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnemyTankView {
    pub id: TankId,
    pub position: Hex,
    pub destroyed: bool,
}

/// One player's filtered view of a match, ready for the wire.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub match_id: MatchId,
    pub turn: u32,
    pub current_player: PlayerId,
    pub radius: i8,
    /// Sorted by (q, r) so identical states serialize identically.
    pub terrain: Vec<TerrainCell>,
    /// The viewer's own remaining movement points for this turn.
    pub movement_points: u8,
    pub unrestricted: bool,
    pub your_tanks: Vec<OwnTankView>,
    pub enemy_tanks: Vec<EnemyTankView>,
    pub game_over: bool,
    pub winner: Option<PlayerId>,
}
