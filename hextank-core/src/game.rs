//! Match state and the turn/phase state machine.
//!
//! A [`MatchState`] owns the map, both players and the turn pointer, and is
//! mutated exclusively through [`MatchState::attempt_move`],
//! [`MatchState::end_turn_voluntarily`] and [`MatchState::abandon`]. All
//! validation happens before any mutation, so a rejected call leaves the
//! match byte-for-byte unchanged.

use crate::board::Hex;
use crate::map::GameMap;
use crate::snapshot::{EnemyTankView, OwnTankView, Snapshot, TerrainCell};
use crate::tanks::{resolve_combat, CombatOutcome, MoveBudget, Tank, TankClass, TankId};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Movement points granted to a player at the start of their turn. Every
/// move attempt consumes one, win or lose; the turn ends automatically at
/// zero.
pub const MOVEMENT_POINTS_PER_TURN: u8 = 5;

/// Opaque player identity. The core does no authentication; whatever the
/// transport hands over is taken at face value.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(transparent)]
pub struct PlayerId(String);

impl PlayerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PlayerId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Match identifier, unique within one server process.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(transparent)]
pub struct MatchId(pub u64);

impl fmt::Display for MatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "match-{}", self.0)
    }
}

/// Seat within a match. The first-arrived player takes P1 and the
/// negative-radius home row.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerSlot {
    P1 = 0,
    P2 = 1,
}

impl PlayerSlot {
    pub fn opponent(self) -> Self {
        match self {
            PlayerSlot::P1 => PlayerSlot::P2,
            PlayerSlot::P2 => PlayerSlot::P1,
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

/// Turn phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Movement,
    CombatResolution,
    GameOver,
}

/// One side of a match.
#[derive(Clone, Debug)]
pub struct Player {
    pub id: PlayerId,
    pub slot: PlayerSlot,
    pub home_row: i8,
    /// Fixed at match start; tanks are flagged destroyed, never removed.
    pub tanks: Vec<Tank>,
    pub movement_points: u8,
    /// Permanently true once at least half of the original tanks are
    /// destroyed.
    pub unrestricted: bool,
    pub rating: u32,
    pub wins: u32,
    pub losses: u32,
}

impl Player {
    fn new(id: PlayerId, slot: PlayerSlot, home_row: i8, tanks: Vec<Tank>) -> Self {
        Self {
            id,
            slot,
            home_row,
            tanks,
            movement_points: MOVEMENT_POINTS_PER_TURN,
            unrestricted: false,
            rating: 1000,
            wins: 0,
            losses: 0,
        }
    }

    pub fn destroyed_tanks(&self) -> usize {
        self.tanks.iter().filter(|t| t.destroyed).count()
    }

    pub fn remaining_tanks(&self) -> usize {
        self.tanks.len() - self.destroyed_tanks()
    }

    pub fn is_defeated(&self) -> bool {
        self.tanks.iter().all(|t| t.destroyed)
    }

    /// Destroyed-tank count at which movement restrictions lift:
    /// ceil(original / 2).
    pub fn majority_threshold(&self) -> usize {
        (self.tanks.len() + 1) / 2
    }
}

/// A core invariant was broken. Fatal to the match, never patched silently.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConsistencyViolation {
    /// Two live tanks of one player share a cell.
    DuplicateLivePosition { slot: PlayerSlot, position: Hex },
    /// A live tank stands on an impassable or out-of-bounds cell.
    TankOffPassableGround { slot: PlayerSlot, tank: TankId },
}

impl fmt::Display for ConsistencyViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConsistencyViolation::DuplicateLivePosition { slot, position } => write!(
                f,
                "two live tanks of {slot:?} occupy ({}, {})",
                position.q, position.r
            ),
            ConsistencyViolation::TankOffPassableGround { slot, tank } => {
                write!(f, "live tank {tank} of {slot:?} is on impassable ground")
            }
        }
    }
}

/// Why a move or turn-end was rejected. Every variant maps to a stable
/// reason code the client can show without guessing.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum MoveError {
    #[error("it is not this player's turn")]
    NotCurrentPlayer,
    #[error("no live tank with that id belongs to the player")]
    UnknownUnit,
    #[error("movement budget exhausted")]
    NoMovementBudget,
    #[error("destination is not a legal move")]
    IllegalDestination,
    #[error("match is already over")]
    GameAlreadyOver,
    #[error("match state inconsistent: {0}")]
    Inconsistent(ConsistencyViolation),
}

impl MoveError {
    /// Stable wire-level reason code.
    pub fn code(&self) -> &'static str {
        match self {
            MoveError::NotCurrentPlayer => "NOT_CURRENT_PLAYER",
            MoveError::UnknownUnit => "UNKNOWN_UNIT",
            MoveError::NoMovementBudget => "NO_MOVEMENT_BUDGET",
            MoveError::IllegalDestination => "ILLEGAL_DESTINATION",
            MoveError::GameAlreadyOver => "GAME_ALREADY_OVER",
            MoveError::Inconsistent(_) => "CONSISTENCY_VIOLATION",
        }
    }
}

/// What a resolved combat did, reported to the acting player.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatReport {
    pub defender_id: TankId,
    pub outcome: CombatOutcome,
    pub attacker_destroyed: bool,
    pub defender_destroyed: bool,
}

/// Result of a successful move attempt.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveReport {
    pub tank_id: TankId,
    pub from: Hex,
    /// Final position; equal to `from` when combat denied relocation.
    pub to: Hex,
    pub combat: Option<CombatReport>,
    pub reached_goal: bool,
    pub turn_ended: bool,
    pub game_over: bool,
    pub winner: Option<PlayerId>,
}

/// Authoritative state of one match.
#[derive(Clone, Debug)]
pub struct MatchState {
    id: MatchId,
    map: GameMap,
    players: [Player; 2],
    current: PlayerSlot,
    turn: u32,
    phase: Phase,
    winner: Option<PlayerSlot>,
}

impl MatchState {
    /// Standard match: one tank per home-row cell (every third one enhanced),
    /// the first-arrived player seated on the negative-radius row.
    pub fn new(id: MatchId, map: GameMap, first: PlayerId, second: PlayerId) -> Self {
        let radius = map.radius();
        let first_army = standard_army(&map, -radius);
        let second_army = standard_army(&map, radius);
        Self::with_armies(id, map, (first, first_army), (second, second_army))
    }

    /// Explicit armies, for tests and scripted scenarios. Home rows follow
    /// seating: P1 gets `-radius`, P2 gets `+radius`.
    pub fn with_armies(
        id: MatchId,
        map: GameMap,
        first: (PlayerId, Vec<Tank>),
        second: (PlayerId, Vec<Tank>),
    ) -> Self {
        let radius = map.radius();
        let players = [
            Player::new(first.0, PlayerSlot::P1, -radius, first.1),
            Player::new(second.0, PlayerSlot::P2, radius, second.1),
        ];
        Self {
            id,
            map,
            players,
            current: PlayerSlot::P1,
            turn: 1,
            phase: Phase::Movement,
            winner: None,
        }
    }

    pub fn id(&self) -> MatchId {
        self.id
    }

    pub fn map(&self) -> &GameMap {
        &self.map
    }

    pub fn turn(&self) -> u32 {
        self.turn
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_over(&self) -> bool {
        self.phase == Phase::GameOver
    }

    pub fn current_slot(&self) -> PlayerSlot {
        self.current
    }

    pub fn player(&self, slot: PlayerSlot) -> &Player {
        &self.players[slot.index()]
    }

    pub fn slot_of(&self, id: &PlayerId) -> Option<PlayerSlot> {
        self.players.iter().find(|p| &p.id == id).map(|p| p.slot)
    }

    pub fn winner(&self) -> Option<PlayerSlot> {
        self.winner
    }

    pub fn winner_id(&self) -> Option<&PlayerId> {
        self.winner.map(|slot| &self.player(slot).id)
    }

    /// Attempt to move `tank_id` to an adjacent `destination`. Checks run in
    /// a fixed order and nothing mutates until all of them pass; from then
    /// on the movement point is spent regardless of combat outcome.
    pub fn attempt_move(
        &mut self,
        player_id: &PlayerId,
        tank_id: TankId,
        destination: Hex,
    ) -> Result<MoveReport, MoveError> {
        if self.is_over() {
            return Err(MoveError::GameAlreadyOver);
        }
        let slot = self.slot_of(player_id).ok_or(MoveError::NotCurrentPlayer)?;
        if slot != self.current {
            return Err(MoveError::NotCurrentPlayer);
        }
        self.check_consistency()?;

        let (home_row, unrestricted, movement_points) = {
            let p = self.player(slot);
            (p.home_row, p.unrestricted, p.movement_points)
        };
        let attacker_idx = self
            .player(slot)
            .tanks
            .iter()
            .position(|t| t.id == tank_id && !t.destroyed)
            .ok_or(MoveError::UnknownUnit)?;

        let tank = &self.player(slot).tanks[attacker_idx];
        let unit_uncapped = tank.moves_remaining == MoveBudget::Unlimited;
        if movement_points == 0 && !unit_uncapped {
            return Err(MoveError::NoMovementBudget);
        }
        if tank.moves_remaining.is_exhausted() {
            return Err(MoveError::NoMovementBudget);
        }
        if !tank
            .valid_destinations(&self.map, home_row, unrestricted)
            .contains(&destination)
        {
            return Err(MoveError::IllegalDestination);
        }
        // Allied stacking was never legal.
        if self
            .player(slot)
            .tanks
            .iter()
            .any(|t| !t.destroyed && t.id != tank_id && t.position == destination)
        {
            return Err(MoveError::IllegalDestination);
        }

        // All checks passed; mutation starts here.
        let from = self.player(slot).tanks[attacker_idx].position;
        self.players[slot.index()].movement_points = movement_points.saturating_sub(1);

        let defender_idx = self.players[slot.opponent().index()]
            .tanks
            .iter()
            .position(|t| !t.destroyed && t.position == destination);

        let mut combat = None;
        let mut relocated = false;

        if let Some(defender_idx) = defender_idx {
            self.phase = Phase::CombatResolution;
            let (current, opponent) = pair_mut(&mut self.players, slot);
            let attacker = &mut current.tanks[attacker_idx];
            let defender = &mut opponent.tanks[defender_idx];
            let outcome = resolve_combat(attacker, defender);
            attacker.moves_remaining.spend();
            if outcome == CombatOutcome::SelfWins {
                attacker.history.push(attacker.position);
                attacker.position = destination;
                relocated = true;
            }
            combat = Some(CombatReport {
                defender_id: defender.id,
                outcome,
                attacker_destroyed: attacker.destroyed,
                defender_destroyed: defender.destroyed,
            });
        } else {
            // Cannot fail: destination legality was established above and
            // nothing has touched the tank since.
            let attacker = &mut self.players[slot.index()].tanks[attacker_idx];
            attacker
                .move_to(&self.map, destination, home_row, unrestricted)
                .map_err(|_| MoveError::IllegalDestination)?;
            attacker.moves_remaining.spend();
            relocated = true;
        }

        let mut reached_goal = false;
        if relocated {
            let tank = &mut self.players[slot.index()].tanks[attacker_idx];
            if !tank.destroyed && !tank.reached_goal && tank.reaches_goal(home_row) {
                tank.reached_goal = true;
                tank.moves_remaining = MoveBudget::Unlimited;
                reached_goal = true;
            }
        }

        self.rederive_unrestricted();
        self.check_victory(slot);

        let mut turn_ended = false;
        if self.phase != Phase::GameOver {
            self.phase = Phase::Movement;
            if self.players[slot.index()].movement_points == 0 {
                self.advance_turn();
                turn_ended = true;
            }
        }

        let to = self.players[slot.index()].tanks[attacker_idx].position;
        Ok(MoveReport {
            tank_id,
            from,
            to,
            combat,
            reached_goal,
            turn_ended,
            game_over: self.is_over(),
            winner: self.winner_id().cloned(),
        })
    }

    /// End the turn without exhausting the movement budget.
    pub fn end_turn_voluntarily(&mut self, player_id: &PlayerId) -> Result<(), MoveError> {
        if self.is_over() {
            return Err(MoveError::GameAlreadyOver);
        }
        let slot = self.slot_of(player_id).ok_or(MoveError::NotCurrentPlayer)?;
        if slot != self.current || self.phase != Phase::Movement {
            return Err(MoveError::NotCurrentPlayer);
        }
        self.advance_turn();
        Ok(())
    }

    /// Forced game-over with `remaining` as winner; used when the opponent
    /// disconnects or leaves. No-op on an already finished match.
    pub fn abandon(&mut self, remaining: PlayerSlot) {
        if !self.is_over() {
            self.finish(Some(remaining));
        }
    }

    /// Per-player filtered view. Enemy tank class is never disclosed.
    pub fn visible_state(&self, player_id: &PlayerId) -> Option<Snapshot> {
        let slot = self.slot_of(player_id)?;
        let me = self.player(slot);
        let them = self.player(slot.opponent());

        let mut terrain: Vec<TerrainCell> = self
            .map
            .cells()
            .map(|(position, terrain)| TerrainCell { position, terrain })
            .collect();
        terrain.sort_by_key(|c| (c.position.q, c.position.r));

        Some(Snapshot {
            match_id: self.id,
            turn: self.turn,
            current_player: self.player(self.current).id.clone(),
            radius: self.map.radius(),
            terrain,
            movement_points: me.movement_points,
            unrestricted: me.unrestricted,
            your_tanks: me
                .tanks
                .iter()
                .map(|t| OwnTankView {
                    id: t.id,
                    class: t.class,
                    position: t.position,
                    reached_goal: t.reached_goal,
                    destroyed: t.destroyed,
                    moves_remaining: t.moves_remaining,
                })
                .collect(),
            enemy_tanks: them
                .tanks
                .iter()
                .map(|t| EnemyTankView {
                    id: t.id,
                    position: t.position,
                    destroyed: t.destroyed,
                })
                .collect(),
            game_over: self.is_over(),
            winner: self.winner_id().cloned(),
        })
    }

    fn advance_turn(&mut self) {
        self.current = self.current.opponent();
        self.turn += 1;
        let player = &mut self.players[self.current.index()];
        player.movement_points = MOVEMENT_POINTS_PER_TURN;
        let unrestricted = player.unrestricted;
        for tank in &mut player.tanks {
            if !tank.destroyed && tank.is_restricted(unrestricted) {
                tank.moves_remaining = MoveBudget::Limited(crate::tanks::UNIT_MOVES_PER_TURN);
            }
        }
    }

    /// Monotonic: once a side crosses the destroyed-majority threshold its
    /// restrictions never return.
    fn rederive_unrestricted(&mut self) {
        for player in &mut self.players {
            if !player.unrestricted && player.destroyed_tanks() >= player.majority_threshold() {
                player.unrestricted = true;
                for tank in &mut player.tanks {
                    if !tank.destroyed {
                        tank.moves_remaining = MoveBudget::Unlimited;
                    }
                }
            }
        }
    }

    fn check_victory(&mut self, mover: PlayerSlot) {
        let mover_defeated = self.player(mover).is_defeated();
        let opponent_defeated = self.player(mover.opponent()).is_defeated();
        match (mover_defeated, opponent_defeated) {
            (false, true) => self.finish(Some(mover)),
            (true, false) => self.finish(Some(mover.opponent())),
            // Mutual destruction of both last tanks: nobody wins.
            (true, true) => self.finish(None),
            (false, false) => {}
        }
    }

    fn finish(&mut self, winner: Option<PlayerSlot>) {
        self.phase = Phase::GameOver;
        self.winner = winner;
        if let Some(winner) = winner {
            self.players[winner.index()].wins += 1;
            self.players[winner.opponent().index()].losses += 1;
        }
    }

    /// Board-consistency audit. A violation ends the match with no winner
    /// and surfaces as a distinct error for the transport layer to log.
    fn check_consistency(&mut self) -> Result<(), MoveError> {
        let mut violation = None;
        for player in &self.players {
            let mut seen: Vec<Hex> = Vec::new();
            for tank in player.tanks.iter().filter(|t| !t.destroyed) {
                if seen.contains(&tank.position) {
                    violation = Some(ConsistencyViolation::DuplicateLivePosition {
                        slot: player.slot,
                        position: tank.position,
                    });
                } else if !self.map.is_passable(tank.position) {
                    violation = Some(ConsistencyViolation::TankOffPassableGround {
                        slot: player.slot,
                        tank: tank.id,
                    });
                }
                seen.push(tank.position);
            }
        }
        if let Some(violation) = violation {
            self.finish(None);
            return Err(MoveError::Inconsistent(violation));
        }
        Ok(())
    }
}

/// Mutable access to (current, opponent) at once.
fn pair_mut(players: &mut [Player; 2], slot: PlayerSlot) -> (&mut Player, &mut Player) {
    let (left, right) = players.split_at_mut(1);
    match slot {
        PlayerSlot::P1 => (&mut left[0], &mut right[0]),
        PlayerSlot::P2 => (&mut right[0], &mut left[0]),
    }
}

/// One tank per passable home-row cell, ascending q, every third enhanced.
fn standard_army(map: &GameMap, home_row: i8) -> Vec<Tank> {
    map.home_row_cells(home_row)
        .into_iter()
        .enumerate()
        .map(|(i, cell)| {
            let class = if i % 3 == 0 {
                TankClass::Enhanced
            } else {
                TankClass::Regular
            };
            Tank::new(i as TankId + 1, class, cell)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tanks::UNIT_MOVES_PER_TURN;

    fn pid(s: &str) -> PlayerId {
        PlayerId::from(s)
    }

    /// Radius-3 board, three tanks per side on scripted positions.
    fn scripted_match() -> MatchState {
        let map = GameMap::all_grass(3);
        let first = vec![
            Tank::new(1, TankClass::Enhanced, Hex::new(0, -2)),
            Tank::new(2, TankClass::Regular, Hex::new(1, -2)),
            Tank::new(3, TankClass::Regular, Hex::new(-1, -2)),
        ];
        let second = vec![
            Tank::new(1, TankClass::Enhanced, Hex::new(0, 2)),
            Tank::new(2, TankClass::Regular, Hex::new(1, 2)),
            Tank::new(3, TankClass::Regular, Hex::new(-1, 2)),
        ];
        MatchState::with_armies(
            MatchId(7),
            map,
            (pid("p1"), first),
            (pid("p2"), second),
        )
    }

    fn serialized(state: &MatchState) -> String {
        let p1 = serde_json::to_string(&state.visible_state(&pid("p1")).unwrap()).unwrap();
        let p2 = serde_json::to_string(&state.visible_state(&pid("p2")).unwrap()).unwrap();
        format!("{p1}{p2}")
    }

    #[test]
    fn test_standard_match_setup() {
        let map = GameMap::generate(crate::map::MAP_RADIUS, 9);
        let state = MatchState::new(MatchId(1), map, pid("a"), pid("b"));
        assert_eq!(state.current_slot(), PlayerSlot::P1);
        assert_eq!(state.player(PlayerSlot::P1).home_row, -5);
        assert_eq!(state.player(PlayerSlot::P2).home_row, 5);
        for slot in [PlayerSlot::P1, PlayerSlot::P2] {
            let player = state.player(slot);
            assert_eq!(player.tanks.len(), 6);
            assert_eq!(player.movement_points, MOVEMENT_POINTS_PER_TURN);
            let enhanced = player
                .tanks
                .iter()
                .filter(|t| t.class == TankClass::Enhanced)
                .count();
            assert_eq!(enhanced, 2); // indices 0 and 3
            for tank in &player.tanks {
                assert_eq!(tank.position.r, player.home_row);
            }
        }
    }

    #[test]
    fn test_simple_move_decrements_budgets() {
        let mut state = scripted_match();
        // Regular tank of p1 advances one cell.
        let report = state
            .attempt_move(&pid("p1"), 2, Hex::new(1, -1))
            .unwrap();
        assert_eq!(report.from, Hex::new(1, -2));
        assert_eq!(report.to, Hex::new(1, -1));
        assert!(report.combat.is_none());
        assert!(!report.turn_ended);
        let player = state.player(PlayerSlot::P1);
        assert_eq!(player.movement_points, 4);
        assert_eq!(
            player.tanks[1].moves_remaining,
            MoveBudget::Limited(UNIT_MOVES_PER_TURN - 1)
        );
        assert_eq!(player.tanks[1].position, Hex::new(1, -1));
        // Relocation goes through the unit's own move operation, so the
        // departure cell lands in its history.
        assert_eq!(player.tanks[1].history, vec![Hex::new(1, -2)]);
    }

    #[test]
    fn test_illegal_destination_leaves_state_unchanged() {
        let mut state = scripted_match();
        let before = serialized(&state);
        let err = state
            .attempt_move(&pid("p1"), 1, Hex::new(3, -3))
            .unwrap_err();
        assert_eq!(err, MoveError::IllegalDestination);
        assert_eq!(serialized(&state), before);
    }

    #[test]
    fn test_not_current_player() {
        let mut state = scripted_match();
        assert_eq!(
            state.attempt_move(&pid("p2"), 1, Hex::new(0, 1)),
            Err(MoveError::NotCurrentPlayer)
        );
        assert_eq!(
            state.attempt_move(&pid("stranger"), 1, Hex::new(0, 1)),
            Err(MoveError::NotCurrentPlayer)
        );
    }

    #[test]
    fn test_unknown_unit() {
        let mut state = scripted_match();
        assert_eq!(
            state.attempt_move(&pid("p1"), 9, Hex::new(0, -1)),
            Err(MoveError::UnknownUnit)
        );
        // A destroyed tank is not selectable either.
        let mut state = scripted_match();
        state.players[0].tanks[0].destroyed = true;
        assert_eq!(
            state.attempt_move(&pid("p1"), 1, Hex::new(0, -1)),
            Err(MoveError::UnknownUnit)
        );
    }

    #[test]
    fn test_unit_budget_exhaustion() {
        let mut state = scripted_match();
        // Regular tank 2 of p1 may relocate three times, then runs dry while
        // the player-level budget still has points left.
        state.attempt_move(&pid("p1"), 2, Hex::new(1, -1)).unwrap();
        state.attempt_move(&pid("p1"), 2, Hex::new(1, 0)).unwrap();
        state.attempt_move(&pid("p1"), 2, Hex::new(1, 1)).unwrap();
        assert_eq!(state.player(PlayerSlot::P1).movement_points, 2);
        assert_eq!(
            state.attempt_move(&pid("p1"), 2, Hex::new(0, 2)),
            Err(MoveError::NoMovementBudget)
        );
    }

    #[test]
    fn test_restricted_tank_cannot_retreat() {
        let mut state = scripted_match();
        // p1's home row is -3; moving a regular tank back towards it is
        // outside the allowed direction subset.
        assert_eq!(
            state.attempt_move(&pid("p1"), 2, Hex::new(1, -3)),
            Err(MoveError::IllegalDestination)
        );
    }

    #[test]
    fn test_friendly_occupancy_rejected() {
        let mut state = scripted_match();
        // (0,-2) holds p1's tank 1; tank 2 at (1,-2) trying to enter fails.
        assert_eq!(
            state.attempt_move(&pid("p1"), 2, Hex::new(0, -2)),
            Err(MoveError::IllegalDestination)
        );
    }

    #[test]
    fn test_equal_strength_combat_destroys_both_without_relocation() {
        let map = GameMap::all_grass(3);
        let first = vec![
            Tank::new(1, TankClass::Regular, Hex::new(0, 0)),
            Tank::new(2, TankClass::Regular, Hex::new(2, -2)),
        ];
        let second = vec![
            Tank::new(1, TankClass::Regular, Hex::new(0, 1)),
            Tank::new(2, TankClass::Regular, Hex::new(-2, 2)),
        ];
        let mut state = MatchState::with_armies(
            MatchId(8),
            map,
            (pid("p1"), first),
            (pid("p2"), second),
        );

        let report = state.attempt_move(&pid("p1"), 1, Hex::new(0, 1)).unwrap();
        let combat = report.combat.unwrap();
        assert_eq!(combat.outcome, CombatOutcome::MutualDestruction);
        assert!(combat.attacker_destroyed);
        assert!(combat.defender_destroyed);
        // Attack from range: no relocation on a tie.
        assert_eq!(report.to, Hex::new(0, 0));
        assert!(state.player(PlayerSlot::P1).tanks[0].destroyed);
        assert!(state.player(PlayerSlot::P2).tanks[0].destroyed);
        // The movement point was still consumed.
        assert_eq!(state.player(PlayerSlot::P1).movement_points, 4);
    }

    #[test]
    fn test_winning_attacker_relocates() {
        let map = GameMap::all_grass(3);
        let first = vec![Tank::new(1, TankClass::Enhanced, Hex::new(0, 0))];
        let second = vec![
            Tank::new(1, TankClass::Regular, Hex::new(0, 1)),
            Tank::new(2, TankClass::Regular, Hex::new(-2, 2)),
        ];
        let mut state = MatchState::with_armies(
            MatchId(9),
            map,
            (pid("p1"), first),
            (pid("p2"), second),
        );

        let report = state.attempt_move(&pid("p1"), 1, Hex::new(0, 1)).unwrap();
        assert_eq!(report.combat.unwrap().outcome, CombatOutcome::SelfWins);
        assert_eq!(report.to, Hex::new(0, 1));
        assert_eq!(state.player(PlayerSlot::P1).tanks[0].position, Hex::new(0, 1));
        assert!(state.player(PlayerSlot::P2).tanks[0].destroyed);
    }

    #[test]
    fn test_turn_alternates_after_budget_exhaustion() {
        let mut state = scripted_match();
        let path = [
            Hex::new(0, -1),
            Hex::new(1, -1),
            Hex::new(2, -1),
            Hex::new(2, 0),
            Hex::new(1, 1),
        ];
        let mut from = Hex::new(0, -2);
        for (i, &step) in path.iter().enumerate() {
            assert_eq!(from.distance_to(step), 1, "step {i} not adjacent");
            let report = state.attempt_move(&pid("p1"), 1, step).unwrap();
            assert_eq!(report.turn_ended, i == path.len() - 1);
            from = step;
        }
        // Turn passed to p2 automatically, with a fresh budget.
        assert_eq!(state.current_slot(), PlayerSlot::P2);
        assert_eq!(state.player(PlayerSlot::P2).movement_points, 5);
        assert_eq!(state.turn(), 2);
        assert_eq!(
            state.attempt_move(&pid("p1"), 1, Hex::new(1, 0)),
            Err(MoveError::NotCurrentPlayer)
        );
    }

    #[test]
    fn test_voluntary_end_turn() {
        let mut state = scripted_match();
        assert_eq!(
            state.end_turn_voluntarily(&pid("p2")),
            Err(MoveError::NotCurrentPlayer)
        );
        state.end_turn_voluntarily(&pid("p1")).unwrap();
        assert_eq!(state.current_slot(), PlayerSlot::P2);
        assert_eq!(state.player(PlayerSlot::P2).movement_points, 5);
    }

    #[test]
    fn test_unit_budget_reset_on_turn_start() {
        let mut state = scripted_match();
        state.attempt_move(&pid("p1"), 2, Hex::new(1, -1)).unwrap();
        state.end_turn_voluntarily(&pid("p1")).unwrap();
        state.end_turn_voluntarily(&pid("p2")).unwrap();
        assert_eq!(
            state.player(PlayerSlot::P1).tanks[1].moves_remaining,
            MoveBudget::Limited(UNIT_MOVES_PER_TURN)
        );
    }

    #[test]
    fn test_reached_goal_upgrades_permanently() {
        let map = GameMap::all_grass(3);
        let first = vec![
            Tank::new(1, TankClass::Regular, Hex::new(0, 2)),
            Tank::new(2, TankClass::Regular, Hex::new(-2, -1)),
        ];
        let second = vec![Tank::new(1, TankClass::Regular, Hex::new(3, 0))];
        let mut state = MatchState::with_armies(
            MatchId(10),
            map,
            (pid("p1"), first),
            (pid("p2"), second),
        );

        // p1's goal row is +3 (negation of home row -3).
        let report = state.attempt_move(&pid("p1"), 1, Hex::new(0, 3)).unwrap();
        assert!(report.reached_goal);
        let tank = &state.player(PlayerSlot::P1).tanks[0];
        assert!(tank.reached_goal);
        assert_eq!(tank.moves_remaining, MoveBudget::Unlimited);
        assert_eq!(tank.effective_strength(), 2);
    }

    #[test]
    fn test_unrestricted_threshold_is_monotonic() {
        let map = GameMap::all_grass(3);
        let first = vec![Tank::new(1, TankClass::Enhanced, Hex::new(0, 0))];
        let second = vec![
            Tank::new(1, TankClass::Regular, Hex::new(0, 1)),
            Tank::new(2, TankClass::Regular, Hex::new(1, 0)),
            Tank::new(3, TankClass::Regular, Hex::new(-3, 2)),
        ];
        let mut state = MatchState::with_armies(
            MatchId(11),
            map,
            (pid("p1"), first),
            (pid("p2"), second),
        );

        // Threshold for 3 tanks is ceil(3/2) = 2.
        state.attempt_move(&pid("p1"), 1, Hex::new(0, 1)).unwrap();
        assert!(!state.player(PlayerSlot::P2).unrestricted);
        state.attempt_move(&pid("p1"), 1, Hex::new(1, 0)).unwrap();
        assert_eq!(state.player(PlayerSlot::P2).destroyed_tanks(), 2);
        assert!(state.player(PlayerSlot::P2).unrestricted);

        // Stays true across later turns.
        state.end_turn_voluntarily(&pid("p1")).unwrap();
        state.attempt_move(&pid("p2"), 3, Hex::new(-3, 1)).unwrap();
        assert!(state.player(PlayerSlot::P2).unrestricted);
    }

    #[test]
    fn test_game_over_and_further_moves_rejected() {
        let map = GameMap::all_grass(3);
        let first = vec![Tank::new(1, TankClass::Enhanced, Hex::new(0, 0))];
        let second = vec![Tank::new(1, TankClass::Regular, Hex::new(0, 1))];
        let mut state = MatchState::with_armies(
            MatchId(12),
            map,
            (pid("p1"), first),
            (pid("p2"), second),
        );

        let report = state.attempt_move(&pid("p1"), 1, Hex::new(0, 1)).unwrap();
        assert!(report.game_over);
        assert_eq!(report.winner, Some(pid("p1")));
        assert!(state.is_over());
        assert_eq!(state.winner(), Some(PlayerSlot::P1));
        assert_eq!(state.player(PlayerSlot::P1).wins, 1);
        assert_eq!(state.player(PlayerSlot::P2).losses, 1);

        for player in ["p1", "p2"] {
            assert_eq!(
                state.attempt_move(&pid(player), 1, Hex::new(1, 0)),
                Err(MoveError::GameAlreadyOver)
            );
            assert_eq!(
                state.end_turn_voluntarily(&pid(player)),
                Err(MoveError::GameAlreadyOver)
            );
        }
    }

    #[test]
    fn test_abandonment_declares_remaining_winner() {
        let mut state = scripted_match();
        state.abandon(PlayerSlot::P2);
        assert!(state.is_over());
        assert_eq!(state.winner_id(), Some(&pid("p2")));
        // Idempotent on a finished match.
        state.abandon(PlayerSlot::P1);
        assert_eq!(state.winner_id(), Some(&pid("p2")));
    }

    #[test]
    fn test_consistency_violation_is_fatal() {
        let map = GameMap::all_grass(3);
        let first = vec![
            Tank::new(1, TankClass::Regular, Hex::new(0, 0)),
            Tank::new(2, TankClass::Regular, Hex::new(0, 0)),
        ];
        let second = vec![Tank::new(1, TankClass::Regular, Hex::new(0, 2))];
        let mut state = MatchState::with_armies(
            MatchId(13),
            map,
            (pid("p1"), first),
            (pid("p2"), second),
        );

        let err = state
            .attempt_move(&pid("p1"), 1, Hex::new(0, 1))
            .unwrap_err();
        assert!(matches!(err, MoveError::Inconsistent(_)));
        assert_eq!(err.code(), "CONSISTENCY_VIOLATION");
        assert!(state.is_over());
        assert_eq!(state.winner(), None);
    }

    #[test]
    fn test_snapshot_hides_enemy_class() {
        let state = scripted_match();
        let snapshot = state.visible_state(&pid("p1")).unwrap();
        assert_eq!(snapshot.your_tanks.len(), 3);
        assert_eq!(snapshot.enemy_tanks.len(), 3);
        let json = serde_json::to_value(&snapshot).unwrap();
        for enemy in json["enemy_tanks"].as_array().unwrap() {
            assert!(enemy.get("class").is_none());
            assert!(enemy.get("moves_remaining").is_none());
            assert!(enemy.get("position").is_some());
            assert!(enemy.get("destroyed").is_some());
        }
        assert!(json["your_tanks"][0].get("class").is_some());
        assert!(state.visible_state(&pid("nobody")).is_none());
    }
}
