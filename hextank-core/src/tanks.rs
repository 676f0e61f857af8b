//! Tank units: class data, movement legality and combat resolution.

use crate::board::Hex;
use crate::map::GameMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Tank identifier, unique within the owning player.
pub type TankId = u8;

/// Moves a single tank may make per turn before its budget runs out.
pub const UNIT_MOVES_PER_TURN: u8 = 3;

/// Tank classes. Behavior differences are data in [`TANK_CLASSES`], not
/// subtypes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TankClass {
    Regular,
    Enhanced,
}

/// Per-class combat/movement data.
#[derive(Clone, Copy, Debug)]
pub struct TankClassData {
    pub base_strength: u8,
    /// Whether the class is bound by direction restrictions and the per-turn
    /// unit move budget.
    pub restricted: bool,
}

pub static TANK_CLASSES: [TankClassData; 2] = [
    // Regular
    TankClassData {
        base_strength: 1,
        restricted: true,
    },
    // Enhanced
    TankClassData {
        base_strength: 2,
        restricted: false,
    },
];

impl TankClass {
    pub fn data(self) -> &'static TankClassData {
        &TANK_CLASSES[self as usize]
    }
}

/// Direction subsets a restricted tank may use, by home side. The side whose
/// home row is +R advances towards -r (directions 0..=2); the -R side gets
/// the complement. Tanks advance, they don't retreat.
pub fn allowed_directions(home_row: i8) -> &'static [u8; 3] {
    if home_row > 0 {
        &[0, 1, 2]
    } else {
        &[3, 4, 5]
    }
}

/// Per-turn movement budget. Tagged rather than a numeric infinity sentinel,
/// so the arithmetic stays total.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MoveBudget {
    Limited(u8),
    Unlimited,
}

impl MoveBudget {
    pub fn is_exhausted(self) -> bool {
        matches!(self, MoveBudget::Limited(0))
    }

    pub fn spend(&mut self) {
        if let MoveBudget::Limited(n) = self {
            *n = n.saturating_sub(1);
        }
    }
}

#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum TankError {
    #[error("destination is not a valid move for this tank")]
    InvalidMove,
}

/// Outcome of a combat resolution, from the moving tank's perspective.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CombatOutcome {
    SelfWins,
    OtherWins,
    MutualDestruction,
}

/// A player-owned combat piece.
#[derive(Clone, Debug)]
pub struct Tank {
    pub id: TankId,
    pub class: TankClass,
    pub position: Hex,
    /// Permanent once set: the tank crossed to the opponent's home row.
    pub reached_goal: bool,
    /// Permanent once set.
    pub destroyed: bool,
    /// Prior positions, oldest first.
    pub history: Vec<Hex>,
    pub moves_remaining: MoveBudget,
}

impl Tank {
    pub fn new(id: TankId, class: TankClass, position: Hex) -> Self {
        let moves_remaining = if class.data().restricted {
            MoveBudget::Limited(UNIT_MOVES_PER_TURN)
        } else {
            MoveBudget::Unlimited
        };
        Self {
            id,
            class,
            position,
            reached_goal: false,
            destroyed: false,
            history: Vec::new(),
            moves_remaining,
        }
    }

    /// Direction restrictions apply only to base-class tanks that have not
    /// upgraded and whose owner has not crossed the destroyed-majority
    /// threshold.
    pub fn is_restricted(&self, owner_unrestricted: bool) -> bool {
        self.class.data().restricted && !self.reached_goal && !owner_unrestricted
    }

    /// Board-legal destinations: passable adjacent cells, restricted to the
    /// owner's advance directions while the tank is restricted, minus the
    /// second-to-last visited position (no immediate back-and-forth).
    /// Destroyed tanks have none. Turn ownership and budgets are the match
    /// state's concern, not checked here.
    pub fn valid_destinations(
        &self,
        map: &GameMap,
        home_row: i8,
        owner_unrestricted: bool,
    ) -> Vec<Hex> {
        if self.destroyed {
            return Vec::new();
        }

        let directions: &[u8] = if self.is_restricted(owner_unrestricted) {
            allowed_directions(home_row)
        } else {
            &[0, 1, 2, 3, 4, 5]
        };

        let mut destinations: Vec<Hex> = directions
            .iter()
            .map(|&d| self.position.neighbor(d))
            .filter(|&n| map.is_passable(n))
            .collect();

        if self.history.len() >= 2 {
            let backtrack = self.history[self.history.len() - 2];
            destinations.retain(|&d| d != backtrack);
        }

        destinations
    }

    /// Relocate to `destination`, recording the old position. Fails if the
    /// destination is not in [`Tank::valid_destinations`].
    pub fn move_to(
        &mut self,
        map: &GameMap,
        destination: Hex,
        home_row: i8,
        owner_unrestricted: bool,
    ) -> Result<(), TankError> {
        if !self
            .valid_destinations(map, home_row, owner_unrestricted)
            .contains(&destination)
        {
            return Err(TankError::InvalidMove);
        }
        self.history.push(self.position);
        self.position = destination;
        Ok(())
    }

    /// True iff the tank stands on the far edge (the negation of its own
    /// home row).
    pub fn reaches_goal(&self, home_row: i8) -> bool {
        self.position.r == -home_row
    }

    /// Base strength, doubled once the tank has reached the goal.
    pub fn effective_strength(&self) -> u8 {
        let base = self.class.data().base_strength;
        if self.reached_goal {
            base * 2
        } else {
            base
        }
    }
}

/// Deterministic combat: equal effective strengths destroy both tanks,
/// otherwise only the weaker one. Destroyed flags are flipped here as part
/// of resolution. Ties are mutual destruction on purpose; never replace this
/// with a coin flip or first-mover preference.
pub fn resolve_combat(attacker: &mut Tank, defender: &mut Tank) -> CombatOutcome {
    let a = attacker.effective_strength();
    let d = defender.effective_strength();
    if a == d {
        attacker.destroyed = true;
        defender.destroyed = true;
        CombatOutcome::MutualDestruction
    } else if a > d {
        defender.destroyed = true;
        CombatOutcome::SelfWins
    } else {
        attacker.destroyed = true;
        CombatOutcome::OtherWins
    }
}
