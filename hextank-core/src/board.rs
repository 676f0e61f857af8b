//! Hex geometry with axial coordinates

use serde::{Deserialize, Serialize};

/// Axial hex coordinates. The third cubic coordinate `s = -q - r` is derived,
/// never stored.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Hex {
    pub q: i8,
    pub r: i8,
}

impl Hex {
    pub const fn new(q: i8, r: i8) -> Self {
        Self { q, r }
    }

    /// Derived cubic coordinate.
    pub const fn s(&self) -> i8 {
        -self.q - self.r
    }

    pub fn add(&self, delta: Hex) -> Hex {
        Hex::new(self.q + delta.q, self.r + delta.r)
    }

    /// Distance between two hexes, always a nonnegative integer.
    pub fn distance_to(&self, other: Hex) -> i8 {
        let dq = (self.q - other.q).abs();
        let dr = (self.r - other.r).abs();
        let ds = (self.s() - other.s()).abs();
        (dq + dr + ds) / 2
    }

    /// Get neighbor in direction (0-5)
    pub fn neighbor(&self, direction: u8) -> Hex {
        let (dq, dr) = DIRECTIONS[direction as usize % 6];
        Hex::new(self.q + dq, self.r + dr)
    }
}

/// Direction vectors in axial coordinates (dq, dr), indexed 0-5.
pub const DIRECTIONS: [(i8, i8); 6] = [
    (1, 0),
    (1, -1),
    (0, -1),
    (-1, 0),
    (-1, 1),
    (0, 1),
];
