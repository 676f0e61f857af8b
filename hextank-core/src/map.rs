//! Terrain maps: a fixed-radius hexagonal region with per-cell terrain.
//!
//! A map is created once per match and never mutates afterwards. Passability
//! is a pure function of terrain kind.

use crate::board::{Hex, DIRECTIONS};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Board radius used for standard matches.
pub const MAP_RADIUS: i8 = 5;

/// Terrain kinds. Only grass is passable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TerrainKind {
    Grass,
    Water,
    Mountain,
}

impl TerrainKind {
    pub fn is_passable(self) -> bool {
        matches!(self, TerrainKind::Grass)
    }
}

#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum MapError {
    #[error("coordinate ({}, {}) is outside the board", .0.q, .0.r)]
    OutOfBounds(Hex),
}

/// Hexagonal terrain map of a given radius.
#[derive(Clone, Debug)]
pub struct GameMap {
    radius: i8,
    terrain: FxHashMap<Hex, TerrainKind>,
}

impl GameMap {
    /// Generate a balanced map: terrain is drawn with weights
    /// grass 8 / water 1 / mountain 1 and mirrored through the origin, so
    /// both sides face the same obstacles. Home rows are forced to grass so
    /// starting placements always exist. Deterministic for a given seed.
    pub fn generate(radius: i8, seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut terrain = FxHashMap::default();

        for hex in hexes_within(radius) {
            if terrain.contains_key(&hex) {
                continue; // already set via its mirror
            }
            let kind = match rng.gen_range(0..10) {
                0..=7 => TerrainKind::Grass,
                8 => TerrainKind::Water,
                _ => TerrainKind::Mountain,
            };
            terrain.insert(hex, kind);
            terrain.insert(Hex::new(-hex.q, -hex.r), kind);
        }

        // Home rows must be passable for tank placement.
        for (hex, kind) in terrain.iter_mut() {
            if hex.r.abs() == radius {
                *kind = TerrainKind::Grass;
            }
        }

        Self { radius, terrain }
    }

    /// All-grass map, used for tests and scripted scenarios.
    pub fn all_grass(radius: i8) -> Self {
        let terrain = hexes_within(radius)
            .map(|hex| (hex, TerrainKind::Grass))
            .collect();
        Self { radius, terrain }
    }

    pub fn radius(&self) -> i8 {
        self.radius
    }

    /// A coordinate is on the board iff |q|, |r| and |q + r| are all within
    /// the radius.
    pub fn contains(&self, hex: Hex) -> bool {
        hex.q.abs() <= self.radius
            && hex.r.abs() <= self.radius
            && (hex.q + hex.r).abs() <= self.radius
    }

    pub fn terrain_at(&self, hex: Hex) -> Result<TerrainKind, MapError> {
        self.terrain
            .get(&hex)
            .copied()
            .ok_or(MapError::OutOfBounds(hex))
    }

    /// False for out-of-bounds coordinates and for water/mountain cells.
    pub fn is_passable(&self, hex: Hex) -> bool {
        self.terrain
            .get(&hex)
            .is_some_and(|kind| kind.is_passable())
    }

    /// Board-contained neighbors in direction order 0..5 (stable for
    /// deterministic display and testing).
    pub fn neighbors_of(&self, hex: Hex) -> Vec<Hex> {
        DIRECTIONS
            .iter()
            .map(|&(dq, dr)| Hex::new(hex.q + dq, hex.r + dr))
            .filter(|&n| self.contains(n))
            .collect()
    }

    pub fn cells(&self) -> impl Iterator<Item = (Hex, TerrainKind)> + '_ {
        self.terrain.iter().map(|(&hex, &kind)| (hex, kind))
    }

    /// Passable cells of a home row, in ascending q order.
    pub fn home_row_cells(&self, row: i8) -> Vec<Hex> {
        let mut cells: Vec<Hex> = self
            .terrain
            .iter()
            .filter(|(hex, kind)| hex.r == row && kind.is_passable())
            .map(|(&hex, _)| hex)
            .collect();
        cells.sort_by_key(|hex| hex.q);
        cells
    }
}

/// All hexes of the radius-R region, row-major.
fn hexes_within(radius: i8) -> impl Iterator<Item = Hex> {
    (-radius..=radius).flat_map(move |q| {
        (-radius..=radius)
            .map(move |r| Hex::new(q, r))
            .filter(move |h| (h.q + h.r).abs() <= radius)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_containment_matches_invariant() {
        let map = GameMap::all_grass(2);
        for q in -4..=4i8 {
            for r in -4..=4i8 {
                let hex = Hex::new(q, r);
                let expected = q.abs() <= 2 && r.abs() <= 2 && (q + r).abs() <= 2;
                assert_eq!(map.contains(hex), expected, "({q}, {r})");
            }
        }
    }

    #[test]
    fn test_cell_count() {
        // A radius-R hexagon has 3R(R+1)+1 cells.
        for radius in 1..=5i8 {
            let map = GameMap::all_grass(radius);
            let expected = 3 * radius as usize * (radius as usize + 1) + 1;
            assert_eq!(map.cells().count(), expected);
        }
    }

    #[test]
    fn test_terrain_at_out_of_bounds() {
        let map = GameMap::all_grass(3);
        let outside = Hex::new(4, 0);
        assert_eq!(map.terrain_at(outside), Err(MapError::OutOfBounds(outside)));
        assert!(!map.is_passable(outside));
    }

    #[test]
    fn test_generation_is_mirrored_and_seeded() {
        let map = GameMap::generate(MAP_RADIUS, 42);
        let again = GameMap::generate(MAP_RADIUS, 42);
        for (hex, kind) in map.cells() {
            let mirror = Hex::new(-hex.q, -hex.r);
            assert_eq!(map.terrain_at(mirror), Ok(kind));
            assert_eq!(again.terrain_at(hex), Ok(kind));
        }
    }

    #[test]
    fn test_home_rows_are_grass() {
        for seed in 0..20 {
            let map = GameMap::generate(MAP_RADIUS, seed);
            for row in [MAP_RADIUS, -MAP_RADIUS] {
                let cells = map.home_row_cells(row);
                assert_eq!(cells.len(), MAP_RADIUS as usize + 1);
                for hex in cells {
                    assert_eq!(map.terrain_at(hex), Ok(TerrainKind::Grass));
                }
            }
        }
    }

    #[test]
    fn test_neighbors_of_corner() {
        let map = GameMap::all_grass(2);
        // A corner cell has fewer than 6 on-board neighbors.
        let corner = Hex::new(2, 0);
        let neighbors = map.neighbors_of(corner);
        assert!(neighbors.len() < 6);
        for n in neighbors {
            assert!(map.contains(n));
            assert_eq!(corner.distance_to(n), 1);
        }
        assert_eq!(map.neighbors_of(Hex::new(0, 0)).len(), 6);
    }
}
