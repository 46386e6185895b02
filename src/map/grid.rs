//! Battlefield grid with tile storage and a unit occupancy index
//!
//! The grid owns tiles; unit positions are authoritative on the
//! Movement component, with the occupancy index kept consistent by the
//! movement paths that mutate positions.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::core::types::{EntityId, Vector2};
use crate::map::tileset::{Tile, Tileset, TERRAIN_PLAIN};

/// Rectangular battle map
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameMap {
    pub width: u32,
    pub height: u32,
    tiles: Vec<Tile>,
    /// Derived position index, rebuilt after deserialization
    #[serde(skip)]
    occupancy: AHashMap<Vector2, EntityId>,
}

impl GameMap {
    /// Create an open map filled with plain terrain
    pub fn open(width: u32, height: u32) -> Self {
        let tileset = Tileset::builtin();
        let plain = Tile::from_def(
            TERRAIN_PLAIN,
            tileset.get(TERRAIN_PLAIN).expect("builtin tileset has plain"),
        );
        Self {
            width,
            height,
            tiles: vec![plain; (width * height) as usize],
            occupancy: AHashMap::new(),
        }
    }

    /// Create a map from pre-composed tiles (row-major, width*height)
    pub fn from_tiles(width: u32, height: u32, tiles: Vec<Tile>) -> Self {
        debug_assert_eq!(tiles.len(), (width * height) as usize);
        Self { width, height, tiles, occupancy: AHashMap::new() }
    }

    pub fn in_bounds(&self, pos: Vector2) -> bool {
        pos.x >= 0 && pos.y >= 0 && pos.x < self.width as i32 && pos.y < self.height as i32
    }

    fn index(&self, pos: Vector2) -> usize {
        (pos.y as u32 * self.width + pos.x as u32) as usize
    }

    pub fn tile(&self, pos: Vector2) -> Option<&Tile> {
        if self.in_bounds(pos) {
            self.tiles.get(self.index(pos))
        } else {
            None
        }
    }

    pub fn tile_mut(&mut self, pos: Vector2) -> Option<&mut Tile> {
        if self.in_bounds(pos) {
            let idx = self.index(pos);
            self.tiles.get_mut(idx)
        } else {
            None
        }
    }

    /// Replace the tile at a position (scenario overrides, tests)
    pub fn set_tile(&mut self, pos: Vector2, tile: Tile) {
        if let Some(slot) = self.tile_mut(pos) {
            *slot = tile;
        }
    }

    // --- occupancy index ---

    pub fn occupant(&self, pos: Vector2) -> Option<EntityId> {
        self.occupancy.get(&pos).copied()
    }

    pub fn is_occupied(&self, pos: Vector2) -> bool {
        self.occupancy.contains_key(&pos)
    }

    pub fn place_unit(&mut self, pos: Vector2, id: EntityId) {
        self.occupancy.insert(pos, id);
    }

    pub fn vacate(&mut self, pos: Vector2) -> Option<EntityId> {
        self.occupancy.remove(&pos)
    }

    pub fn move_occupant(&mut self, from: Vector2, to: Vector2, id: EntityId) {
        self.occupancy.remove(&from);
        self.occupancy.insert(to, id);
    }

    /// Rebuild the occupancy index from authoritative unit positions
    pub fn reindex(&mut self, positions: impl Iterator<Item = (EntityId, Vector2)>) {
        self.occupancy.clear();
        for (id, pos) in positions {
            self.occupancy.insert(pos, id);
        }
    }

    /// A tile a unit could ever stand on: in bounds and not terrain-blocked
    pub fn is_walkable(&self, pos: Vector2) -> bool {
        self.tile(pos).map(|t| !t.blocks_movement).unwrap_or(false)
    }

    /// Line of sight via a supercover line walk, endpoints excluded
    pub fn has_line_of_sight(&self, from: Vector2, to: Vector2) -> bool {
        for pos in line_between(from, to) {
            if pos == from || pos == to {
                continue;
            }
            if let Some(tile) = self.tile(pos) {
                if tile.blocks_vision {
                    return false;
                }
            }
        }
        true
    }
}

/// Bresenham line from `from` to `to`, inclusive.
fn line_between(from: Vector2, to: Vector2) -> Vec<Vector2> {
    let mut points = Vec::new();
    let dx = (to.x - from.x).abs();
    let dy = -(to.y - from.y).abs();
    let sx = if from.x < to.x { 1 } else { -1 };
    let sy = if from.y < to.y { 1 } else { -1 };
    let mut err = dx + dy;
    let mut current = from;

    loop {
        points.push(current);
        if current == to {
            break;
        }
        let doubled = 2 * err;
        if doubled >= dy {
            err += dy;
            current.x += sx;
        }
        if doubled <= dx {
            err += dx;
            current.y += sy;
        }
    }
    points
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::tileset::{Tile, TERRAIN_WALL};

    fn wall_tile() -> Tile {
        let set = Tileset::builtin();
        Tile::from_def(TERRAIN_WALL, set.get(TERRAIN_WALL).unwrap())
    }

    #[test]
    fn test_open_map_bounds() {
        let map = GameMap::open(8, 6);
        assert!(map.in_bounds(Vector2::new(0, 0)));
        assert!(map.in_bounds(Vector2::new(7, 5)));
        assert!(!map.in_bounds(Vector2::new(8, 0)));
        assert!(!map.in_bounds(Vector2::new(0, -1)));
    }

    #[test]
    fn test_tile_lookup_out_of_bounds() {
        let map = GameMap::open(4, 4);
        assert!(map.tile(Vector2::new(10, 10)).is_none());
    }

    #[test]
    fn test_occupancy_roundtrip() {
        let mut map = GameMap::open(4, 4);
        let id = EntityId(1);
        map.place_unit(Vector2::new(1, 1), id);
        assert_eq!(map.occupant(Vector2::new(1, 1)), Some(id));

        map.move_occupant(Vector2::new(1, 1), Vector2::new(2, 1), id);
        assert!(!map.is_occupied(Vector2::new(1, 1)));
        assert_eq!(map.occupant(Vector2::new(2, 1)), Some(id));
    }

    #[test]
    fn test_walkable_respects_blocking() {
        let mut map = GameMap::open(4, 4);
        map.set_tile(Vector2::new(2, 2), wall_tile());
        assert!(map.is_walkable(Vector2::new(1, 1)));
        assert!(!map.is_walkable(Vector2::new(2, 2)));
        assert!(!map.is_walkable(Vector2::new(-1, 0)));
    }

    #[test]
    fn test_line_of_sight_open() {
        let map = GameMap::open(8, 8);
        assert!(map.has_line_of_sight(Vector2::new(0, 0), Vector2::new(5, 0)));
    }

    #[test]
    fn test_line_of_sight_blocked_by_wall() {
        let mut map = GameMap::open(8, 8);
        map.set_tile(Vector2::new(2, 0), wall_tile());
        assert!(!map.has_line_of_sight(Vector2::new(0, 0), Vector2::new(5, 0)));
    }

    #[test]
    fn test_line_of_sight_ignores_endpoints() {
        let mut map = GameMap::open(8, 8);
        map.set_tile(Vector2::new(0, 0), wall_tile());
        map.set_tile(Vector2::new(3, 0), wall_tile());
        assert!(map.has_line_of_sight(Vector2::new(0, 0), Vector2::new(3, 0)));
    }

    #[test]
    fn test_reindex_rebuilds_occupancy() {
        let mut map = GameMap::open(4, 4);
        map.place_unit(Vector2::new(0, 0), EntityId(9));
        map.reindex(vec![(EntityId(1), Vector2::new(3, 3))].into_iter());
        assert!(!map.is_occupied(Vector2::new(0, 0)));
        assert_eq!(map.occupant(Vector2::new(3, 3)), Some(EntityId(1)));
    }
}
