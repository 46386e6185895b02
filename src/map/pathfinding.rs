//! Pathfinding and range queries over the battle grid
//!
//! Dijkstra for movement reachability (bounded by movement points),
//! A* for concrete paths, Manhattan rings for attack range. Equal-cost
//! alternatives break ties toward lower y, then lower x, so results
//! are reproducible.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use ahash::AHashMap;

use crate::core::types::Vector2;
use crate::map::grid::GameMap;

/// Node in the open set; min-heap on (cost, y, x)
#[derive(Debug, Clone, PartialEq, Eq)]
struct PathNode {
    cost: u32,
    pos: Vector2,
}

impl Ord for PathNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed for BinaryHeap's max-heap; Vector2 orders (y, x)
        other
            .cost
            .cmp(&self.cost)
            .then_with(|| other.pos.cmp(&self.pos))
    }
}

impl PartialOrd for PathNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Tiles reachable from `start` within `movement_points`, excluding the
/// start tile and any tile where `occupied` holds.
///
/// Units of every team block movement; they just never block attacks.
/// The result is sorted row-major.
pub fn reachable_tiles(
    map: &GameMap,
    start: Vector2,
    movement_points: u32,
    occupied: &dyn Fn(Vector2) -> bool,
) -> Vec<Vector2> {
    let mut best: AHashMap<Vector2, u32> = AHashMap::new();
    let mut heap = BinaryHeap::new();
    best.insert(start, 0);
    heap.push(PathNode { cost: 0, pos: start });

    while let Some(PathNode { cost, pos }) = heap.pop() {
        if cost > *best.get(&pos).unwrap_or(&u32::MAX) {
            continue;
        }
        for next in pos.neighbors() {
            if !map.is_walkable(next) || occupied(next) {
                continue;
            }
            let step = match map.tile(next) {
                Some(tile) => tile.movement_cost,
                None => continue,
            };
            let total = cost.saturating_add(step);
            if total > movement_points {
                continue;
            }
            if total < *best.get(&next).unwrap_or(&u32::MAX) {
                best.insert(next, total);
                heap.push(PathNode { cost: total, pos: next });
            }
        }
    }

    let mut tiles: Vec<Vector2> = best
        .into_iter()
        .map(|(pos, _)| pos)
        .filter(|pos| *pos != start)
        .collect();
    tiles.sort();
    tiles
}

/// A* path from `start` to `goal`, or None when unreachable.
///
/// The returned path includes both endpoints.
pub fn find_path(
    map: &GameMap,
    start: Vector2,
    goal: Vector2,
    occupied: &dyn Fn(Vector2) -> bool,
) -> Option<Vec<Vector2>> {
    if start == goal {
        return Some(vec![start]);
    }
    if !map.is_walkable(goal) || occupied(goal) {
        return None;
    }

    let mut open = BinaryHeap::new();
    let mut came_from: AHashMap<Vector2, Vector2> = AHashMap::new();
    let mut g_scores: AHashMap<Vector2, u32> = AHashMap::new();

    g_scores.insert(start, 0);
    open.push(PathNode { cost: start.manhattan_distance(goal), pos: start });

    while let Some(PathNode { pos, .. }) = open.pop() {
        if pos == goal {
            return Some(reconstruct_path(&came_from, pos));
        }
        let current_g = *g_scores.get(&pos).unwrap_or(&u32::MAX);

        for next in pos.neighbors() {
            if next != goal && occupied(next) {
                continue;
            }
            if !map.is_walkable(next) {
                continue;
            }
            let step = match map.tile(next) {
                Some(tile) => tile.movement_cost,
                None => continue,
            };
            let tentative = current_g.saturating_add(step);
            if tentative < *g_scores.get(&next).unwrap_or(&u32::MAX) {
                came_from.insert(next, pos);
                g_scores.insert(next, tentative);
                open.push(PathNode {
                    cost: tentative + next.manhattan_distance(goal),
                    pos: next,
                });
            }
        }
    }

    None
}

fn reconstruct_path(came_from: &AHashMap<Vector2, Vector2>, mut current: Vector2) -> Vec<Vector2> {
    let mut path = vec![current];
    while let Some(&prev) = came_from.get(&current) {
        path.push(prev);
        current = prev;
    }
    path.reverse();
    path
}

/// Cost of walking a path: the sum of entry costs of every tile after
/// the first.
pub fn path_cost(map: &GameMap, path: &[Vector2]) -> u32 {
    path.iter()
        .skip(1)
        .filter_map(|pos| map.tile(*pos))
        .map(|tile| tile.movement_cost)
        .sum()
}

/// Tiles at Manhattan distance in `[range_min, range_max]` of `from`,
/// clipped to the map, sorted row-major. Line of sight is not consulted.
pub fn attack_range_tiles(
    map: &GameMap,
    from: Vector2,
    range_min: u32,
    range_max: u32,
) -> Vec<Vector2> {
    let mut tiles = Vec::new();
    let r = range_max as i32;
    for dy in -r..=r {
        for dx in -r..=r {
            let pos = Vector2::new(from.x + dx, from.y + dy);
            let dist = from.manhattan_distance(pos);
            if dist >= range_min && dist <= range_max && map.in_bounds(pos) {
                tiles.push(pos);
            }
        }
    }
    tiles.sort();
    tiles
}
