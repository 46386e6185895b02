pub mod grid;
pub mod pathfinding;
pub mod tileset;

pub use grid::GameMap;
pub use tileset::{Tile, TerrainDef, TerrainId, Tileset};
