//! Terrain definitions and layered tile composition
//!
//! Scenario assets author maps as stacked layers (ground, walls,
//! features). Layers are composed into one effective tile per cell
//! before the battle starts; the simulation never sees layers.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::core::error::{GrimError, Result};
use crate::core::types::Vector2;

/// Identifier for a terrain definition in the tileset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TerrainId(pub u16);

/// Empty cell marker in authored layers; composes as "no override"
pub const TERRAIN_EMPTY: TerrainId = TerrainId(0);

/// Static properties of one terrain type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerrainDef {
    pub name: String,
    /// Cost to enter a tile of this terrain; ignored when blocking
    pub movement_cost: u32,
    /// Flat damage reduction granted to a defender standing here
    pub defense_bonus: i32,
    /// Avoid bonus, kept as a display stat (the core has no hit rolls)
    pub avoid_bonus: u32,
    pub blocks_vision: bool,
    pub blocks_movement: bool,
}

impl TerrainDef {
    pub fn new(name: impl Into<String>, movement_cost: u32) -> Self {
        Self {
            name: name.into(),
            movement_cost,
            defense_bonus: 0,
            avoid_bonus: 0,
            blocks_vision: false,
            blocks_movement: false,
        }
    }

    pub fn with_defense(mut self, defense_bonus: i32) -> Self {
        self.defense_bonus = defense_bonus;
        self
    }

    pub fn with_avoid(mut self, avoid_bonus: u32) -> Self {
        self.avoid_bonus = avoid_bonus;
        self
    }

    pub fn blocking(mut self) -> Self {
        self.blocks_movement = true;
        self
    }

    pub fn opaque(mut self) -> Self {
        self.blocks_vision = true;
        self
    }
}

/// One composed battlefield cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tile {
    pub terrain: TerrainId,
    pub movement_cost: u32,
    pub defense_bonus: i32,
    pub avoid_bonus: u32,
    pub blocks_vision: bool,
    pub blocks_movement: bool,
}

impl Tile {
    pub fn from_def(terrain: TerrainId, def: &TerrainDef) -> Self {
        Self {
            terrain,
            movement_cost: def.movement_cost,
            defense_bonus: def.defense_bonus,
            avoid_bonus: def.avoid_bonus,
            blocks_vision: def.blocks_vision,
            blocks_movement: def.blocks_movement,
        }
    }
}

/// Terrain catalog for a scenario
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tileset {
    defs: AHashMap<TerrainId, TerrainDef>,
}

pub const TERRAIN_PLAIN: TerrainId = TerrainId(1);
pub const TERRAIN_FOREST: TerrainId = TerrainId(2);
pub const TERRAIN_HILLS: TerrainId = TerrainId(3);
pub const TERRAIN_WALL: TerrainId = TerrainId(4);
pub const TERRAIN_WATER: TerrainId = TerrainId(5);
pub const TERRAIN_ROAD: TerrainId = TerrainId(6);

impl Tileset {
    pub fn empty() -> Self {
        Self { defs: AHashMap::new() }
    }

    /// The built-in terrain catalog used by tests and the demo scenario
    pub fn builtin() -> Self {
        let mut set = Self::empty();
        set.insert(TERRAIN_PLAIN, TerrainDef::new("Plain", 1));
        set.insert(
            TERRAIN_FOREST,
            TerrainDef::new("Forest", 2).with_defense(1).with_avoid(20).opaque(),
        );
        set.insert(
            TERRAIN_HILLS,
            TerrainDef::new("Hills", 2).with_defense(2).with_avoid(10),
        );
        set.insert(TERRAIN_WALL, TerrainDef::new("Wall", 1).blocking().opaque());
        set.insert(TERRAIN_WATER, TerrainDef::new("Water", 1).blocking());
        set.insert(TERRAIN_ROAD, TerrainDef::new("Road", 1));
        set
    }

    pub fn insert(&mut self, id: TerrainId, def: TerrainDef) {
        self.defs.insert(id, def);
    }

    pub fn get(&self, id: TerrainId) -> Option<&TerrainDef> {
        self.defs.get(&id)
    }

    pub fn require(&self, id: TerrainId, at: Vector2) -> Result<&TerrainDef> {
        self.defs.get(&id).ok_or_else(|| {
            GrimError::ScenarioLoad(format!("unknown terrain id {} at {}", id.0, at))
        })
    }
}

/// Compose stacked layers into effective tiles, row-major.
///
/// The bottom layer must cover every cell; higher layers override a
/// cell entirely when their entry is non-empty.
pub fn compose_layers(
    tileset: &Tileset,
    width: u32,
    height: u32,
    layers: &[Vec<u16>],
) -> Result<Vec<Tile>> {
    let cells = (width * height) as usize;
    if layers.is_empty() {
        return Err(GrimError::ScenarioLoad("map has no layers".into()));
    }
    for (i, layer) in layers.iter().enumerate() {
        if layer.len() != cells {
            return Err(GrimError::ScenarioLoad(format!(
                "layer {} has {} cells, expected {}",
                i,
                layer.len(),
                cells
            )));
        }
    }

    let mut tiles = Vec::with_capacity(cells);
    for idx in 0..cells {
        let at = Vector2::new((idx as u32 % width) as i32, (idx as u32 / width) as i32);

        let base = TerrainId(layers[0][idx]);
        if base == TERRAIN_EMPTY {
            return Err(GrimError::ScenarioLoad(format!(
                "ground layer is empty at {}",
                at
            )));
        }

        let mut effective = base;
        for layer in &layers[1..] {
            let over = TerrainId(layer[idx]);
            if over != TERRAIN_EMPTY {
                effective = over;
            }
        }

        let def = tileset.require(effective, at)?;
        tiles.push(Tile::from_def(effective, def));
    }
    Ok(tiles)
}
