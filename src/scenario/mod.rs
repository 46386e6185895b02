//! Scenario plans and battle-init materialization
//!
//! A ScenarioPlan is the loader-facing description of a battle: layered
//! map, tileset, unit roster, named markers and regions, placements,
//! objectives, and settings. Materialization resolves every placement
//! to a concrete tile and populates GameState; markers and regions are
//! never consulted again after init.

use std::collections::BTreeMap;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::ai::AiPersonality;
use crate::battle::hazards::Hazard;
use crate::battle::objectives::{ObjectivePredicate, ObjectiveSet};
use crate::battle::state::GameState;
use crate::core::config::SimulationConfig;
use crate::core::error::{GrimError, Result};
use crate::core::rng;
use crate::core::types::{Team, Tick, Vector2, Weight};
use crate::entity::components::AiComponent;
use crate::entity::unit::UnitClass;
use crate::map::tileset::{compose_layers, Tileset};
use crate::map::GameMap;
use crate::timeline::EntryKind;

/// Per-unit stat adjustments over the class template
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatOverrides {
    pub hp: Option<i32>,
    pub strength: Option<i32>,
    pub defense: Option<i32>,
    pub speed: Option<u32>,
    pub movement: Option<u32>,
    pub range_min: Option<u32>,
    pub range_max: Option<u32>,
    pub crit_chance: Option<u32>,
}

/// A unit the scenario wants on the field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitDef {
    pub name: String,
    pub class: UnitClass,
    pub team: Team,
    #[serde(default)]
    pub overrides: StatOverrides,
    /// AI temperament; None leaves the unit human-controlled
    #[serde(default)]
    pub personality: Option<AiPersonality>,
}

/// Rectangular named region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl Rect {
    pub fn contains(&self, pos: Vector2) -> bool {
        pos.x >= self.x && pos.x < self.x + self.w && pos.y >= self.y && pos.y < self.y + self.h
    }
}

/// How units land inside a region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlacementPolicy {
    RandomFreeTile,
    SpreadEvenly,
}

/// Where one named unit goes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PlacementSpec {
    At(Vector2),
    AtMarker(String),
    AtRegion { region: String, policy: PlacementPolicy },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    pub target_name: String,
    pub spec: PlacementSpec,
}

/// A hazard the scenario seeds onto the field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HazardDef {
    pub name: String,
    pub position: Vector2,
    pub potency: i32,
    pub period: Weight,
    pub charges: u32,
}

/// Tile replacement applied after layer composition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TilePatch {
    pub position: Vector2,
    pub terrain: u16,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioSettings {
    pub turn_limit: Option<Tick>,
    pub starting_team: Team,
    pub fog_of_war: bool,
}

impl Default for ScenarioSettings {
    fn default() -> Self {
        Self { turn_limit: None, starting_team: Team::Player, fog_of_war: false }
    }
}

/// The loader-facing battle description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioPlan {
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub tileset: Tileset,
    /// Ground first; higher layers override non-zero cells
    pub map_layers: Vec<Vec<u16>>,
    pub unit_defs: Vec<UnitDef>,
    pub markers: BTreeMap<String, Vector2>,
    pub regions: BTreeMap<String, Rect>,
    pub placements: Vec<Placement>,
    pub hazards: Vec<HazardDef>,
    pub victory: Vec<ObjectivePredicate>,
    pub defeat: Vec<ObjectivePredicate>,
    pub settings: ScenarioSettings,
    pub overrides: Vec<TilePatch>,
}

fn load_err(text: impl Into<String>) -> GrimError {
    GrimError::ScenarioLoad(text.into())
}

/// Resolve a plan into a playable GameState.
pub fn materialize(plan: &ScenarioPlan, seed: u64) -> Result<GameState> {
    if plan.width == 0 || plan.height == 0 || plan.width > 64 || plan.height > 64 {
        return Err(load_err(format!("map size {}x{} out of range", plan.width, plan.height)));
    }

    let tiles = compose_layers(&plan.tileset, plan.width, plan.height, &plan.map_layers)?;
    let mut map = GameMap::from_tiles(plan.width, plan.height, tiles);

    for patch in &plan.overrides {
        if !map.in_bounds(patch.position) {
            return Err(load_err(format!("tile patch outside the map at {}", patch.position)));
        }
        let def = plan
            .tileset
            .require(crate::map::tileset::TerrainId(patch.terrain), patch.position)?;
        map.set_tile(
            patch.position,
            crate::map::tileset::Tile::from_def(
                crate::map::tileset::TerrainId(patch.terrain),
                def,
            ),
        );
    }

    let config = SimulationConfig::default();
    config.validate().map_err(load_err)?;
    let mut state = GameState::new(map, config, seed, plan.name.clone());
    let mut placement_rng = rng::placement_stream(seed);

    // Every unit must have exactly one placement and every placement a unit
    for placement in &plan.placements {
        if !plan.unit_defs.iter().any(|d| d.name == placement.target_name) {
            return Err(load_err(format!("placement for unknown unit '{}'", placement.target_name)));
        }
    }

    for def in &plan.unit_defs {
        let placement = plan
            .placements
            .iter()
            .find(|p| p.target_name == def.name)
            .ok_or_else(|| load_err(format!("unit '{}' has no placement", def.name)))?;

        let position = resolve_placement(&state, plan, &placement.spec, &mut placement_rng)?;
        let id = state.spawn(def.name.clone(), def.class, def.team, position);

        let unit = state
            .unit_mut(id)
            .ok_or_else(|| load_err("freshly spawned unit vanished"))?;
        apply_overrides(unit, &def.overrides);
        if let Some(personality) = def.personality {
            unit.ai = Some(AiComponent::new(personality));
        }
    }

    // Opening schedule: everyone enters at their speed, roster order
    let initial: Vec<(crate::core::types::EntityId, Tick)> = state
        .units()
        .iter()
        .map(|u| (u.id, u.movement.speed as Tick))
        .collect();
    for (id, ready) in initial {
        state.timeline.schedule(EntryKind::Unit(id), ready, "Ready");
    }

    for (index, def) in plan.hazards.iter().enumerate() {
        if !state.map.in_bounds(def.position) {
            return Err(load_err(format!("hazard '{}' outside the map", def.name)));
        }
        let hazard = Hazard {
            id: index as u32,
            name: def.name.clone(),
            position: def.position,
            potency: def.potency,
            period: def.period,
            charges: def.charges,
        };
        state.timeline.schedule(
            EntryKind::Hazard(hazard.id),
            def.period as Tick,
            def.name.clone(),
        );
        state.hazards.push(hazard);
    }

    let mut defeat = plan.defeat.clone();
    if let Some(limit) = plan.settings.turn_limit {
        defeat.push(ObjectivePredicate::TurnLimit { limit_tick: limit });
    }
    state.objectives = ObjectiveSet::new(plan.victory.clone(), defeat);

    Ok(state)
}

fn apply_overrides(unit: &mut crate::entity::unit::Unit, overrides: &StatOverrides) {
    if let Some(hp) = overrides.hp {
        unit.health.hp_max = hp;
        unit.health.hp_current = hp;
    }
    if let Some(strength) = overrides.strength {
        unit.combat.strength = strength;
    }
    if let Some(defense) = overrides.defense {
        unit.combat.defense = defense;
    }
    if let Some(speed) = overrides.speed {
        unit.movement.speed = speed;
    }
    if let Some(movement) = overrides.movement {
        unit.movement.movement_base = movement;
        unit.movement.movement_points = movement;
    }
    if let Some(range_min) = overrides.range_min {
        unit.combat.range_min = range_min;
    }
    if let Some(range_max) = overrides.range_max {
        unit.combat.range_max = range_max;
    }
    if let Some(crit) = overrides.crit_chance {
        unit.combat.crit_chance = crit;
    }
}

/// Free, walkable tiles of a region in row-major order
fn free_tiles_in(state: &GameState, rect: Rect) -> Vec<Vector2> {
    let mut tiles = Vec::new();
    for y in rect.y..rect.y + rect.h {
        for x in rect.x..rect.x + rect.w {
            let pos = Vector2::new(x, y);
            if state.map.is_walkable(pos) && !state.map.is_occupied(pos) {
                tiles.push(pos);
            }
        }
    }
    tiles
}

fn resolve_placement(
    state: &GameState,
    plan: &ScenarioPlan,
    spec: &PlacementSpec,
    placement_rng: &mut rand_chacha::ChaCha8Rng,
) -> Result<Vector2> {
    match spec {
        PlacementSpec::At(pos) => {
            if !state.map.is_walkable(*pos) {
                return Err(load_err(format!("placement at {} is not walkable", pos)));
            }
            if state.map.is_occupied(*pos) {
                return Err(load_err(format!("placement at {} is already taken", pos)));
            }
            Ok(*pos)
        }
        PlacementSpec::AtMarker(name) => {
            let pos = plan
                .markers
                .get(name)
                .ok_or_else(|| load_err(format!("unknown marker '{}'", name)))?;
            resolve_placement(state, plan, &PlacementSpec::At(*pos), placement_rng)
        }
        PlacementSpec::AtRegion { region, policy } => {
            let rect = plan
                .regions
                .get(region)
                .ok_or_else(|| load_err(format!("unknown region '{}'", region)))?;
            let free = free_tiles_in(state, *rect);
            if free.is_empty() {
                return Err(load_err(format!("region '{}' has no free tile", region)));
            }
            match policy {
                PlacementPolicy::RandomFreeTile => {
                    let pick = placement_rng.gen_range(0..free.len());
                    Ok(free[pick])
                }
                PlacementPolicy::SpreadEvenly => {
                    // Occupancy grows as units land, so walking the
                    // free list by its midpoint spreads arrivals out
                    Ok(free[free.len() / 2])
                }
            }
        }
    }
}

/// A small scripted skirmish used by the battle runner and the
/// integration suites: knights and archers against a raiding band.
pub fn demo_skirmish() -> ScenarioPlan {
    let tileset = Tileset::builtin();
    let width = 12u32;
    let height = 10u32;
    let ground = vec![crate::map::tileset::TERRAIN_PLAIN.0; (width * height) as usize];
    let mut features = vec![0u16; (width * height) as usize];
    // A forest belt through the middle
    for y in 3..7 {
        features[(y * width + 6) as usize] = crate::map::tileset::TERRAIN_FOREST.0;
    }

    let mut markers = BTreeMap::new();
    markers.insert("vanguard".to_string(), Vector2::new(2, 4));
    let mut regions = BTreeMap::new();
    regions.insert("raider_camp".to_string(), Rect { x: 9, y: 2, w: 3, h: 6 });

    let unit = |name: &str, class: UnitClass, team: Team, personality: Option<AiPersonality>| UnitDef {
        name: name.to_string(),
        class,
        team,
        overrides: StatOverrides::default(),
        personality,
    };

    ScenarioPlan {
        name: "Raid at the Treeline".to_string(),
        width,
        height,
        tileset,
        map_layers: vec![ground, features],
        unit_defs: vec![
            unit("Aldric", UnitClass::Knight, Team::Player, Some(AiPersonality::Balanced)),
            unit("Wren", UnitClass::Archer, Team::Player, Some(AiPersonality::Opportunistic)),
            unit("Gorm", UnitClass::Warrior, Team::Enemy, Some(AiPersonality::Aggressive)),
            unit("Skarn", UnitClass::Warrior, Team::Enemy, Some(AiPersonality::Aggressive)),
            unit("Vex", UnitClass::Archer, Team::Enemy, Some(AiPersonality::Defensive)),
        ],
        markers,
        regions,
        placements: vec![
            Placement { target_name: "Aldric".into(), spec: PlacementSpec::AtMarker("vanguard".into()) },
            Placement { target_name: "Wren".into(), spec: PlacementSpec::At(Vector2::new(1, 6)) },
            Placement {
                target_name: "Gorm".into(),
                spec: PlacementSpec::AtRegion {
                    region: "raider_camp".into(),
                    policy: PlacementPolicy::RandomFreeTile,
                },
            },
            Placement {
                target_name: "Skarn".into(),
                spec: PlacementSpec::AtRegion {
                    region: "raider_camp".into(),
                    policy: PlacementPolicy::RandomFreeTile,
                },
            },
            Placement {
                target_name: "Vex".into(),
                spec: PlacementSpec::AtRegion {
                    region: "raider_camp".into(),
                    policy: PlacementPolicy::SpreadEvenly,
                },
            },
        ],
        hazards: vec![HazardDef {
            name: "Brazier".into(),
            position: Vector2::new(6, 8),
            potency: 3,
            period: 150,
            charges: 4,
        }],
        victory: vec![ObjectivePredicate::DefeatAllEnemies],
        defeat: vec![ObjectivePredicate::AllUnitsDefeated],
        settings: ScenarioSettings { turn_limit: Some(4000), ..ScenarioSettings::default() },
        overrides: vec![TilePatch { position: Vector2::new(6, 0), terrain: crate::map::tileset::TERRAIN_ROAD.0 }],
    }
}
