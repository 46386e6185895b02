//! Battle calculator: pure damage prediction
//!
//! Forecasts feed UI previews and AI scoring. Nothing here mutates
//! state, and every attack in this system connects; the only
//! uncertainty is the variance band and the crit roll.

use serde::{Deserialize, Serialize};

use crate::actions::Action;
use crate::battle::state::GameState;
use crate::core::types::EntityId;
use crate::entity::unit::Unit;

/// Predicted result of one attack
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    pub attacker: EntityId,
    pub defender: EntityId,
    pub damage_min: i32,
    pub damage_max: i32,
    pub crit_chance: u32,
    /// True only when the kill is guaranteed (damage_min covers the hp)
    pub will_kill: bool,
    pub counter_possible: bool,
    pub counter: Option<Box<Forecast>>,
}

/// Base damage and variance for one attack under the standard formula:
/// `base = max(1, strength - defense/2 - terrain_defense)` scaled by
/// the action's damage percent, `variance = round(base / 4)`.
pub fn damage_parameters(
    attacker: &Unit,
    defender: &Unit,
    terrain_defense: i32,
    damage_percent: u32,
) -> (i32, i32) {
    let raw = attacker.effective_strength() - defender.effective_defense() / 2 - terrain_defense;
    let scaled = raw.max(1) * damage_percent as i32 / 100;
    let base = scaled.max(1);
    let variance = (base + 2) / 4;
    (base, variance)
}

/// Whether the defender gets a retaliation: only against a standard
/// attack, and only if the defender's own range band covers the
/// attacker's current distance.
pub fn counter_possible(action: Action, defender: &Unit, distance: u32) -> bool {
    action.allows_counter() && defender.is_alive() && defender.combat.in_range(distance)
}

/// Forecast an attack. Returns None when either unit is missing.
pub fn forecast(
    state: &GameState,
    attacker_id: EntityId,
    defender_id: EntityId,
    action: Action,
) -> Option<Forecast> {
    let attacker = state.unit(attacker_id)?;
    let defender = state.unit(defender_id)?;
    let percent = action.damage_percent()?;

    let terrain_defense = state
        .map
        .tile(defender.position())
        .map(|t| t.defense_bonus)
        .unwrap_or(0);
    let (base, variance) = damage_parameters(attacker, defender, terrain_defense, percent);
    let damage_min = (base - variance).max(1);
    let damage_max = base + variance;

    let distance = attacker.position().manhattan_distance(defender.position());
    let counter = counter_possible(action, defender, distance);

    let counter_forecast = if counter {
        let attacker_terrain = state
            .map
            .tile(attacker.position())
            .map(|t| t.defense_bonus)
            .unwrap_or(0);
        let (counter_base, counter_variance) =
            damage_parameters(defender, attacker, attacker_terrain, 100);
        Some(Box::new(Forecast {
            attacker: defender_id,
            defender: attacker_id,
            damage_min: (counter_base - counter_variance).max(1),
            damage_max: counter_base + counter_variance,
            crit_chance: defender.combat.crit_chance,
            will_kill: counter_base - counter_variance >= attacker.health.hp_current,
            counter_possible: false,
            counter: None,
        }))
    } else {
        None
    };

    Some(Forecast {
        attacker: attacker_id,
        defender: defender_id,
        damage_min,
        damage_max,
        crit_chance: attacker.combat.crit_chance,
        will_kill: damage_min >= defender.health.hp_current,
        counter_possible: counter,
        counter: counter_forecast,
    })
}
