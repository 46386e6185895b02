//! Combat resolver: applies damage and its consequences
//!
//! The resolver mutates health, appends wounds, retires the dead, and
//! emits the event chain `UnitAttacked -> UnitTookDamage ->
//! (UnitDefeated)`. Counterattacks resolve inside the same call; there
//! is never a second counter.

use crate::actions::Action;
use crate::battle::state::GameState;
use crate::combat::calculator;
use crate::combat::wounds::{self, Wound};
use crate::core::error::{GrimError, Result};
use crate::core::rng;
use crate::core::types::EntityId;
use crate::entity::components::WoundComponent;
use crate::events::bus::EventBus;
use crate::events::events::EventPayload;

/// What one strike (and its optional counter) did
#[derive(Debug, Clone)]
pub struct AttackReport {
    pub damage: i32,
    pub crit: bool,
    pub defeated: bool,
    pub wound: Option<Wound>,
    pub countered: Option<Box<AttackReport>>,
}

/// Resolve an attack action, counter included.
pub fn resolve_attack(
    state: &mut GameState,
    bus: &mut EventBus,
    attacker_id: EntityId,
    defender_id: EntityId,
    action: Action,
) -> Result<AttackReport> {
    let percent = action.damage_percent().ok_or_else(|| {
        GrimError::InvariantViolation(format!("{} is not an attack", action.name()))
    })?;

    let mut report = strike(state, bus, attacker_id, defender_id, percent, false)?;

    // Counterattack: standard attacks only, defender must have survived
    // and hold the attacker inside its own range band. Eligibility is
    // exactly what the forecaster promised.
    let counter = {
        let attacker = state.expect_unit(attacker_id)?;
        let defender = state.expect_unit(defender_id)?;
        let distance = attacker.position().manhattan_distance(defender.position());
        calculator::counter_possible(action, defender, distance)
    };
    if counter {
        let counter_report = strike(state, bus, defender_id, attacker_id, 100, true)?;
        report.countered = Some(Box::new(counter_report));
    }

    Ok(report)
}

/// One blow: roll damage, apply it, wound, and retire the dead.
fn strike(
    state: &mut GameState,
    bus: &mut EventBus,
    attacker_id: EntityId,
    defender_id: EntityId,
    damage_percent: u32,
    is_counter: bool,
) -> Result<AttackReport> {
    let attacker = state.expect_unit(attacker_id)?;
    let defender = state.expect_unit(defender_id)?;
    let crit_chance = attacker.combat.crit_chance;
    let defender_hp_max = defender.health.hp_max;
    let terrain_defense = state
        .map
        .tile(defender.position())
        .map(|t| t.defense_bonus)
        .unwrap_or(0);
    let (base, variance) =
        calculator::damage_parameters(attacker, defender, terrain_defense, damage_percent);

    let event = state.event(EventPayload::UnitAttacked {
        attacker: attacker_id,
        defender: defender_id,
        base_damage: base,
        damage_percent,
        counter: is_counter,
    });
    bus.publish(event, state)?;

    // One stream per resolution, reseeded from the resolution identity
    let roll_seq = state.next_roll();
    let mut stream = rng::damage_stream(state.seed, attacker_id, defender_id, state.now(), roll_seq);
    let mut damage = rng::roll_damage(&mut stream, base, variance);
    let crit = rng::roll_crit(&mut stream, crit_chance);
    if crit {
        damage *= 2;
    }

    let wound_floor_pct = (state.config.wound_damage_ratio * 100.0).round() as u32;
    let wound = wounds::wound_from_damage(damage, defender_hp_max, wound_floor_pct, &mut stream);

    let defender = state.expect_unit_mut(defender_id)?;
    defender.health.take_damage(damage);
    let resulting_hp = defender.health.hp_current;
    if let Some(new_wound) = &wound {
        match &mut defender.wound {
            Some(component) => component.add(new_wound.clone()),
            None => {
                let mut component = WoundComponent::default();
                component.add(new_wound.clone());
                defender.wound = Some(component);
            }
        }
    }

    let event = state.event(EventPayload::UnitTookDamage {
        unit: defender_id,
        amount: damage,
        crit,
        resulting_hp,
    });
    bus.publish(event, state)?;

    let defeated = resulting_hp <= 0;
    if defeated {
        retire_unit(state, bus, defender_id, Some(attacker_id))?;
    }

    Ok(AttackReport { damage, crit, defeated, wound, countered: None })
}

/// Apply non-combat damage (hazards, bleeding) with the same event
/// surface, minus attack and wound handling.
pub fn apply_raw_damage(
    state: &mut GameState,
    bus: &mut EventBus,
    unit_id: EntityId,
    amount: i32,
    source: Option<EntityId>,
) -> Result<(i32, bool)> {
    let unit = state.expect_unit_mut(unit_id)?;
    let applied = unit.health.take_damage(amount);
    let resulting_hp = unit.health.hp_current;

    let event = state.event(EventPayload::UnitTookDamage {
        unit: unit_id,
        amount: applied,
        crit: false,
        resulting_hp,
    });
    bus.publish(event, state)?;

    let defeated = resulting_hp <= 0;
    if defeated {
        retire_unit(state, bus, unit_id, source)?;
    }
    Ok((applied, defeated))
}

/// Vacate the corpse's tile and announce the defeat. The timeline
/// manager tombstones its pending entries in response to the event.
fn retire_unit(
    state: &mut GameState,
    bus: &mut EventBus,
    unit_id: EntityId,
    killer: Option<EntityId>,
) -> Result<()> {
    let position = state.expect_unit(unit_id)?.position();
    state.map.vacate(position);

    let event = state.event(EventPayload::UnitDefeated {
        unit: unit_id,
        killer,
        at_tick: state.now(),
    });
    bus.publish(event, state)
}
