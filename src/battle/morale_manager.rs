//! Morale manager: battlefield psychology driven by combat events
//!
//! Damage erodes the victim's resolve; deaths ripple outward, shaking
//! nearby allies and heartening nearby enemies. All effects arrive
//! through events; no other manager calls in here.

use crate::battle::state::GameState;
use crate::combat::morale::{self, MoraleShift};
use crate::core::types::EntityId;
use crate::events::bus::{EventWriter, Subscriber};
use crate::events::events::{EventKind, EventPayload, GameEvent};

pub struct MoraleManager;

impl MoraleManager {
    /// Adjust one unit's morale and emit the resulting events.
    fn adjust(state: &mut GameState, out: &mut EventWriter, unit_id: EntityId, amount: i32) {
        let threshold = state.config.morale_event_threshold;
        let Some(unit) = state.unit_mut(unit_id) else {
            return;
        };
        if !unit.is_alive() {
            return;
        }
        let Some(morale_component) = unit.morale.as_mut() else {
            return;
        };

        let shift: MoraleShift = morale::modify(morale_component, amount);
        let new_state = morale::state_of(morale_component);

        if shift.delta().abs() >= threshold || shift.entered_panic || shift.entered_rout {
            out.emit(state.event(EventPayload::MoraleChanged {
                unit: unit_id,
                old: shift.old,
                new: shift.new,
                state: new_state,
            }));
        }
        if shift.entered_rout {
            out.emit(state.event(EventPayload::UnitRouted { unit: unit_id }));
        } else if shift.recovered {
            out.emit(state.event(EventPayload::UnitRallied { unit: unit_id }));
        }
    }
}

impl Subscriber for MoraleManager {
    fn name(&self) -> &'static str {
        "morale"
    }

    fn interests(&self) -> &'static [EventKind] {
        &[EventKind::UnitTookDamage, EventKind::UnitDefeated]
    }

    fn handle(&mut self, event: &GameEvent, state: &mut GameState, out: &mut EventWriter) {
        match &event.payload {
            EventPayload::UnitTookDamage { unit, amount, .. } => {
                let loss = (*amount as f32 * state.config.damage_morale_ratio) as i32;
                if loss > 0 {
                    Self::adjust(state, out, *unit, -loss);
                }
            }
            EventPayload::UnitDefeated { unit, .. } => {
                let Some(deceased) = state.unit(*unit) else {
                    return;
                };
                let deceased_team = deceased.team();
                let deceased_pos = deceased.position();
                let radius = state.config.morale_proximity_radius;
                let ally_penalty = state.config.ally_death_morale_penalty;
                let enemy_bonus = state.config.enemy_death_morale_bonus;

                // Collect first; adjusting mutates units
                let affected: Vec<(EntityId, i32)> = state
                    .alive_units()
                    .filter(|u| u.id != *unit && u.morale.is_some())
                    .filter(|u| u.position().manhattan_distance(deceased_pos) <= radius)
                    .map(|u| {
                        let delta = if u.team() == deceased_team { ally_penalty } else { enemy_bonus };
                        (u.id, delta)
                    })
                    .collect();

                for (id, delta) in affected {
                    Self::adjust(state, out, id, delta);
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{Team, Vector2};
    use crate::entity::unit::UnitClass;
    use crate::events::bus::EventBus;

    fn setup() -> (GameState, EventBus) {
        let state = GameState::for_tests(10, 10);
        let mut bus = EventBus::new(16);
        bus.subscribe(50, Box::new(MoraleManager));
        (state, bus)
    }

    #[test]
    fn test_damage_erodes_morale() {
        let (mut state, mut bus) = setup();
        let victim = state.spawn("V", UnitClass::Warrior, Team::Player, Vector2::new(1, 1));

        let event = state.event(EventPayload::UnitTookDamage {
            unit: victim,
            amount: 10,
            crit: false,
            resulting_hp: 10,
        });
        bus.publish(event, &mut state).unwrap();

        let morale = state.unit(victim).unwrap().morale.as_ref().unwrap();
        assert_eq!(morale.value, 95); // 100 - 10/2
        assert!(bus.history().iter().any(|e| e.kind() == EventKind::MoraleChanged));
    }

    #[test]
    fn test_ally_death_shakes_neighbors() {
        let (mut state, mut bus) = setup();
        let fallen = state.spawn("F", UnitClass::Warrior, Team::Player, Vector2::new(2, 2));
        let witness = state.spawn("W", UnitClass::Warrior, Team::Player, Vector2::new(3, 2));
        let foe = state.spawn("E", UnitClass::Warrior, Team::Enemy, Vector2::new(2, 3));
        state.unit_mut(fallen).unwrap().health.hp_current = 0;

        let event = state.event(EventPayload::UnitDefeated {
            unit: fallen,
            killer: Some(foe),
            at_tick: 0,
        });
        bus.publish(event, &mut state).unwrap();

        let witness_morale = state.unit(witness).unwrap().morale.as_ref().unwrap().value;
        let foe_morale = state.unit(foe).unwrap().morale.as_ref().unwrap().value;
        assert_eq!(witness_morale, 85); // ally penalty
        assert_eq!(foe_morale, 105); // enemy bonus
    }

    #[test]
    fn test_distant_units_unmoved_by_death() {
        let (mut state, mut bus) = setup();
        let fallen = state.spawn("F", UnitClass::Warrior, Team::Player, Vector2::new(0, 0));
        let far = state.spawn("Far", UnitClass::Warrior, Team::Player, Vector2::new(9, 9));
        state.unit_mut(fallen).unwrap().health.hp_current = 0;

        let event = state.event(EventPayload::UnitDefeated { unit: fallen, killer: None, at_tick: 0 });
        bus.publish(event, &mut state).unwrap();

        assert_eq!(state.unit(far).unwrap().morale.as_ref().unwrap().value, 100);
    }

    #[test]
    fn test_collapse_emits_rout() {
        let (mut state, mut bus) = setup();
        let victim = state.spawn("V", UnitClass::Warrior, Team::Player, Vector2::new(1, 1));
        state.unit_mut(victim).unwrap().morale.as_mut().unwrap().value = 12;

        let event = state.event(EventPayload::UnitTookDamage {
            unit: victim,
            amount: 20,
            crit: false,
            resulting_hp: 5,
        });
        bus.publish(event, &mut state).unwrap();

        assert!(state.unit(victim).unwrap().morale.as_ref().unwrap().routed);
        assert!(bus.history().iter().any(|e| e.kind() == EventKind::UnitRouted));
    }

    #[test]
    fn test_units_without_morale_ignored() {
        let (mut state, mut bus) = setup();
        let stoic = state.spawn("S", UnitClass::Warrior, Team::Player, Vector2::new(1, 1));
        state.unit_mut(stoic).unwrap().morale = None;

        let event = state.event(EventPayload::UnitTookDamage {
            unit: stoic,
            amount: 10,
            crit: false,
            resulting_hp: 10,
        });
        bus.publish(event, &mut state).unwrap();
        assert!(!bus.history().iter().any(|e| e.kind() == EventKind::MoraleChanged));
    }
}
