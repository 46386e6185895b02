//! Combat manager: targeting state and forecast exposure
//!
//! Builds the candidate target list when an attack is chosen, keeps the
//! forecast in GameState fresh for rendering, and clears both when the
//! targeting flow unwinds.

use crate::battle::state::GameState;
use crate::combat::calculator;
use crate::core::types::EntityId;
use crate::events::bus::{EventWriter, Subscriber};
use crate::events::events::{EventKind, EventPayload, GameEvent};
use crate::map::pathfinding;

pub struct CombatManager;

/// Alive units inside the actor's range band, enemies before friends,
/// ids breaking ties.
pub fn target_candidates(state: &GameState, actor_id: EntityId) -> Vec<EntityId> {
    let Some(actor) = state.unit(actor_id) else {
        return Vec::new();
    };
    let actor_pos = actor.position();
    let actor_team = actor.team();

    let mut candidates: Vec<(bool, EntityId)> = state
        .alive_units()
        .filter(|unit| unit.id != actor_id)
        .filter(|unit| actor.combat.in_range(actor_pos.manhattan_distance(unit.position())))
        .map(|unit| (unit.team() == actor_team, unit.id))
        .collect();

    // false (enemies) sorts before true (friends)
    candidates.sort();
    candidates.into_iter().map(|(_, id)| id).collect()
}

/// Recompute the forecast for the pending attack and current target.
pub fn refresh_forecast(state: &mut GameState) {
    let forecast = match (state.battle.acting_unit, state.battle.pending_action) {
        (Some(actor), Some(action)) if action.is_attack() => state
            .battle
            .current_target()
            .and_then(|target| calculator::forecast(state, actor, target, action)),
        _ => None,
    };
    state.forecast = forecast;
}

fn setup_targeting(state: &mut GameState, actor_id: EntityId) {
    let Some((position, range_min, range_max)) = state
        .unit(actor_id)
        .map(|actor| (actor.position(), actor.combat.range_min, actor.combat.range_max))
    else {
        return;
    };
    state.battle.attack_range =
        pathfinding::attack_range_tiles(&state.map, position, range_min, range_max);
    state.battle.targetable = target_candidates(state, actor_id);
    state.battle.target_index = 0;
    state.battle.awaiting_friendly_confirm = false;

    let target_position = state
        .battle
        .current_target()
        .and_then(|target| state.unit(target))
        .map(|unit| unit.position());
    if let Some(position) = target_position {
        state.cursor.position = position;
    }
    refresh_forecast(state);
}

fn clear_targeting(state: &mut GameState) {
    state.battle.targetable.clear();
    state.battle.target_index = 0;
    state.battle.attack_range.clear();
    state.battle.awaiting_friendly_confirm = false;
    state.forecast = None;
}

impl Subscriber for CombatManager {
    fn name(&self) -> &'static str {
        "combat"
    }

    fn interests(&self) -> &'static [EventKind] {
        &[EventKind::ActionSelected, EventKind::ActionCancelled, EventKind::TurnEnded]
    }

    fn handle(&mut self, event: &GameEvent, state: &mut GameState, _out: &mut EventWriter) {
        match &event.payload {
            EventPayload::ActionSelected { unit, action } if action.is_attack() => {
                setup_targeting(state, *unit);
            }
            EventPayload::ActionSelected { .. } => {
                clear_targeting(state);
            }
            EventPayload::ActionCancelled { .. } | EventPayload::TurnEnded { .. } => {
                clear_targeting(state);
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::Action;
    use crate::core::types::{Team, Vector2};
    use crate::entity::unit::UnitClass;
    use crate::events::bus::EventBus;

    fn setup() -> (GameState, EventBus, EntityId) {
        let mut state = GameState::for_tests(10, 10);
        let knight = state.spawn("K", UnitClass::Knight, Team::Player, Vector2::new(5, 5));
        let mut bus = EventBus::new(16);
        bus.subscribe(55, Box::new(CombatManager));
        (state, bus, knight)
    }

    #[test]
    fn test_candidates_enemies_first_then_by_id() {
        let (mut state, _, knight) = setup();
        let friend = state.spawn("F", UnitClass::Warrior, Team::Player, Vector2::new(5, 4));
        let foe = state.spawn("E", UnitClass::Warrior, Team::Enemy, Vector2::new(5, 6));

        assert_eq!(target_candidates(&state, knight), vec![foe, friend]);
    }

    #[test]
    fn test_candidates_respect_range_band() {
        let mut state = GameState::for_tests(10, 10);
        let archer = state.spawn("A", UnitClass::Archer, Team::Player, Vector2::new(5, 5));
        let adjacent = state.spawn("Near", UnitClass::Warrior, Team::Enemy, Vector2::new(5, 6));
        let ranged = state.spawn("Far", UnitClass::Warrior, Team::Enemy, Vector2::new(5, 8));

        let candidates = target_candidates(&state, archer);
        assert!(!candidates.contains(&adjacent));
        assert!(candidates.contains(&ranged));
    }

    #[test]
    fn test_action_selected_builds_targeting() {
        let (mut state, mut bus, knight) = setup();
        let foe = state.spawn("E", UnitClass::Warrior, Team::Enemy, Vector2::new(5, 6));
        state.battle.acting_unit = Some(knight);

        let event = state.event(EventPayload::ActionSelected {
            unit: knight,
            action: Action::StandardAttack,
        });
        // SelectionManager normally records the pending action; do it here
        state.battle.pending_action = Some(Action::StandardAttack);
        bus.publish(event, &mut state).unwrap();

        assert_eq!(state.battle.targetable, vec![foe]);
        assert!(!state.battle.attack_range.is_empty());
        assert!(state.forecast.is_some());
        assert_eq!(state.cursor.position, Vector2::new(5, 6));
    }

    #[test]
    fn test_cancel_clears_targeting() {
        let (mut state, mut bus, knight) = setup();
        state.spawn("E", UnitClass::Warrior, Team::Enemy, Vector2::new(5, 6));
        state.battle.acting_unit = Some(knight);
        state.battle.pending_action = Some(Action::StandardAttack);

        let event = state.event(EventPayload::ActionSelected {
            unit: knight,
            action: Action::StandardAttack,
        });
        bus.publish(event, &mut state).unwrap();
        assert!(state.forecast.is_some());

        let event = state.event(EventPayload::ActionCancelled { unit: knight });
        bus.publish(event, &mut state).unwrap();

        assert!(state.battle.targetable.is_empty());
        assert!(state.forecast.is_none());
    }

    #[test]
    fn test_forecast_follows_target_cycling() {
        let (mut state, mut bus, knight) = setup();
        let first = state.spawn("E1", UnitClass::Warrior, Team::Enemy, Vector2::new(5, 6));
        let second = state.spawn("E2", UnitClass::Warrior, Team::Enemy, Vector2::new(5, 4));
        state.battle.acting_unit = Some(knight);
        state.battle.pending_action = Some(Action::StandardAttack);

        let event = state.event(EventPayload::ActionSelected {
            unit: knight,
            action: Action::StandardAttack,
        });
        bus.publish(event, &mut state).unwrap();
        assert_eq!(state.forecast.as_ref().unwrap().defender, first);

        state.battle.cycle_target(1);
        refresh_forecast(&mut state);
        assert_eq!(state.forecast.as_ref().unwrap().defender, second);
    }
}
