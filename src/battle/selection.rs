//! Selection and movement manager
//!
//! Owns the cursor, the reachable set, and the pre-move snapshot used
//! for cancellation. Cancelling out of the action menu walks the unit
//! back to where its activation began.

use crate::actions;
use crate::battle::state::{BattlePhase, GameState};
use crate::core::types::{EntityId, Vector2};
use crate::events::bus::{EventWriter, Subscriber};
use crate::events::events::{EventKind, EventPayload, GameEvent};
use crate::map::pathfinding;

pub struct SelectionManager;

/// Tiles the unit can reach with its remaining movement points
pub fn movement_range(state: &GameState, unit_id: EntityId) -> Vec<Vector2> {
    let Some(unit) = state.unit(unit_id) else {
        return Vec::new();
    };
    let start = unit.position();
    let blocked = |pos: Vector2| pos != start && state.map.is_occupied(pos);
    pathfinding::reachable_tiles(&state.map, start, unit.movement.movement_points, &blocked)
}

impl SelectionManager {
    fn begin_activation(state: &mut GameState, unit_id: EntityId) {
        state.battle.reset_selection();
        state.ui.close_action_menu();
        state.forecast = None;
        state.battle.acting_unit = Some(unit_id);
        let snapshot = state
            .unit(unit_id)
            .map(|unit| (unit.position(), unit.movement.movement_points));
        if let Some((position, points)) = snapshot {
            state.battle.pre_move_position = Some(position);
            state.battle.pre_move_points = points;
            state.cursor.position = position;
        }
    }

    /// Walk the actor back to its pre-move snapshot.
    fn restore_position(state: &mut GameState, out: &mut EventWriter) {
        if !state.battle.moved_this_activation {
            return;
        }
        let (Some(unit_id), Some(snapshot)) =
            (state.battle.acting_unit, state.battle.pre_move_position)
        else {
            return;
        };
        let points = state.battle.pre_move_points;
        let Some(unit) = state.unit_mut(unit_id) else {
            return;
        };
        let current = unit.position();
        unit.movement.position = snapshot;
        unit.movement.movement_points = points;
        unit.status.has_moved = false;
        if current != snapshot {
            state.map.move_occupant(current, snapshot, unit_id);
            // The forward move was committed, so the reversal is
            // announced too
            out.emit(state.event(EventPayload::UnitMoved {
                unit: unit_id,
                from: current,
                to: snapshot,
                path: Vec::new(),
                cost: 0,
            }));
        }
        state.battle.moved_this_activation = false;
    }
}

impl Subscriber for SelectionManager {
    fn name(&self) -> &'static str {
        "selection"
    }

    fn interests(&self) -> &'static [EventKind] {
        &[
            EventKind::TurnStarted,
            EventKind::UnitSelected,
            EventKind::UnitMoved,
            EventKind::MovementCompleted,
            EventKind::ActionSelected,
            EventKind::ActionCancelled,
            EventKind::TurnEnded,
        ]
    }

    fn handle(&mut self, event: &GameEvent, state: &mut GameState, out: &mut EventWriter) {
        match &event.payload {
            EventPayload::TurnStarted { unit, .. } => {
                Self::begin_activation(state, *unit);
            }
            EventPayload::UnitSelected { unit } => {
                state.battle.movement_range = movement_range(state, *unit);
            }
            EventPayload::UnitMoved { unit, to, .. } => {
                if state.battle.acting_unit == Some(*unit) {
                    state.battle.movement_range = movement_range(state, *unit);
                    state.cursor.position = *to;
                }
            }
            EventPayload::MovementCompleted { unit } => {
                state.battle.movement_range.clear();
                let menu = state.unit(*unit).map(actions::available_actions);
                if let Some(menu) = menu {
                    state.ui.open_action_menu(menu);
                }
            }
            EventPayload::ActionSelected { action, .. } => {
                state.battle.pending_action = Some(*action);
                state.ui.close_action_menu();
            }
            EventPayload::ActionCancelled { unit } => {
                // The phase manager has already stepped the automaton
                // backwards; react to where we landed.
                match state.battle_phase() {
                    BattlePhase::UnitMoving => {
                        state.battle.pending_action = None;
                        state.ui.close_action_menu();
                        Self::restore_position(state, out);
                        state.battle.movement_range = movement_range(state, *unit);
                    }
                    BattlePhase::ActionSelection => {
                        state.battle.pending_action = None;
                        let menu = state.unit(*unit).map(actions::available_actions);
                        if let Some(menu) = menu {
                            state.ui.open_action_menu(menu);
                        }
                    }
                    _ => {}
                }
            }
            EventPayload::TurnEnded { .. } => {
                state.battle.reset_selection();
                state.ui.close_action_menu();
                state.forecast = None;
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::Action;
    use crate::battle::phase::PhaseManager;
    use crate::core::types::Team;
    use crate::entity::unit::UnitClass;
    use crate::events::bus::EventBus;

    fn setup() -> (GameState, EventBus, EntityId) {
        let mut state = GameState::for_tests(10, 10);
        let unit = state.spawn("K", UnitClass::Knight, Team::Player, Vector2::new(5, 5));
        let mut bus = EventBus::new(16);
        bus.subscribe(100, Box::new(PhaseManager));
        bus.subscribe(60, Box::new(SelectionManager));
        (state, bus, unit)
    }

    fn publish(bus: &mut EventBus, state: &mut GameState, payload: EventPayload) {
        let event = state.event(payload);
        bus.publish(event, state).unwrap();
    }

    #[test]
    fn test_turn_start_snapshots_actor() {
        let (mut state, mut bus, unit) = setup();
        publish(&mut bus, &mut state, EventPayload::TurnStarted { unit, team: Team::Player });

        assert_eq!(state.battle.acting_unit, Some(unit));
        assert_eq!(state.battle.pre_move_position, Some(Vector2::new(5, 5)));
        assert_eq!(state.cursor.position, Vector2::new(5, 5));
    }

    #[test]
    fn test_selection_computes_reachable_set() {
        let (mut state, mut bus, unit) = setup();
        publish(&mut bus, &mut state, EventPayload::TurnStarted { unit, team: Team::Player });
        publish(&mut bus, &mut state, EventPayload::UnitSelected { unit });

        assert!(!state.battle.movement_range.is_empty());
        assert!(state.battle.movement_range.contains(&Vector2::new(5, 2)));
    }

    #[test]
    fn test_movement_completed_opens_menu() {
        let (mut state, mut bus, unit) = setup();
        publish(&mut bus, &mut state, EventPayload::TurnStarted { unit, team: Team::Player });
        publish(&mut bus, &mut state, EventPayload::UnitSelected { unit });
        publish(&mut bus, &mut state, EventPayload::MovementCompleted { unit });

        assert!(state.ui.menu_open);
        assert!(state.ui.action_menu.contains(&Action::Wait));
        assert!(state.ui.action_menu.contains(&Action::PowerAttack));
        assert!(state.battle.movement_range.is_empty());
    }

    #[test]
    fn test_cancel_from_menu_restores_position() {
        let (mut state, mut bus, unit) = setup();
        publish(&mut bus, &mut state, EventPayload::TurnStarted { unit, team: Team::Player });
        publish(&mut bus, &mut state, EventPayload::UnitSelected { unit });

        // Move the unit by hand, as the engine would
        let from = Vector2::new(5, 5);
        let to = Vector2::new(5, 3);
        {
            let u = state.unit_mut(unit).unwrap();
            u.movement.position = to;
            u.movement.movement_points = 1;
            u.status.has_moved = true;
        }
        state.map.move_occupant(from, to, unit);
        state.battle.moved_this_activation = true;
        publish(
            &mut bus,
            &mut state,
            EventPayload::UnitMoved { unit, from, to, path: vec![from, to], cost: 2 },
        );
        publish(&mut bus, &mut state, EventPayload::MovementCompleted { unit });

        publish(&mut bus, &mut state, EventPayload::ActionCancelled { unit });

        let u = state.unit(unit).unwrap();
        assert_eq!(u.position(), from);
        assert_eq!(u.movement.movement_points, 3);
        assert!(!u.status.has_moved);
        assert_eq!(state.map.occupant(from), Some(unit));
        assert!(!state.map.is_occupied(to));

        // The reversal was announced as a committed move
        let reversals = bus
            .history()
            .iter()
            .filter(|e| matches!(
                &e.payload,
                EventPayload::UnitMoved { to, .. } if *to == from
            ))
            .count();
        assert_eq!(reversals, 1);
    }

    #[test]
    fn test_cancel_without_move_emits_nothing() {
        let (mut state, mut bus, unit) = setup();
        publish(&mut bus, &mut state, EventPayload::TurnStarted { unit, team: Team::Player });
        publish(&mut bus, &mut state, EventPayload::UnitSelected { unit });
        publish(&mut bus, &mut state, EventPayload::MovementCompleted { unit });
        publish(&mut bus, &mut state, EventPayload::ActionCancelled { unit });

        let moves = bus
            .history()
            .iter()
            .filter(|e| e.kind() == EventKind::UnitMoved)
            .count();
        assert_eq!(moves, 0);
    }

    #[test]
    fn test_turn_end_clears_selection() {
        let (mut state, mut bus, unit) = setup();
        publish(&mut bus, &mut state, EventPayload::TurnStarted { unit, team: Team::Player });
        publish(&mut bus, &mut state, EventPayload::UnitSelected { unit });
        publish(&mut bus, &mut state, EventPayload::TurnEnded { unit, weight_spent: 50 });

        assert!(state.battle.acting_unit.is_none());
        assert!(state.battle.movement_range.is_empty());
        assert!(!state.ui.menu_open);
    }
}
