//! Phase state machine
//!
//! Battle phases form a closed automaton driven solely by events; this
//! manager owns the only mutation path for `battle_phase`. Anything not
//! in the transition table leaves the phase untouched.

use crate::battle::state::{BattlePhase, GamePhase, GameState};
use crate::events::bus::{EventWriter, Subscriber};
use crate::events::events::{EventKind, EventPayload, GameEvent};

/// Compute the next phase for an event, if the table has a row for it.
///
/// Inspect toggling and game over are handled outside this table since
/// they need the stored previous phase and the outer game phase.
fn transition(state: &GameState, event: &GameEvent) -> Option<BattlePhase> {
    use BattlePhase::*;

    let current = state.battle_phase();
    match &event.payload {
        EventPayload::TurnStarted { unit, team } => {
            if current != TimelineProcessing {
                return None;
            }
            let is_human = *team == crate::core::types::Team::Player
                && state.unit(*unit).map(|u| u.ai.is_none()).unwrap_or(false);
            Some(if is_human { UnitSelection } else { ActionExecuting })
        }
        EventPayload::UnitSelected { .. } if current == UnitSelection => Some(UnitMoving),
        EventPayload::MovementCompleted { .. } if current == UnitMoving => Some(ActionSelection),
        EventPayload::ActionSelected { action, .. } => match current {
            UnitMoving | ActionSelection => {
                Some(if action.needs_target() { ActionTargeting } else { ActionExecuting })
            }
            _ => None,
        },
        EventPayload::TargetConfirmed { .. } if current == ActionTargeting => Some(ActionExecuting),
        EventPayload::ActionCancelled { .. } => match current {
            ActionSelection => Some(UnitMoving),
            ActionTargeting => Some(ActionSelection),
            _ => None,
        },
        EventPayload::ActionExecuted { .. } if current == ActionExecuting => {
            Some(TimelineProcessing)
        }
        _ => None,
    }
}

/// The manager applying the automaton
pub struct PhaseManager;

impl Subscriber for PhaseManager {
    fn name(&self) -> &'static str {
        "phase"
    }

    fn interests(&self) -> &'static [EventKind] {
        &[
            EventKind::TurnStarted,
            EventKind::UnitSelected,
            EventKind::MovementCompleted,
            EventKind::ActionSelected,
            EventKind::TargetConfirmed,
            EventKind::ActionCancelled,
            EventKind::ActionExecuted,
            EventKind::InspectToggled,
            EventKind::ObjectiveCompleted,
            EventKind::ObjectiveFailed,
        ]
    }

    fn handle(&mut self, event: &GameEvent, state: &mut GameState, out: &mut EventWriter) {
        match &event.payload {
            EventPayload::InspectToggled => {
                let from = state.battle_phase();
                if from == BattlePhase::Inspect {
                    state.exit_inspect();
                } else {
                    state.enter_inspect();
                }
                let to = state.battle_phase();
                if from != to {
                    out.emit(state.event(EventPayload::BattlePhaseChanged { from, to }));
                }
            }
            EventPayload::ObjectiveCompleted { .. } | EventPayload::ObjectiveFailed { .. } => {
                state.phase = GamePhase::GameOver;
            }
            _ => {
                if state.phase != GamePhase::Battle {
                    return;
                }
                if let Some(next) = transition(state, event) {
                    let from = state.battle_phase();
                    if from != next {
                        state.set_battle_phase(next);
                        out.emit(state.event(EventPayload::BattlePhaseChanged { from, to: next }));
                    }
                }
            }
        }
    }
}
