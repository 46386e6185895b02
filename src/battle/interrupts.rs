//! Prepared actions and interrupt triggers
//!
//! A unit may hold at most one prepared action. It fires when its
//! trigger predicate matches, before the owner's next scheduled
//! activation, and consumes a use.

use serde::{Deserialize, Serialize};

use crate::actions::Action;
use crate::battle::state::GameState;
use crate::core::types::EntityId;

/// Conditions a prepared action can wait on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InterruptTrigger {
    /// An enemy ends a move within `range` (Manhattan)
    EnemyMovesInRange { range: u32 },
    /// The owner is the target of an incoming attack
    IncomingAttack,
}

/// An action stored for later, reactive execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreparedAction {
    pub action: Action,
    pub trigger: InterruptTrigger,
    pub priority: i32,
    pub uses_left: u32,
}

/// Units whose prepared action fires on this move, highest priority
/// first, ids breaking ties.
pub fn watchers_for_move(state: &GameState, mover: EntityId) -> Vec<EntityId> {
    let Some(moved) = state.unit(mover) else {
        return Vec::new();
    };
    if !moved.is_alive() {
        return Vec::new();
    }
    let mover_team = moved.team();
    let mover_pos = moved.position();

    let mut watchers: Vec<(i32, EntityId)> = state
        .alive_units()
        .filter(|unit| unit.id != mover && unit.team() != mover_team)
        .filter_map(|unit| {
            let prepared = unit.interrupt.as_ref()?.prepared.as_ref()?;
            if prepared.uses_left == 0 {
                return None;
            }
            match prepared.trigger {
                InterruptTrigger::EnemyMovesInRange { range } => {
                    let distance = unit.position().manhattan_distance(mover_pos);
                    (distance <= range).then_some((prepared.priority, unit.id))
                }
                InterruptTrigger::IncomingAttack => None,
            }
        })
        .collect();

    watchers.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
    watchers.into_iter().map(|(_, id)| id).collect()
}

/// Whether the defender holds a prepared action waiting on an incoming
/// attack. Fires regardless of range; being attacked is the trigger.
pub fn braced_for_attack(state: &GameState, defender: EntityId) -> bool {
    state
        .unit(defender)
        .filter(|unit| unit.is_alive())
        .and_then(|unit| unit.interrupt.as_ref())
        .and_then(|interrupt| interrupt.prepared.as_ref())
        .map(|prepared| {
            prepared.uses_left > 0 && prepared.trigger == InterruptTrigger::IncomingAttack
        })
        .unwrap_or(false)
}

/// Consume one use of the owner's prepared action, clearing it when
/// spent. Returns the action that fired.
pub fn consume_prepared(state: &mut GameState, owner: EntityId) -> Option<PreparedAction> {
    let unit = state.unit_mut(owner)?;
    let interrupt = unit.interrupt.as_mut()?;
    let prepared = interrupt.prepared.as_mut()?;
    if prepared.uses_left == 0 {
        return None;
    }
    prepared.uses_left -= 1;
    let fired = prepared.clone();
    if prepared.uses_left == 0 {
        interrupt.prepared = None;
    }
    Some(fired)
}
