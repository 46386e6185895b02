//! Game events and their closed kind enumeration
//!
//! Events are immutable values with typed payloads. Payloads carry ids,
//! positions, and amounts, never references into state; subscribers
//! query GameState themselves.

use serde::{Deserialize, Serialize};

use crate::actions::Action;
use crate::battle::log_manager::LogLevel;
use crate::battle::state::BattlePhase;
use crate::combat::morale::MoraleState;
use crate::core::types::{EntityId, Team, Tick, Vector2, Weight};

/// Closed set of event kinds managers can subscribe to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    TurnStarted,
    TurnEnded,
    UnitSelected,
    UnitMoved,
    MovementCompleted,
    ActionSelected,
    TargetConfirmed,
    ActionExecuted,
    ActionCancelled,
    InspectToggled,
    UnitAttacked,
    UnitTookDamage,
    UnitDefeated,
    BattlePhaseChanged,
    InterruptPrepared,
    InterruptTriggered,
    ObjectiveCompleted,
    ObjectiveFailed,
    ScenarioLoaded,
    LogMessage,
    HazardTriggered,
    MoraleChanged,
    UnitRouted,
    UnitRallied,
}

/// Typed event payloads
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EventPayload {
    TurnStarted {
        unit: EntityId,
        team: Team,
    },
    TurnEnded {
        unit: EntityId,
        weight_spent: Weight,
    },
    UnitSelected {
        unit: EntityId,
    },
    UnitMoved {
        unit: EntityId,
        from: Vector2,
        to: Vector2,
        path: Vec<Vector2>,
        cost: u32,
    },
    MovementCompleted {
        unit: EntityId,
    },
    ActionSelected {
        unit: EntityId,
        action: Action,
    },
    TargetConfirmed {
        unit: EntityId,
    },
    ActionExecuted {
        unit: EntityId,
        action: Action,
        success: bool,
    },
    ActionCancelled {
        unit: EntityId,
    },
    InspectToggled,
    UnitAttacked {
        attacker: EntityId,
        defender: EntityId,
        base_damage: i32,
        damage_percent: u32,
        counter: bool,
    },
    UnitTookDamage {
        unit: EntityId,
        amount: i32,
        crit: bool,
        resulting_hp: i32,
    },
    UnitDefeated {
        unit: EntityId,
        killer: Option<EntityId>,
        at_tick: Tick,
    },
    BattlePhaseChanged {
        from: BattlePhase,
        to: BattlePhase,
    },
    InterruptPrepared {
        unit: EntityId,
    },
    InterruptTriggered {
        unit: EntityId,
        against: EntityId,
    },
    ObjectiveCompleted {
        description: String,
    },
    ObjectiveFailed {
        description: String,
    },
    ScenarioLoaded {
        name: String,
    },
    LogMessage {
        level: LogLevel,
        category: String,
        text: String,
    },
    HazardTriggered {
        hazard: u32,
        position: Vector2,
        potency: i32,
    },
    MoraleChanged {
        unit: EntityId,
        old: i32,
        new: i32,
        state: MoraleState,
    },
    UnitRouted {
        unit: EntityId,
    },
    UnitRallied {
        unit: EntityId,
    },
}

/// An event stamped with the timeline tick at which it was published
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameEvent {
    pub tick: Tick,
    pub payload: EventPayload,
}

impl GameEvent {
    pub fn new(tick: Tick, payload: EventPayload) -> Self {
        Self { tick, payload }
    }

    pub fn kind(&self) -> EventKind {
        match &self.payload {
            EventPayload::TurnStarted { .. } => EventKind::TurnStarted,
            EventPayload::TurnEnded { .. } => EventKind::TurnEnded,
            EventPayload::UnitSelected { .. } => EventKind::UnitSelected,
            EventPayload::UnitMoved { .. } => EventKind::UnitMoved,
            EventPayload::MovementCompleted { .. } => EventKind::MovementCompleted,
            EventPayload::ActionSelected { .. } => EventKind::ActionSelected,
            EventPayload::TargetConfirmed { .. } => EventKind::TargetConfirmed,
            EventPayload::ActionExecuted { .. } => EventKind::ActionExecuted,
            EventPayload::ActionCancelled { .. } => EventKind::ActionCancelled,
            EventPayload::InspectToggled => EventKind::InspectToggled,
            EventPayload::UnitAttacked { .. } => EventKind::UnitAttacked,
            EventPayload::UnitTookDamage { .. } => EventKind::UnitTookDamage,
            EventPayload::UnitDefeated { .. } => EventKind::UnitDefeated,
            EventPayload::BattlePhaseChanged { .. } => EventKind::BattlePhaseChanged,
            EventPayload::InterruptPrepared { .. } => EventKind::InterruptPrepared,
            EventPayload::InterruptTriggered { .. } => EventKind::InterruptTriggered,
            EventPayload::ObjectiveCompleted { .. } => EventKind::ObjectiveCompleted,
            EventPayload::ObjectiveFailed { .. } => EventKind::ObjectiveFailed,
            EventPayload::ScenarioLoaded { .. } => EventKind::ScenarioLoaded,
            EventPayload::LogMessage { .. } => EventKind::LogMessage,
            EventPayload::HazardTriggered { .. } => EventKind::HazardTriggered,
            EventPayload::MoraleChanged { .. } => EventKind::MoraleChanged,
            EventPayload::UnitRouted { .. } => EventKind::UnitRouted,
            EventPayload::UnitRallied { .. } => EventKind::UnitRallied,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        let event = GameEvent::new(
            5,
            EventPayload::TurnStarted { unit: EntityId(1), team: Team::Player },
        );
        assert_eq!(event.kind(), EventKind::TurnStarted);
        assert_eq!(event.tick, 5);
    }

    #[test]
    fn test_events_compare_by_value() {
        let a = GameEvent::new(1, EventPayload::UnitSelected { unit: EntityId(3) });
        let b = GameEvent::new(1, EventPayload::UnitSelected { unit: EntityId(3) });
        assert_eq!(a, b);
    }
}
