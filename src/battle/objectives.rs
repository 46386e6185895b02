//! Victory and defeat objectives
//!
//! Objectives are predicates in two buckets, evaluated on receipt of
//! the events they care about, never polled. A victory predicate
//! passing emits ObjectiveCompleted; a defeat predicate passing emits
//! ObjectiveFailed. The phase state machine ends the game on either.

use serde::{Deserialize, Serialize};

use crate::battle::state::GameState;
use crate::core::types::{Team, Tick, Vector2};
use crate::events::bus::{EventWriter, Subscriber};
use crate::events::events::{EventKind, EventPayload, GameEvent};

/// The closed set of objective predicates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ObjectivePredicate {
    DefeatAllEnemies,
    SurviveTurns { until_tick: Tick },
    ReachPosition { unit_name: Option<String>, position: Vector2 },
    DefeatUnit { unit_name: String },
    PositionCaptured { position: Vector2 },
    AllUnitsDefeated,
    ProtectUnit { unit_name: String },
    TurnLimit { limit_tick: Tick },
}

impl ObjectivePredicate {
    pub fn describe(&self) -> String {
        match self {
            ObjectivePredicate::DefeatAllEnemies => "defeat all enemies".into(),
            ObjectivePredicate::SurviveTurns { until_tick } => {
                format!("survive until tick {}", until_tick)
            }
            ObjectivePredicate::ReachPosition { unit_name, position } => match unit_name {
                Some(name) => format!("move {} to {}", name, position),
                None => format!("reach {}", position),
            },
            ObjectivePredicate::DefeatUnit { unit_name } => format!("defeat {}", unit_name),
            ObjectivePredicate::PositionCaptured { position } => {
                format!("hold {} for a full turn", position)
            }
            ObjectivePredicate::AllUnitsDefeated => "all your units are lost".into(),
            ObjectivePredicate::ProtectUnit { unit_name } => format!("protect {}", unit_name),
            ObjectivePredicate::TurnLimit { limit_tick } => {
                format!("time runs out at tick {}", limit_tick)
            }
        }
    }

    /// Event kinds this predicate re-evaluates on
    fn interests(&self) -> &'static [EventKind] {
        match self {
            ObjectivePredicate::DefeatAllEnemies
            | ObjectivePredicate::DefeatUnit { .. }
            | ObjectivePredicate::AllUnitsDefeated
            | ObjectivePredicate::ProtectUnit { .. } => &[EventKind::UnitDefeated],
            ObjectivePredicate::SurviveTurns { .. } | ObjectivePredicate::TurnLimit { .. } => {
                &[EventKind::TurnEnded]
            }
            ObjectivePredicate::ReachPosition { .. } => &[EventKind::UnitMoved],
            ObjectivePredicate::PositionCaptured { .. } => {
                &[EventKind::UnitMoved, EventKind::TurnEnded]
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ObjectiveStatus {
    #[default]
    InProgress,
    Met,
}

/// A predicate with its display text and progress
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectiveEntry {
    pub predicate: ObjectivePredicate,
    pub description: String,
    pub status: ObjectiveStatus,
    /// PositionCaptured bookkeeping: set once the tile was held at a
    /// turn boundary; completes if still held at the next one
    armed: bool,
}

impl ObjectiveEntry {
    pub fn new(predicate: ObjectivePredicate) -> Self {
        let description = predicate.describe();
        Self { predicate, description, status: ObjectiveStatus::default(), armed: false }
    }

    /// Re-evaluate against an event. Returns true when newly met.
    fn evaluate(&mut self, event: &GameEvent, state: &GameState) -> bool {
        if self.status == ObjectiveStatus::Met {
            return false;
        }
        if !self.predicate.interests().contains(&event.kind()) {
            return false;
        }

        let met = match &self.predicate {
            ObjectivePredicate::DefeatAllEnemies => state.count_alive(Team::Enemy) == 0,
            ObjectivePredicate::AllUnitsDefeated => state.count_alive(Team::Player) == 0,
            ObjectivePredicate::SurviveTurns { until_tick } => state.now() >= *until_tick,
            ObjectivePredicate::TurnLimit { limit_tick } => state.now() >= *limit_tick,
            ObjectivePredicate::DefeatUnit { unit_name } => match &event.payload {
                EventPayload::UnitDefeated { unit, .. } => {
                    state.unit(*unit).map(|u| u.name() == unit_name).unwrap_or(false)
                }
                _ => false,
            },
            ObjectivePredicate::ProtectUnit { unit_name } => match &event.payload {
                EventPayload::UnitDefeated { unit, .. } => {
                    state.unit(*unit).map(|u| u.name() == unit_name).unwrap_or(false)
                }
                _ => false,
            },
            ObjectivePredicate::ReachPosition { unit_name, position } => match &event.payload {
                EventPayload::UnitMoved { unit, to, .. } => {
                    *to == *position
                        && state
                            .unit(*unit)
                            .map(|u| {
                                u.team() == Team::Player
                                    && unit_name.as_deref().map(|n| n == u.name()).unwrap_or(true)
                            })
                            .unwrap_or(false)
                }
                _ => false,
            },
            ObjectivePredicate::PositionCaptured { position } => {
                match event.kind() {
                    EventKind::UnitMoved => {
                        // Vacating the tile disarms the capture
                        let held = state
                            .unit_at(*position)
                            .map(|u| u.team() == Team::Player)
                            .unwrap_or(false);
                        if !held {
                            self.armed = false;
                        }
                        false
                    }
                    EventKind::TurnEnded => {
                        let held = state
                            .unit_at(*position)
                            .map(|u| u.team() == Team::Player)
                            .unwrap_or(false);
                        if held && self.armed {
                            true
                        } else {
                            self.armed = held;
                            false
                        }
                    }
                    _ => false,
                }
            }
        };

        if met {
            self.status = ObjectiveStatus::Met;
        }
        met
    }
}

/// All objectives of a battle
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ObjectiveSet {
    pub victory: Vec<ObjectiveEntry>,
    pub defeat: Vec<ObjectiveEntry>,
}

impl ObjectiveSet {
    pub fn new(
        victory: Vec<ObjectivePredicate>,
        defeat: Vec<ObjectivePredicate>,
    ) -> Self {
        Self {
            victory: victory.into_iter().map(ObjectiveEntry::new).collect(),
            defeat: defeat.into_iter().map(ObjectiveEntry::new).collect(),
        }
    }
}

/// Evaluates objectives as their events arrive
pub struct ObjectiveManager;

impl Subscriber for ObjectiveManager {
    fn name(&self) -> &'static str {
        "objectives"
    }

    fn interests(&self) -> &'static [EventKind] {
        &[EventKind::UnitDefeated, EventKind::UnitMoved, EventKind::TurnEnded]
    }

    fn handle(&mut self, event: &GameEvent, state: &mut GameState, out: &mut EventWriter) {
        // Entries need &mut while evaluation reads state: take the set out
        let mut objectives = std::mem::take(&mut state.objectives);

        for entry in objectives.victory.iter_mut() {
            if entry.evaluate(event, state) {
                out.emit(state.event(EventPayload::ObjectiveCompleted {
                    description: entry.description.clone(),
                }));
            }
        }
        for entry in objectives.defeat.iter_mut() {
            if entry.evaluate(event, state) {
                out.emit(state.event(EventPayload::ObjectiveFailed {
                    description: entry.description.clone(),
                }));
            }
        }

        state.objectives = objectives;
    }
}
