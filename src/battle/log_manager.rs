//! Battle log: the rolling ring of human-readable messages
//!
//! The log manager subscribes to everything and narrates the battle
//! into GameState's ring. Renderers read the ring; nothing reads it
//! back into simulation decisions.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::battle::state::GameState;
use crate::core::types::{EntityId, Tick};
use crate::events::bus::{EventWriter, Subscriber};
use crate::events::events::{EventKind, EventPayload, GameEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

/// One line in the battle log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub tick: Tick,
    pub level: LogLevel,
    pub category: String,
    pub text: String,
}

/// Bounded ring of log entries; oldest lines fall off the back
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRing {
    entries: VecDeque<LogEntry>,
    capacity: usize,
}

impl LogRing {
    pub fn new(capacity: usize) -> Self {
        Self { entries: VecDeque::with_capacity(capacity), capacity }
    }

    pub fn push(&mut self, entry: LogEntry) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }

    /// The most recent `count` entries, oldest first
    pub fn latest(&self, count: usize) -> impl Iterator<Item = &LogEntry> {
        let skip = self.entries.len().saturating_sub(count);
        self.entries.iter().skip(skip)
    }
}

/// Narrates events into the ring
pub struct LogManager;

fn name_of(state: &GameState, id: EntityId) -> String {
    state
        .unit(id)
        .map(|u| u.name().to_string())
        .unwrap_or_else(|| format!("unit#{}", id.0))
}

/// Render an event as a log line, or None for chatter not worth a line
fn narrate(state: &GameState, event: &GameEvent) -> Option<(LogLevel, String, String)> {
    let line = match &event.payload {
        EventPayload::TurnStarted { unit, .. } => {
            (LogLevel::Debug, "TURN", format!("{} acts", name_of(state, *unit)))
        }
        EventPayload::UnitMoved { unit, to, cost, .. } => (
            LogLevel::Info,
            "MOVE",
            format!("{} moves to {} ({} mv)", name_of(state, *unit), to, cost),
        ),
        EventPayload::UnitAttacked { attacker, defender, counter, .. } => {
            let verb = if *counter { "counters" } else { "attacks" };
            (
                LogLevel::Info,
                "COMBAT",
                format!("{} {} {}", name_of(state, *attacker), verb, name_of(state, *defender)),
            )
        }
        EventPayload::UnitTookDamage { unit, amount, crit, resulting_hp } => {
            let crit_mark = if *crit { " (critical)" } else { "" };
            (
                LogLevel::Info,
                "COMBAT",
                format!(
                    "{} takes {} damage{}, {} hp left",
                    name_of(state, *unit),
                    amount,
                    crit_mark,
                    resulting_hp
                ),
            )
        }
        EventPayload::UnitDefeated { unit, killer, .. } => {
            let text = match killer {
                Some(killer) => format!(
                    "{} falls to {}",
                    name_of(state, *unit),
                    name_of(state, *killer)
                ),
                None => format!("{} perishes", name_of(state, *unit)),
            };
            (LogLevel::Warning, "COMBAT", text)
        }
        EventPayload::InterruptPrepared { unit } => (
            LogLevel::Info,
            "COMBAT",
            format!("{} braces for an opening", name_of(state, *unit)),
        ),
        EventPayload::InterruptTriggered { unit, against } => (
            LogLevel::Info,
            "COMBAT",
            format!(
                "{} springs their prepared strike at {}",
                name_of(state, *unit),
                name_of(state, *against)
            ),
        ),
        EventPayload::HazardTriggered { position, .. } => {
            (LogLevel::Warning, "HAZARD", format!("the ground erupts at {}", position))
        }
        EventPayload::MoraleChanged { unit, new, state: morale_state, .. } => (
            LogLevel::Debug,
            "MORALE",
            format!("{} morale {} ({:?})", name_of(state, *unit), new, morale_state),
        ),
        EventPayload::UnitRouted { unit } => {
            (LogLevel::Warning, "MORALE", format!("{} breaks and routs", name_of(state, *unit)))
        }
        EventPayload::UnitRallied { unit } => {
            (LogLevel::Info, "MORALE", format!("{} steadies", name_of(state, *unit)))
        }
        EventPayload::ObjectiveCompleted { description } => {
            (LogLevel::Warning, "OBJECTIVE", format!("victory: {}", description))
        }
        EventPayload::ObjectiveFailed { description } => {
            (LogLevel::Warning, "OBJECTIVE", format!("defeat: {}", description))
        }
        EventPayload::ScenarioLoaded { name } => {
            (LogLevel::Info, "SCENARIO", format!("{} begins", name))
        }
        EventPayload::LogMessage { level, category, text } => {
            (*level, category.as_str(), text.clone())
        }
        _ => return None,
    };
    Some((line.0, line.1.to_string(), line.2))
}

impl Subscriber for LogManager {
    fn name(&self) -> &'static str {
        "log"
    }

    fn interests(&self) -> &'static [EventKind] {
        &[] // every event
    }

    fn handle(&mut self, event: &GameEvent, state: &mut GameState, _out: &mut EventWriter) {
        if let Some((level, category, text)) = narrate(state, event) {
            log::debug!("[{}] {}", category, text);
            state.log.push(LogEntry { tick: event.tick, level, category, text });
        }
    }
}
