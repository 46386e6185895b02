//! Timeline manager: keeps the queue consistent with unit lifecycles
//!
//! Defeat is signaled by event; this manager tombstones the fallen
//! unit's pending entries so a dead unit can never surface from a pop.

use crate::battle::state::GameState;
use crate::events::bus::{EventWriter, Subscriber};
use crate::events::events::{EventKind, EventPayload, GameEvent};

pub struct TimelineManager;

impl Subscriber for TimelineManager {
    fn name(&self) -> &'static str {
        "timeline"
    }

    fn interests(&self) -> &'static [EventKind] {
        &[EventKind::UnitDefeated]
    }

    fn handle(&mut self, event: &GameEvent, state: &mut GameState, _out: &mut EventWriter) {
        if let EventPayload::UnitDefeated { unit, .. } = &event.payload {
            let cancelled = state.timeline.cancel(*unit);
            if cancelled > 0 {
                log::debug!("tombstoned {} timeline entries for {:?}", cancelled, unit);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{Team, Vector2};
    use crate::entity::unit::UnitClass;
    use crate::events::bus::EventBus;
    use crate::timeline::EntryKind;

    #[test]
    fn test_defeat_tombstones_pending_entries() {
        let mut state = GameState::for_tests(8, 8);
        let unit = state.spawn("U", UnitClass::Warrior, Team::Enemy, Vector2::new(1, 1));
        state.timeline.schedule(EntryKind::Unit(unit), 50, "act");
        state.timeline.schedule(EntryKind::Unit(unit), 150, "act");

        let mut bus = EventBus::new(16);
        bus.subscribe(90, Box::new(TimelineManager));

        let event = state.event(EventPayload::UnitDefeated { unit, killer: None, at_tick: 0 });
        bus.publish(event, &mut state).unwrap();

        assert!(state.timeline.is_empty());
    }
}
