//! Environmental hazards on the timeline
//!
//! Hazards are scheduled like units and share the same ordering rules.
//! Popping one burns whoever stands on its tile, then reschedules it
//! while charges remain. Spreading patterns stay out of scope.

use serde::{Deserialize, Serialize};

use crate::battle::state::GameState;
use crate::combat::resolver;
use crate::core::error::Result;
use crate::core::types::{Vector2, Weight};
use crate::events::bus::EventBus;
use crate::events::events::EventPayload;
use crate::timeline::EntryKind;

/// A damaging battlefield feature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hazard {
    pub id: u32,
    pub name: String,
    pub position: Vector2,
    /// Damage applied to the tile's occupant per activation
    pub potency: i32,
    /// Ticks between activations
    pub period: Weight,
    /// Remaining activations; zero means burnt out
    pub charges: u32,
}

/// Resolve a hazard entry surfaced by the timeline.
pub fn on_hazard_popped(state: &mut GameState, bus: &mut EventBus, hazard_id: u32) -> Result<()> {
    let Some(hazard) = state.hazard(hazard_id) else {
        return Ok(()); // removed between scheduling and firing
    };
    if hazard.charges == 0 {
        return Ok(());
    }
    let position = hazard.position;
    let potency = hazard.potency;
    let name = hazard.name.clone();

    let event = state.event(EventPayload::HazardTriggered { hazard: hazard_id, position, potency });
    bus.publish(event, state)?;

    if let Some(victim) = state.map.occupant(position) {
        resolver::apply_raw_damage(state, bus, victim, potency, None)?;
    }

    let now = state.now();
    let reschedule = match state.hazard_mut(hazard_id) {
        Some(hazard) => {
            hazard.charges -= 1;
            (hazard.charges > 0).then_some(hazard.period)
        }
        None => None,
    };
    if let Some(period) = reschedule {
        state
            .timeline
            .schedule(EntryKind::Hazard(hazard_id), now + period as u64, name);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Team;
    use crate::entity::unit::UnitClass;
    use crate::events::events::EventKind;

    fn fire_pit(id: u32, position: Vector2, charges: u32) -> Hazard {
        Hazard { id, name: "Fire".into(), position, potency: 4, period: 120, charges }
    }

    #[test]
    fn test_hazard_burns_occupant() {
        let mut state = GameState::for_tests(8, 8);
        let victim = state.spawn("V", UnitClass::Warrior, Team::Player, Vector2::new(2, 2));
        state.hazards.push(fire_pit(1, Vector2::new(2, 2), 2));
        let mut bus = EventBus::new(16);

        on_hazard_popped(&mut state, &mut bus, 1).unwrap();

        let unit = state.unit(victim).unwrap();
        assert_eq!(unit.health.hp_current, unit.health.hp_max - 4);
        assert!(bus.history().iter().any(|e| e.kind() == EventKind::HazardTriggered));
        assert!(bus.history().iter().any(|e| e.kind() == EventKind::UnitTookDamage));
    }

    #[test]
    fn test_hazard_fires_on_empty_tile() {
        let mut state = GameState::for_tests(8, 8);
        state.hazards.push(fire_pit(1, Vector2::new(5, 5), 1));
        let mut bus = EventBus::new(16);

        on_hazard_popped(&mut state, &mut bus, 1).unwrap();
        assert!(bus.history().iter().any(|e| e.kind() == EventKind::HazardTriggered));
        assert!(!bus.history().iter().any(|e| e.kind() == EventKind::UnitTookDamage));
    }

    #[test]
    fn test_hazard_reschedules_while_charged() {
        let mut state = GameState::for_tests(8, 8);
        state.hazards.push(fire_pit(1, Vector2::new(5, 5), 3));
        let mut bus = EventBus::new(16);

        on_hazard_popped(&mut state, &mut bus, 1).unwrap();
        assert_eq!(state.timeline.live_len(), 1);
        assert_eq!(state.hazard(1).unwrap().charges, 2);
    }

    #[test]
    fn test_spent_hazard_stays_quiet() {
        let mut state = GameState::for_tests(8, 8);
        state.hazards.push(fire_pit(1, Vector2::new(5, 5), 1));
        let mut bus = EventBus::new(16);

        on_hazard_popped(&mut state, &mut bus, 1).unwrap();
        assert_eq!(state.timeline.live_len(), 0);

        on_hazard_popped(&mut state, &mut bus, 1).unwrap();
        let triggers = bus
            .history()
            .iter()
            .filter(|e| e.kind() == EventKind::HazardTriggered)
            .count();
        assert_eq!(triggers, 1);
    }

    #[test]
    fn test_unknown_hazard_is_ignored() {
        let mut state = GameState::for_tests(8, 8);
        let mut bus = EventBus::new(16);
        assert!(on_hazard_popped(&mut state, &mut bus, 99).is_ok());
    }
}
