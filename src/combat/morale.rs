//! Morale model
//!
//! Battles are won by breaking the enemy's will as much as their
//! bodies. Morale sits in [0, 150]; crossing the panic or rout
//! thresholds changes a unit's state, and recovery needs headroom
//! above the panic line.

use serde::{Deserialize, Serialize};

use crate::entity::components::MoraleComponent;

pub const MORALE_MIN: i32 = 0;
pub const MORALE_MAX: i32 = 150;
pub const PANIC_THRESHOLD: i32 = 30;
pub const ROUT_THRESHOLD: i32 = 10;
/// Morale needed above the panic line to shake off panic
pub const RECOVERY_MARGIN: i32 = 15;

/// Named morale states exposed to the UI and action weighting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MoraleState {
    Heroic,    // 90+
    Confident, // 70..90
    Normal,    // 45..70
    Shaken,    // panic threshold..45
    Panicked,
    Routed,
}

/// What a morale adjustment did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoraleShift {
    pub old: i32,
    pub new: i32,
    pub entered_panic: bool,
    pub entered_rout: bool,
    pub recovered: bool,
}

impl MoraleShift {
    pub fn delta(&self) -> i32 {
        self.new - self.old
    }
}

/// State for a morale component, honoring sticky panic/rout flags
pub fn state_of(morale: &MoraleComponent) -> MoraleState {
    if morale.routed {
        return MoraleState::Routed;
    }
    if morale.panicked {
        return MoraleState::Panicked;
    }
    match morale.effective() {
        v if v >= 90 => MoraleState::Heroic,
        v if v >= 70 => MoraleState::Confident,
        v if v >= 45 => MoraleState::Normal,
        _ => MoraleState::Shaken,
    }
}

/// Apply a morale change and process state transitions.
pub fn modify(morale: &mut MoraleComponent, amount: i32) -> MoraleShift {
    let old = morale.effective();
    morale.value = (morale.value + amount).clamp(MORALE_MIN, MORALE_MAX);
    let new = morale.effective();

    let mut shift = MoraleShift {
        old,
        new,
        entered_panic: false,
        entered_rout: false,
        recovered: false,
    };

    if !morale.panicked && new <= PANIC_THRESHOLD {
        morale.panicked = true;
        shift.entered_panic = true;
    }
    if !morale.routed && new <= ROUT_THRESHOLD {
        morale.routed = true;
        morale.panicked = true;
        shift.entered_rout = true;
    }
    if morale.panicked && !morale.routed && new >= PANIC_THRESHOLD + RECOVERY_MARGIN {
        morale.panicked = false;
        shift.recovered = true;
    }

    shift
}

/// Extra action weight carried by a shaken mind
pub fn weight_penalty(state: MoraleState) -> u32 {
    match state {
        MoraleState::Heroic | MoraleState::Confident | MoraleState::Normal => 0,
        MoraleState::Shaken => 10,
        MoraleState::Panicked => 20,
        MoraleState::Routed => 30,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh(value: i32) -> MoraleComponent {
        MoraleComponent { value, modifiers: Vec::new(), panicked: false, routed: false }
    }

    #[test]
    fn test_state_bands() {
        assert_eq!(state_of(&fresh(100)), MoraleState::Heroic);
        assert_eq!(state_of(&fresh(75)), MoraleState::Confident);
        assert_eq!(state_of(&fresh(50)), MoraleState::Normal);
        assert_eq!(state_of(&fresh(35)), MoraleState::Shaken);
    }

    #[test]
    fn test_panic_on_crossing_threshold() {
        let mut morale = fresh(40);
        let shift = modify(&mut morale, -15);
        assert!(shift.entered_panic);
        assert!(morale.panicked);
        assert_eq!(state_of(&morale), MoraleState::Panicked);
    }

    #[test]
    fn test_rout_on_collapse() {
        let mut morale = fresh(20);
        let shift = modify(&mut morale, -15);
        assert!(shift.entered_rout);
        assert!(morale.routed);
        assert_eq!(state_of(&morale), MoraleState::Routed);
    }

    #[test]
    fn test_recovery_needs_margin() {
        let mut morale = fresh(25);
        modify(&mut morale, 0);
        assert!(morale.panicked);

        // Just above the threshold is not enough
        modify(&mut morale, 10);
        assert!(morale.panicked);

        // Past threshold + margin recovers
        let shift = modify(&mut morale, 15);
        assert!(shift.recovered);
        assert!(!morale.panicked);
    }

    #[test]
    fn test_routed_units_do_not_recover() {
        let mut morale = fresh(5);
        modify(&mut morale, 0);
        assert!(morale.routed);

        modify(&mut morale, 100);
        assert!(morale.routed);
        assert_eq!(state_of(&morale), MoraleState::Routed);
    }

    #[test]
    fn test_morale_clamped() {
        let mut morale = fresh(140);
        modify(&mut morale, 50);
        assert_eq!(morale.value, MORALE_MAX);

        let mut morale = fresh(5);
        modify(&mut morale, -50);
        assert_eq!(morale.value, MORALE_MIN);
    }

    #[test]
    fn test_weight_penalty_rises_with_distress() {
        assert_eq!(weight_penalty(MoraleState::Normal), 0);
        assert!(weight_penalty(MoraleState::Panicked) > weight_penalty(MoraleState::Shaken));
        assert!(weight_penalty(MoraleState::Routed) > weight_penalty(MoraleState::Panicked));
    }
}
