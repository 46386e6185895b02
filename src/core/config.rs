//! Simulation configuration with documented constants
//!
//! All tuning numbers are collected here with explanations of their
//! purpose and how they interact with each other.

use serde::{Deserialize, Serialize};

/// Configuration for the combat simulation
///
/// These values are tuned for short, brutal skirmishes. Changing them
/// shifts pacing and the lethality curve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    // === EVENTS ===
    /// Maximum nesting depth of event publishes
    ///
    /// A publish made from inside a handler increases depth by one.
    /// Exceeding the limit is fatal; it surfaces infinite event loops
    /// instead of hanging the simulation.
    pub event_recursion_limit: usize,

    // === WOUNDS ===
    /// Fraction of hp_max a single hit must reach to inflict a wound
    ///
    /// At 0.3, a unit with 20 hp is wounded by any hit of 6 or more.
    /// Severity scales with the damage ratio above this floor.
    pub wound_damage_ratio: f32,

    // === MORALE ===
    /// Morale lost per point of damage taken
    ///
    /// At 0.5, a 10-damage hit costs 5 morale. Morale sits in [0, 150],
    /// so sustained combat erodes resolve in roughly ten exchanges.
    pub damage_morale_ratio: f32,

    /// Morale change for allies within the proximity radius of a death
    pub ally_death_morale_penalty: i32,

    /// Morale change for enemies within the proximity radius of a death
    pub enemy_death_morale_bonus: i32,

    /// Manhattan radius for death-proximity morale effects
    pub morale_proximity_radius: u32,

    /// Minimum absolute morale delta worth announcing as an event
    ///
    /// Smaller shifts still apply; they just do not generate
    /// MoraleChanged traffic.
    pub morale_event_threshold: i32,

    // === TIMELINE UI ===
    /// Entries shown in the timeline preview strip
    pub timeline_preview_len: usize,

    /// Manhattan distance at which an enemy's scheduled intent is
    /// revealed in the preview (Full instead of Partial)
    pub intent_reveal_range: u32,

    // === LOG ===
    /// Capacity of the rolling battle log ring
    pub log_capacity: usize,

    // === CAMERA ===
    /// Tiles of slack kept between the cursor and the viewport edge
    pub camera_margin: i32,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            event_recursion_limit: 16,
            wound_damage_ratio: 0.3,
            damage_morale_ratio: 0.5,
            ally_death_morale_penalty: -15,
            enemy_death_morale_bonus: 5,
            morale_proximity_radius: 3,
            morale_event_threshold: 5,
            timeline_preview_len: 5,
            intent_reveal_range: 3,
            log_capacity: 100,
            camera_margin: 3,
        }
    }
}

impl SimulationConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.event_recursion_limit == 0 {
            return Err("event_recursion_limit must be at least 1".into());
        }

        if !(0.0..=1.0).contains(&self.wound_damage_ratio) {
            return Err(format!(
                "wound_damage_ratio ({}) must be within [0, 1]",
                self.wound_damage_ratio
            ));
        }

        if self.damage_morale_ratio < 0.0 {
            return Err("damage_morale_ratio must not be negative".into());
        }

        if self.ally_death_morale_penalty > 0 {
            return Err("ally_death_morale_penalty must not be positive".into());
        }

        if self.log_capacity == 0 {
            return Err("log_capacity must be at least 1".into());
        }

        Ok(())
    }
}
