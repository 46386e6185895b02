//! Typed unit components behind a closed ComponentKind tag
//!
//! Every unit carries the five required components; morale, wounds,
//! interrupts, and AI are optional and branched on explicitly. There
//! is no stringly-typed lookup; `ComponentKind` is the complete set.

use serde::{Deserialize, Serialize};

use crate::ai::personality::AiPersonality;
use crate::battle::interrupts::PreparedAction;
use crate::combat::morale::{MORALE_MAX, MORALE_MIN};
use crate::combat::wounds::Wound;
use crate::core::types::{EntityId, Facing, Team, Vector2, Weight};
use crate::entity::unit::UnitClass;

/// Closed set of component tags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComponentKind {
    Actor,
    Health,
    Movement,
    Combat,
    Status,
    Morale,
    Wound,
    Interrupt,
    Ai,
}

/// Identity and classification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActorComponent {
    pub name: String,
    pub team: Team,
    pub class: UnitClass,
}

impl ActorComponent {
    pub fn is_ally_of(&self, other: &ActorComponent) -> bool {
        self.team == other.team
    }
}

/// Life and death
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthComponent {
    pub hp_max: i32,
    pub hp_current: i32,
}

impl HealthComponent {
    pub fn new(hp_max: i32) -> Self {
        Self { hp_max, hp_current: hp_max }
    }

    pub fn is_alive(&self) -> bool {
        self.hp_current > 0
    }

    /// Apply damage; returns the amount actually removed
    pub fn take_damage(&mut self, amount: i32) -> i32 {
        let before = self.hp_current;
        self.hp_current = (self.hp_current - amount.max(0)).max(0);
        before - self.hp_current
    }

    /// Apply healing; returns the amount actually restored
    pub fn heal(&mut self, amount: i32) -> i32 {
        let before = self.hp_current;
        self.hp_current = (self.hp_current + amount.max(0)).min(self.hp_max);
        self.hp_current - before
    }
}

/// Position and movement capability
///
/// `position` is authoritative; the map occupancy index follows it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovementComponent {
    pub position: Vector2,
    pub facing: Facing,
    /// Points remaining this activation
    pub movement_points: u32,
    /// Points restored at the start of each activation
    pub movement_base: u32,
    /// Tick cost baseline added to every action weight when rescheduling
    pub speed: u32,
}

impl MovementComponent {
    pub fn new(position: Vector2, movement_base: u32, speed: u32) -> Self {
        Self {
            position,
            facing: Facing::default(),
            movement_points: movement_base,
            movement_base,
            speed,
        }
    }

    pub fn face_towards(&mut self, target: Vector2) {
        let dx = target.x - self.position.x;
        let dy = target.y - self.position.y;
        if dx.abs() > dy.abs() {
            self.facing = if dx > 0 { Facing::East } else { Facing::West };
        } else if dy != 0 {
            self.facing = if dy > 0 { Facing::South } else { Facing::North };
        }
    }
}

/// Combat statistics
///
/// `accuracy` is a display metric only; every attack in this system
/// connects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombatComponent {
    pub strength: i32,
    pub defense: i32,
    pub range_min: u32,
    pub range_max: u32,
    pub crit_chance: u32,
    pub accuracy: u32,
}

impl CombatComponent {
    pub fn in_range(&self, distance: u32) -> bool {
        distance >= self.range_min && distance <= self.range_max
    }
}

/// A named temporary stat adjustment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatModifier {
    pub name: String,
    pub amount: i32,
}

/// Turn-scoped flags and temporary modifiers
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StatusComponent {
    pub has_moved: bool,
    pub has_acted: bool,
    pub modifiers: Vec<StatModifier>,
}

impl StatusComponent {
    pub fn begin_activation(&mut self) {
        self.has_moved = false;
        self.has_acted = false;
    }

    pub fn end_activation(&mut self) {
        self.has_moved = false;
        self.has_acted = false;
        self.modifiers.retain(|m| !m.name.starts_with("turn:"));
    }
}

/// Named morale adjustment (leadership, terror, and the like)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoraleModifier {
    pub name: String,
    pub amount: i32,
}

/// Psychological state; optional component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoraleComponent {
    pub value: i32,
    pub modifiers: Vec<MoraleModifier>,
    pub panicked: bool,
    pub routed: bool,
}

impl MoraleComponent {
    pub fn new(value: i32) -> Self {
        Self { value, modifiers: Vec::new(), panicked: false, routed: false }
    }

    /// Current morale including modifiers, clamped to the legal band
    pub fn effective(&self) -> i32 {
        let total: i32 = self.value + self.modifiers.iter().map(|m| m.amount).sum::<i32>();
        total.clamp(MORALE_MIN, MORALE_MAX)
    }
}

impl Default for MoraleComponent {
    fn default() -> Self {
        Self::new(100)
    }
}

/// Carried injuries; optional component
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WoundComponent {
    pub wounds: Vec<Wound>,
}

impl WoundComponent {
    pub fn add(&mut self, wound: Wound) {
        self.wounds.push(wound);
    }

    pub fn count(&self) -> usize {
        self.wounds.len()
    }

    pub fn attack_penalty(&self) -> i32 {
        self.wounds.iter().map(|w| w.attack_penalty).sum()
    }

    pub fn defense_penalty(&self) -> i32 {
        self.wounds.iter().map(|w| w.defense_penalty).sum()
    }

    pub fn speed_penalty(&self) -> Weight {
        self.wounds.iter().map(|w| w.speed_penalty).sum()
    }
}

/// At most one prepared action waiting on a trigger; optional component
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct InterruptComponent {
    pub prepared: Option<PreparedAction>,
}

impl InterruptComponent {
    pub fn can_prepare(&self) -> bool {
        self.prepared.is_none()
    }
}

/// AI control; optional component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiComponent {
    pub personality: AiPersonality,
    pub last_target: Option<EntityId>,
}

impl AiComponent {
    pub fn new(personality: AiPersonality) -> Self {
        Self { personality, last_target: None }
    }
}

/// Borrowed view of one component, produced by the closed-tag query
#[derive(Debug)]
pub enum ComponentRef<'a> {
    Actor(&'a ActorComponent),
    Health(&'a HealthComponent),
    Movement(&'a MovementComponent),
    Combat(&'a CombatComponent),
    Status(&'a StatusComponent),
    Morale(&'a MoraleComponent),
    Wound(&'a WoundComponent),
    Interrupt(&'a InterruptComponent),
    Ai(&'a AiComponent),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_damage_floor() {
        let mut health = HealthComponent::new(10);
        let dealt = health.take_damage(15);
        assert_eq!(dealt, 10);
        assert_eq!(health.hp_current, 0);
        assert!(!health.is_alive());
    }

    #[test]
    fn test_health_heal_cap() {
        let mut health = HealthComponent::new(10);
        health.take_damage(4);
        let restored = health.heal(100);
        assert_eq!(restored, 4);
        assert_eq!(health.hp_current, 10);
    }

    #[test]
    fn test_negative_damage_ignored() {
        let mut health = HealthComponent::new(10);
        assert_eq!(health.take_damage(-5), 0);
        assert_eq!(health.hp_current, 10);
    }

    #[test]
    fn test_face_towards_dominant_axis() {
        let mut movement = MovementComponent::new(Vector2::new(5, 5), 3, 0);
        movement.face_towards(Vector2::new(9, 6));
        assert_eq!(movement.facing, Facing::East);
        movement.face_towards(Vector2::new(5, 1));
        assert_eq!(movement.facing, Facing::North);
    }

    #[test]
    fn test_combat_range_band() {
        let combat = CombatComponent {
            strength: 5,
            defense: 3,
            range_min: 2,
            range_max: 3,
            crit_chance: 5,
            accuracy: 85,
        };
        assert!(!combat.in_range(1));
        assert!(combat.in_range(2));
        assert!(combat.in_range(3));
        assert!(!combat.in_range(4));
    }

    #[test]
    fn test_morale_effective_clamped() {
        let mut morale = MoraleComponent::new(140);
        morale.modifiers.push(MoraleModifier { name: "banner".into(), amount: 30 });
        assert_eq!(morale.effective(), 150);
    }

    #[test]
    fn test_wound_penalties_accumulate() {
        use crate::combat::wounds::{BodyPart, WoundSeverity};
        let mut wounds = WoundComponent::default();
        wounds.add(Wound::new(WoundSeverity::Moderate, BodyPart::Torso));
        wounds.add(Wound::new(WoundSeverity::Severe, BodyPart::LeftLeg));
        assert_eq!(wounds.count(), 2);
        assert!(wounds.attack_penalty() <= -3);
        assert!(wounds.speed_penalty() >= 30);
    }

    #[test]
    fn test_status_turn_scoped_modifiers_cleared() {
        let mut status = StatusComponent::default();
        status.modifiers.push(StatModifier { name: "turn:brace".into(), amount: 2 });
        status.modifiers.push(StatModifier { name: "blessing".into(), amount: 1 });
        status.end_activation();
        assert_eq!(status.modifiers.len(), 1);
        assert_eq!(status.modifiers[0].name, "blessing");
    }
}
