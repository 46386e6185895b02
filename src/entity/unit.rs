//! Unit composition and class templates
//!
//! A unit is an id plus its components. The five required components
//! are direct fields, validated by construction; the optional ones are
//! explicit Options.

use serde::{Deserialize, Serialize};

use crate::entity::components::{
    ActorComponent, AiComponent, CombatComponent, ComponentKind, ComponentRef, HealthComponent,
    InterruptComponent, MoraleComponent, MovementComponent, StatusComponent, WoundComponent,
};
use crate::core::types::{EntityId, Team, Vector2};

/// Unit classes available to scenarios
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnitClass {
    Knight,
    Warrior,
    Archer,
    Mage,
    Scout,
}

/// Baseline stats for a class
#[derive(Debug, Clone, Copy)]
pub struct ClassTemplate {
    pub hp: i32,
    pub strength: i32,
    pub defense: i32,
    pub range_min: u32,
    pub range_max: u32,
    pub crit_chance: u32,
    pub accuracy: u32,
    pub movement: u32,
    pub speed: u32,
}

impl UnitClass {
    pub fn name(&self) -> &'static str {
        match self {
            UnitClass::Knight => "Knight",
            UnitClass::Warrior => "Warrior",
            UnitClass::Archer => "Archer",
            UnitClass::Mage => "Mage",
            UnitClass::Scout => "Scout",
        }
    }

    pub fn template(&self) -> ClassTemplate {
        match self {
            UnitClass::Knight => ClassTemplate {
                hp: 24,
                strength: 8,
                defense: 6,
                range_min: 1,
                range_max: 1,
                crit_chance: 5,
                accuracy: 85,
                movement: 3,
                speed: 10,
            },
            UnitClass::Warrior => ClassTemplate {
                hp: 20,
                strength: 7,
                defense: 3,
                range_min: 1,
                range_max: 1,
                crit_chance: 10,
                accuracy: 80,
                movement: 4,
                speed: 5,
            },
            UnitClass::Archer => ClassTemplate {
                hp: 14,
                strength: 6,
                defense: 1,
                range_min: 2,
                range_max: 3,
                crit_chance: 15,
                accuracy: 90,
                movement: 4,
                speed: 5,
            },
            UnitClass::Mage => ClassTemplate {
                hp: 12,
                strength: 9,
                defense: 0,
                range_min: 2,
                range_max: 3,
                crit_chance: 5,
                accuracy: 95,
                movement: 3,
                speed: 15,
            },
            UnitClass::Scout => ClassTemplate {
                hp: 14,
                strength: 5,
                defense: 1,
                range_min: 1,
                range_max: 1,
                crit_chance: 20,
                accuracy: 90,
                movement: 6,
                speed: 0,
            },
        }
    }

    /// Heavy strikes are drilled into the melee line, not the back rank
    pub fn can_power_attack(&self) -> bool {
        matches!(self, UnitClass::Knight | UnitClass::Warrior)
    }
}

/// A composite battlefield entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    pub id: EntityId,
    pub actor: ActorComponent,
    pub health: HealthComponent,
    pub movement: MovementComponent,
    pub combat: CombatComponent,
    pub status: StatusComponent,
    pub morale: Option<MoraleComponent>,
    pub wound: Option<WoundComponent>,
    pub interrupt: Option<InterruptComponent>,
    pub ai: Option<AiComponent>,
}

impl Unit {
    /// Build a unit from its class template
    pub fn from_class(
        id: EntityId,
        name: impl Into<String>,
        class: UnitClass,
        team: Team,
        position: Vector2,
    ) -> Self {
        let t = class.template();
        Self {
            id,
            actor: ActorComponent { name: name.into(), team, class },
            health: HealthComponent::new(t.hp),
            movement: MovementComponent::new(position, t.movement, t.speed),
            combat: CombatComponent {
                strength: t.strength,
                defense: t.defense,
                range_min: t.range_min,
                range_max: t.range_max,
                crit_chance: t.crit_chance,
                accuracy: t.accuracy,
            },
            status: StatusComponent::default(),
            morale: Some(MoraleComponent::default()),
            wound: Some(WoundComponent::default()),
            interrupt: None,
            ai: None,
        }
    }

    pub fn with_ai(mut self, ai: AiComponent) -> Self {
        self.ai = Some(ai);
        self
    }

    pub fn is_alive(&self) -> bool {
        self.health.is_alive()
    }

    pub fn position(&self) -> Vector2 {
        self.movement.position
    }

    pub fn team(&self) -> Team {
        self.actor.team
    }

    pub fn name(&self) -> &str {
        &self.actor.name
    }

    /// Effective attack strength after wound penalties
    pub fn effective_strength(&self) -> i32 {
        let penalty = self.wound.as_ref().map(|w| w.attack_penalty()).unwrap_or(0);
        (self.combat.strength + penalty).max(0)
    }

    /// Effective defense after wound penalties
    pub fn effective_defense(&self) -> i32 {
        let penalty = self.wound.as_ref().map(|w| w.defense_penalty()).unwrap_or(0);
        (self.combat.defense + penalty).max(0)
    }

    pub fn has_component(&self, kind: ComponentKind) -> bool {
        match kind {
            ComponentKind::Actor
            | ComponentKind::Health
            | ComponentKind::Movement
            | ComponentKind::Combat
            | ComponentKind::Status => true,
            ComponentKind::Morale => self.morale.is_some(),
            ComponentKind::Wound => self.wound.is_some(),
            ComponentKind::Interrupt => self.interrupt.is_some(),
            ComponentKind::Ai => self.ai.is_some(),
        }
    }

    /// Closed-tag component query
    pub fn component(&self, kind: ComponentKind) -> Option<ComponentRef<'_>> {
        match kind {
            ComponentKind::Actor => Some(ComponentRef::Actor(&self.actor)),
            ComponentKind::Health => Some(ComponentRef::Health(&self.health)),
            ComponentKind::Movement => Some(ComponentRef::Movement(&self.movement)),
            ComponentKind::Combat => Some(ComponentRef::Combat(&self.combat)),
            ComponentKind::Status => Some(ComponentRef::Status(&self.status)),
            ComponentKind::Morale => self.morale.as_ref().map(ComponentRef::Morale),
            ComponentKind::Wound => self.wound.as_ref().map(ComponentRef::Wound),
            ComponentKind::Interrupt => self.interrupt.as_ref().map(ComponentRef::Interrupt),
            ComponentKind::Ai => self.ai.as_ref().map(ComponentRef::Ai),
        }
    }
}
