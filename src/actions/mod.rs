//! Action catalog, validation, and execution
//!
//! Each action declares a category and base weight; its effective
//! weight adds wound and morale penalties. Validation is pure and
//! returns a value; execution mutates state, emits events, and must
//! only run after a successful validation. Human input and AI both go
//! through exactly this path.

use serde::{Deserialize, Serialize};

use crate::battle::interrupts::{InterruptTrigger, PreparedAction};
use crate::battle::state::GameState;
use crate::combat::morale;
use crate::combat::resolver;
use crate::core::error::{GrimError, Result};
use crate::core::types::{EntityId, Vector2, Weight, WEIGHT_MAX, WEIGHT_MIN};
use crate::entity::components::InterruptComponent;
use crate::entity::unit::Unit;
use crate::events::bus::EventBus;
use crate::events::events::EventPayload;
use crate::map::pathfinding;

/// The closed catalog of actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    Move,
    StandardAttack,
    QuickStrike,
    PowerAttack,
    PrepareInterrupt,
    Wait,
}

/// Speed/power class of an action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionCategory {
    Quick,    // 50-80 weight: fast, weak
    Normal,   // 100 weight: the baseline
    Heavy,    // 150-200+ weight: slow, devastating
    Prepared, // 120-140 weight: set up interrupts
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::Move => "Move",
            Action::StandardAttack => "Attack",
            Action::QuickStrike => "Quick Strike",
            Action::PowerAttack => "Power Attack",
            Action::PrepareInterrupt => "Prepare",
            Action::Wait => "Wait",
        }
    }

    pub fn category(&self) -> ActionCategory {
        match self {
            Action::Move => ActionCategory::Normal,
            Action::StandardAttack => ActionCategory::Normal,
            Action::QuickStrike | Action::Wait => ActionCategory::Quick,
            Action::PowerAttack => ActionCategory::Heavy,
            Action::PrepareInterrupt => ActionCategory::Prepared,
        }
    }

    /// Ticks added to the actor's next ready time.
    ///
    /// Move is zero: within an activation movement spends movement
    /// points; only the terminating action carries the time cost.
    pub fn base_weight(&self) -> Weight {
        match self {
            Action::Move => 0,
            Action::StandardAttack => 100,
            Action::QuickStrike => 60,
            Action::PowerAttack => 180,
            Action::PrepareInterrupt => 130,
            Action::Wait => 50,
        }
    }

    /// Damage dealt as a percentage of the standard formula
    pub fn damage_percent(&self) -> Option<u32> {
        match self {
            Action::StandardAttack => Some(100),
            Action::QuickStrike => Some(75),
            Action::PowerAttack => Some(140),
            _ => None,
        }
    }

    pub fn is_attack(&self) -> bool {
        self.damage_percent().is_some()
    }

    /// Terminating actions end the activation and reschedule the actor
    pub fn is_terminating(&self) -> bool {
        !matches!(self, Action::Move)
    }

    /// Only the standard attack leaves the defender an opening
    pub fn allows_counter(&self) -> bool {
        matches!(self, Action::StandardAttack)
    }

    pub fn needs_target(&self) -> bool {
        matches!(self, Action::Move) || self.is_attack()
    }

    /// Effective weight after wound and morale penalties
    pub fn effective_weight(&self, actor: &Unit) -> Weight {
        if *self == Action::Move {
            return 0;
        }
        let mut weight = self.base_weight();
        if let Some(wounds) = &actor.wound {
            weight = weight.saturating_add(wounds.speed_penalty());
        }
        if let Some(morale_component) = &actor.morale {
            weight = weight.saturating_add(morale::weight_penalty(morale::state_of(morale_component)));
        }
        weight.clamp(WEIGHT_MIN, WEIGHT_MAX)
    }
}

/// Menu of actions a unit can take after moving
pub fn available_actions(unit: &Unit) -> Vec<Action> {
    let mut actions = vec![Action::StandardAttack, Action::QuickStrike];
    if unit.actor.class.can_power_attack() {
        actions.push(Action::PowerAttack);
    }
    actions.push(Action::PrepareInterrupt);
    actions.push(Action::Wait);
    actions
}

/// Target of an action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionTarget {
    None,
    Position(Vector2),
    Unit(EntityId),
}

/// Why a validation failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidationFailure {
    NoTarget,
    BadTargetKind,
    OutOfBounds,
    Impassable,
    Occupied,
    NoPath,
    InsufficientMovement { cost: u32, available: u32 },
    OutOfRange { distance: u32, range_min: u32, range_max: u32 },
    TargetMissing,
    TargetDead,
    SelfTarget,
    ActorIncapacitated,
    AlreadyPrepared,
    ClassRestricted,
}

impl std::fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationFailure::NoTarget => write!(f, "no target selected"),
            ValidationFailure::BadTargetKind => write!(f, "wrong kind of target"),
            ValidationFailure::OutOfBounds => write!(f, "outside the map"),
            ValidationFailure::Impassable => write!(f, "terrain is impassable"),
            ValidationFailure::Occupied => write!(f, "tile is occupied"),
            ValidationFailure::NoPath => write!(f, "no path to destination"),
            ValidationFailure::InsufficientMovement { cost, available } => {
                write!(f, "needs {} movement, {} available", cost, available)
            }
            ValidationFailure::OutOfRange { distance, range_min, range_max } => {
                write!(f, "distance {} outside range {}-{}", distance, range_min, range_max)
            }
            ValidationFailure::TargetMissing => write!(f, "target does not exist"),
            ValidationFailure::TargetDead => write!(f, "target is already down"),
            ValidationFailure::SelfTarget => write!(f, "cannot target self"),
            ValidationFailure::ActorIncapacitated => write!(f, "actor cannot act"),
            ValidationFailure::AlreadyPrepared => write!(f, "an action is already prepared"),
            ValidationFailure::ClassRestricted => write!(f, "class cannot use this action"),
        }
    }
}

/// Outcome of validating an action against a target
#[derive(Debug, Clone, PartialEq)]
pub enum ActionValidation {
    Valid { cost: u32 },
    /// Valid, but friendly damage requires a second affirmative input
    NeedsConfirmation { friendlies: Vec<EntityId> },
    Invalid(ValidationFailure),
}

impl ActionValidation {
    pub fn is_valid(&self) -> bool {
        matches!(self, ActionValidation::Valid { .. })
    }

    pub fn is_executable(&self) -> bool {
        !matches!(self, ActionValidation::Invalid(_))
    }
}

/// What an execution did
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActionOutcome {
    pub weight_spent: Weight,
    pub damage_done: i32,
    pub wounds_inflicted: u32,
    pub defeated: Vec<EntityId>,
}

/// Pure validation; shared by UI previews, the engine, and the AI
pub fn validate(
    state: &GameState,
    actor_id: EntityId,
    action: Action,
    target: &ActionTarget,
) -> ActionValidation {
    let actor = match state.unit(actor_id) {
        Some(unit) if unit.is_alive() => unit,
        _ => return ActionValidation::Invalid(ValidationFailure::ActorIncapacitated),
    };

    match action {
        Action::Move => validate_move(state, actor, target),
        Action::StandardAttack | Action::QuickStrike | Action::PowerAttack => {
            validate_attack(state, actor, action, target)
        }
        Action::PrepareInterrupt => {
            let slot_taken = actor
                .interrupt
                .as_ref()
                .map(|i| !i.can_prepare())
                .unwrap_or(false);
            if slot_taken {
                ActionValidation::Invalid(ValidationFailure::AlreadyPrepared)
            } else {
                ActionValidation::Valid { cost: 0 }
            }
        }
        Action::Wait => ActionValidation::Valid { cost: 0 },
    }
}

fn validate_move(state: &GameState, actor: &Unit, target: &ActionTarget) -> ActionValidation {
    let destination = match target {
        ActionTarget::Position(pos) => *pos,
        ActionTarget::None => return ActionValidation::Invalid(ValidationFailure::NoTarget),
        ActionTarget::Unit(_) => return ActionValidation::Invalid(ValidationFailure::BadTargetKind),
    };

    if !state.map.in_bounds(destination) {
        return ActionValidation::Invalid(ValidationFailure::OutOfBounds);
    }
    if !state.map.is_walkable(destination) {
        return ActionValidation::Invalid(ValidationFailure::Impassable);
    }
    if state.map.is_occupied(destination) {
        return ActionValidation::Invalid(ValidationFailure::Occupied);
    }

    let start = actor.position();
    let blocked = |pos: Vector2| pos != start && state.map.is_occupied(pos);
    let Some(path) = pathfinding::find_path(&state.map, start, destination, &blocked) else {
        return ActionValidation::Invalid(ValidationFailure::NoPath);
    };
    let cost = pathfinding::path_cost(&state.map, &path);
    if cost > actor.movement.movement_points {
        return ActionValidation::Invalid(ValidationFailure::InsufficientMovement {
            cost,
            available: actor.movement.movement_points,
        });
    }

    ActionValidation::Valid { cost }
}

fn validate_attack(
    state: &GameState,
    actor: &Unit,
    action: Action,
    target: &ActionTarget,
) -> ActionValidation {
    if action == Action::PowerAttack && !actor.actor.class.can_power_attack() {
        return ActionValidation::Invalid(ValidationFailure::ClassRestricted);
    }

    let target_id = match target {
        ActionTarget::Unit(id) => *id,
        ActionTarget::None => return ActionValidation::Invalid(ValidationFailure::NoTarget),
        ActionTarget::Position(_) => {
            return ActionValidation::Invalid(ValidationFailure::BadTargetKind)
        }
    };
    if target_id == actor.id {
        return ActionValidation::Invalid(ValidationFailure::SelfTarget);
    }
    let Some(defender) = state.unit(target_id) else {
        return ActionValidation::Invalid(ValidationFailure::TargetMissing);
    };
    if !defender.is_alive() {
        return ActionValidation::Invalid(ValidationFailure::TargetDead);
    }

    let distance = actor.position().manhattan_distance(defender.position());
    if !actor.combat.in_range(distance) {
        return ActionValidation::Invalid(ValidationFailure::OutOfRange {
            distance,
            range_min: actor.combat.range_min,
            range_max: actor.combat.range_max,
        });
    }

    if defender.team() == actor.team() {
        return ActionValidation::NeedsConfirmation { friendlies: vec![target_id] };
    }

    ActionValidation::Valid { cost: 0 }
}

/// Execute a validated action.
///
/// Calling this without a preceding successful validation is a
/// programming error and fails with an invariant violation. A
/// NeedsConfirmation validation counts as successful here; the confirm
/// gate lives upstream in the targeting flow.
pub fn execute(
    state: &mut GameState,
    bus: &mut EventBus,
    actor_id: EntityId,
    action: Action,
    target: &ActionTarget,
) -> Result<ActionOutcome> {
    match validate(state, actor_id, action, target) {
        ActionValidation::Invalid(failure) => {
            return Err(GrimError::InvariantViolation(format!(
                "{} executed without successful validation: {}",
                action.name(),
                failure
            )))
        }
        ActionValidation::Valid { .. } | ActionValidation::NeedsConfirmation { .. } => {}
    }

    match action {
        Action::Move => execute_move(state, bus, actor_id, target),
        Action::StandardAttack | Action::QuickStrike | Action::PowerAttack => {
            execute_attack(state, bus, actor_id, action, target)
        }
        Action::PrepareInterrupt => execute_prepare(state, bus, actor_id),
        Action::Wait => {
            let actor = state.expect_unit(actor_id)?;
            Ok(ActionOutcome {
                weight_spent: action.effective_weight(actor),
                ..ActionOutcome::default()
            })
        }
    }
}

fn execute_move(
    state: &mut GameState,
    bus: &mut EventBus,
    actor_id: EntityId,
    target: &ActionTarget,
) -> Result<ActionOutcome> {
    let destination = match target {
        ActionTarget::Position(pos) => *pos,
        _ => unreachable!("validated move target"),
    };

    let actor = state.expect_unit(actor_id)?;
    let from = actor.position();
    let blocked = |pos: Vector2| pos != from && state.map.is_occupied(pos);
    let path = pathfinding::find_path(&state.map, from, destination, &blocked)
        .ok_or_else(|| GrimError::InvariantViolation("validated path vanished".into()))?;
    let cost = pathfinding::path_cost(&state.map, &path);

    let actor = state.expect_unit_mut(actor_id)?;
    actor.movement.face_towards(destination);
    actor.movement.position = destination;
    actor.movement.movement_points = actor.movement.movement_points.saturating_sub(cost);
    actor.status.has_moved = true;
    state.map.move_occupant(from, destination, actor_id);
    state.battle.moved_this_activation = true;

    let event = state.event(EventPayload::UnitMoved {
        unit: actor_id,
        from,
        to: destination,
        path,
        cost,
    });
    bus.publish(event, state)?;

    Ok(ActionOutcome::default())
}

fn execute_attack(
    state: &mut GameState,
    bus: &mut EventBus,
    actor_id: EntityId,
    action: Action,
    target: &ActionTarget,
) -> Result<ActionOutcome> {
    let defender_id = match target {
        ActionTarget::Unit(id) => *id,
        _ => unreachable!("validated attack target"),
    };

    let report = resolver::resolve_attack(state, bus, actor_id, defender_id, action)?;

    let actor = state.expect_unit_mut(actor_id)?;
    actor.status.has_acted = true;
    let actor = state.expect_unit(actor_id)?;

    let mut outcome = ActionOutcome {
        weight_spent: action.effective_weight(actor),
        damage_done: report.damage,
        wounds_inflicted: report.wound.is_some() as u32,
        defeated: Vec::new(),
    };
    if report.defeated {
        outcome.defeated.push(defender_id);
    }
    if let Some(counter) = &report.countered {
        if counter.defeated {
            outcome.defeated.push(actor_id);
        }
        outcome.wounds_inflicted += counter.wound.is_some() as u32;
    }
    Ok(outcome)
}

fn execute_prepare(
    state: &mut GameState,
    bus: &mut EventBus,
    actor_id: EntityId,
) -> Result<ActionOutcome> {
    let actor = state.expect_unit_mut(actor_id)?;
    let watch_range = actor.combat.range_max;
    let prepared = PreparedAction {
        action: Action::StandardAttack,
        trigger: InterruptTrigger::EnemyMovesInRange { range: watch_range },
        priority: 0,
        uses_left: 1,
    };
    match &mut actor.interrupt {
        Some(interrupt) => interrupt.prepared = Some(prepared),
        None => {
            actor.interrupt = Some(InterruptComponent { prepared: Some(prepared) });
        }
    }
    actor.status.has_acted = true;

    let event = state.event(EventPayload::InterruptPrepared { unit: actor_id });
    bus.publish(event, state)?;

    let actor = state.expect_unit(actor_id)?;
    Ok(ActionOutcome {
        weight_spent: Action::PrepareInterrupt.effective_weight(actor),
        ..ActionOutcome::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Team;
    use crate::entity::unit::UnitClass;

    fn sandbox() -> (GameState, EventBus, EntityId, EntityId) {
        let mut state = GameState::for_tests(8, 8);
        let knight = state.spawn("Knight", UnitClass::Knight, Team::Player, Vector2::new(1, 1));
        let foe = state.spawn("Foe", UnitClass::Warrior, Team::Enemy, Vector2::new(2, 1));
        let bus = EventBus::new(state.config.event_recursion_limit);
        (state, bus, knight, foe)
    }

    #[test]
    fn test_weights_match_catalog() {
        assert_eq!(Action::StandardAttack.base_weight(), 100);
        assert_eq!(Action::QuickStrike.base_weight(), 60);
        assert_eq!(Action::PowerAttack.base_weight(), 180);
        assert_eq!(Action::PrepareInterrupt.base_weight(), 130);
        assert_eq!(Action::Wait.base_weight(), 50);
    }

    #[test]
    fn test_only_standard_attack_counters() {
        assert!(Action::StandardAttack.allows_counter());
        assert!(!Action::QuickStrike.allows_counter());
        assert!(!Action::PowerAttack.allows_counter());
    }

    #[test]
    fn test_validate_move_in_reach() {
        let (state, _, knight, _) = sandbox();
        let v = validate(&state, knight, Action::Move, &ActionTarget::Position(Vector2::new(1, 3)));
        assert_eq!(v, ActionValidation::Valid { cost: 2 });
    }

    #[test]
    fn test_validate_move_too_far() {
        let (state, _, knight, _) = sandbox();
        let v = validate(&state, knight, Action::Move, &ActionTarget::Position(Vector2::new(7, 7)));
        assert!(matches!(
            v,
            ActionValidation::Invalid(ValidationFailure::InsufficientMovement { .. })
        ));
    }

    #[test]
    fn test_validate_move_off_map() {
        let (state, _, knight, _) = sandbox();
        let v = validate(&state, knight, Action::Move, &ActionTarget::Position(Vector2::new(-1, 1)));
        assert_eq!(v, ActionValidation::Invalid(ValidationFailure::OutOfBounds));
    }

    #[test]
    fn test_validate_move_onto_unit() {
        let (state, _, knight, _) = sandbox();
        let v = validate(&state, knight, Action::Move, &ActionTarget::Position(Vector2::new(2, 1)));
        assert_eq!(v, ActionValidation::Invalid(ValidationFailure::Occupied));
    }

    #[test]
    fn test_validate_attack_in_range() {
        let (state, _, knight, foe) = sandbox();
        let v = validate(&state, knight, Action::StandardAttack, &ActionTarget::Unit(foe));
        assert!(v.is_valid());
    }

    #[test]
    fn test_validate_attack_out_of_range() {
        let (mut state, _, _, _) = sandbox();
        let archer = state.spawn("Archer", UnitClass::Archer, Team::Player, Vector2::new(5, 5));
        let adjacent = state.spawn("Close", UnitClass::Warrior, Team::Enemy, Vector2::new(5, 6));
        // Archers cannot fire point blank: range is [2, 3]
        let v = validate(&state, archer, Action::StandardAttack, &ActionTarget::Unit(adjacent));
        assert_eq!(
            v,
            ActionValidation::Invalid(ValidationFailure::OutOfRange {
                distance: 1,
                range_min: 2,
                range_max: 3,
            })
        );
    }

    #[test]
    fn test_validate_friendly_fire_needs_confirmation() {
        let (mut state, _, knight, _) = sandbox();
        let ally = state.spawn("Ally", UnitClass::Warrior, Team::Player, Vector2::new(1, 2));
        let v = validate(&state, knight, Action::StandardAttack, &ActionTarget::Unit(ally));
        assert_eq!(v, ActionValidation::NeedsConfirmation { friendlies: vec![ally] });
    }

    #[test]
    fn test_power_attack_class_gated() {
        let (mut state, _, _, foe) = sandbox();
        let mage = state.spawn("Mage", UnitClass::Mage, Team::Player, Vector2::new(2, 3));
        let v = validate(&state, mage, Action::PowerAttack, &ActionTarget::Unit(foe));
        assert_eq!(v, ActionValidation::Invalid(ValidationFailure::ClassRestricted));
    }

    #[test]
    fn test_execute_without_validation_is_fatal() {
        let (mut state, mut bus, knight, _) = sandbox();
        let err = execute(
            &mut state,
            &mut bus,
            knight,
            Action::Move,
            &ActionTarget::Position(Vector2::new(7, 7)),
        )
        .unwrap_err();
        assert!(matches!(err, GrimError::InvariantViolation(_)));
    }

    #[test]
    fn test_execute_move_updates_position_and_occupancy() {
        let (mut state, mut bus, knight, _) = sandbox();
        execute(
            &mut state,
            &mut bus,
            knight,
            Action::Move,
            &ActionTarget::Position(Vector2::new(1, 3)),
        )
        .unwrap();

        let unit = state.unit(knight).unwrap();
        assert_eq!(unit.position(), Vector2::new(1, 3));
        assert!(unit.status.has_moved);
        assert_eq!(unit.movement.movement_points, 1);
        assert_eq!(state.map.occupant(Vector2::new(1, 3)), Some(knight));
        assert!(!state.map.is_occupied(Vector2::new(1, 1)));
    }

    #[test]
    fn test_execute_prepare_stores_interrupt() {
        let (mut state, mut bus, knight, _) = sandbox();
        let outcome = execute(&mut state, &mut bus, knight, Action::PrepareInterrupt, &ActionTarget::None)
            .unwrap();
        assert_eq!(outcome.weight_spent, 130);

        let unit = state.unit(knight).unwrap();
        let prepared = unit.interrupt.as_ref().unwrap().prepared.as_ref().unwrap();
        assert_eq!(prepared.uses_left, 1);

        // Slot is single-occupancy
        let v = validate(&state, knight, Action::PrepareInterrupt, &ActionTarget::None);
        assert_eq!(v, ActionValidation::Invalid(ValidationFailure::AlreadyPrepared));
    }

    #[test]
    fn test_wounded_units_act_slower() {
        use crate::combat::wounds::{BodyPart, Wound, WoundSeverity};
        let (mut state, _, knight, _) = sandbox();
        let unit = state.unit_mut(knight).unwrap();
        unit.wound
            .as_mut()
            .unwrap()
            .add(Wound::new(WoundSeverity::Severe, BodyPart::LeftLeg));

        let unit = state.unit(knight).unwrap();
        assert!(Action::StandardAttack.effective_weight(unit) > 100);
    }
}
