//! Battle engine: the activation loop
//!
//! One `advance` call pops one timeline entry and carries it to
//! completion: hazards and scheduled events resolve immediately, AI
//! units act synchronously, and human units suspend the loop until
//! input arrives. Between activations the world is always consistent.

use crate::actions::{self, Action, ActionTarget, ActionValidation};
use crate::ai::{AiController, AiDecision, TacticalAi};
use crate::battle::combat_manager::{self, CombatManager};
use crate::battle::hazards;
use crate::battle::interrupts;
use crate::battle::log_manager::{LogEntry, LogLevel, LogManager};
use crate::battle::morale_manager::MoraleManager;
use crate::battle::objectives::ObjectiveManager;
use crate::battle::phase::PhaseManager;
use crate::battle::selection::SelectionManager;
use crate::battle::state::{BattlePhase, GamePhase, GameState};
use crate::battle::timeline_manager::TimelineManager;
use crate::combat::resolver;
use crate::core::error::{GrimError, Result};
use crate::core::types::{EntityId, Team, Weight};
use crate::events::bus::EventBus;
use crate::events::events::EventPayload;
use crate::input::InputEvent;
use crate::timeline::EntryKind;

/// What one `advance` call did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Engagement {
    /// A human-controlled unit's activation is open; feed inputs
    AwaitingInput(EntityId),
    /// An AI unit completed a full activation
    UnitActed(EntityId),
    HazardResolved(u32),
    EventResolved(u32),
    BattleOver,
}

/// Owns the state, the bus, and the manager wiring
pub struct Engine {
    pub state: GameState,
    pub bus: EventBus,
    ai: Box<dyn AiController>,
}

impl Engine {
    /// Wire the standard manager set onto a fresh bus.
    ///
    /// Priorities: the phase machine reacts first, then timeline
    /// hygiene, then the gameplay managers, with the log narrating
    /// last.
    pub fn new(state: GameState) -> Self {
        let mut bus = EventBus::new(state.config.event_recursion_limit);
        bus.subscribe(100, Box::new(PhaseManager));
        bus.subscribe(90, Box::new(TimelineManager));
        bus.subscribe(60, Box::new(SelectionManager));
        bus.subscribe(55, Box::new(CombatManager));
        bus.subscribe(50, Box::new(MoraleManager));
        bus.subscribe(40, Box::new(ObjectiveManager));
        bus.subscribe(-100, Box::new(LogManager));
        Self { state, bus, ai: Box::new(TacticalAi::new()) }
    }

    pub fn with_ai(mut self, ai: Box<dyn AiController>) -> Self {
        self.ai = ai;
        self
    }

    /// Announce the scenario; call once before the first advance.
    pub fn start(&mut self) -> Result<()> {
        let name = self.state.scenario_name.clone();
        let event = self.state.event(EventPayload::ScenarioLoaded { name });
        self.bus.publish(event, &mut self.state)
    }

    pub fn is_battle_over(&self) -> bool {
        self.state.phase == GamePhase::GameOver
    }

    /// Pop and resolve the next timeline entry.
    pub fn advance(&mut self) -> Result<Engagement> {
        if self.is_battle_over() {
            return Ok(Engagement::BattleOver);
        }
        // A suspended player activation stays suspended until input
        // completes it.
        if self.state.battle_phase() != BattlePhase::TimelineProcessing {
            if let Some(unit) = self.state.battle.acting_unit {
                return Ok(Engagement::AwaitingInput(unit));
            }
        }

        let entry = self
            .state
            .timeline
            .pop()
            .ok_or_else(|| GrimError::EmptyTimeline(self.state.now()))?;

        match entry.kind {
            EntryKind::Unit(unit_id) => self.begin_unit_activation(unit_id),
            EntryKind::Hazard(hazard_id) => {
                hazards::on_hazard_popped(&mut self.state, &mut self.bus, hazard_id)?;
                Ok(Engagement::HazardResolved(hazard_id))
            }
            EntryKind::Event(event_id) => {
                let event = self.state.event(EventPayload::LogMessage {
                    level: LogLevel::Debug,
                    category: "TIMELINE".into(),
                    text: format!("scheduled event {} ({})", event_id, entry.label),
                });
                self.bus.publish(event, &mut self.state)?;
                Ok(Engagement::EventResolved(event_id))
            }
        }
    }

    fn begin_unit_activation(&mut self, unit_id: EntityId) -> Result<Engagement> {
        let team = match self.state.unit(unit_id) {
            None => return Err(GrimError::EntityNotFound(unit_id)),
            Some(unit) if !unit.is_alive() => {
                return Err(GrimError::DeadUnitOnTimeline(unit_id))
            }
            Some(unit) => unit.team(),
        };

        {
            let unit = self.state.expect_unit_mut(unit_id)?;
            unit.status.begin_activation();
            unit.movement.movement_points = unit.movement.movement_base;
        }

        let event = self.state.event(EventPayload::TurnStarted { unit: unit_id, team });
        self.bus.publish(event, &mut self.state)?;
        if self.is_battle_over() {
            return Ok(Engagement::BattleOver);
        }

        let is_ai = self
            .state
            .unit(unit_id)
            .map(|u| u.ai.is_some() || u.team() != Team::Player)
            .unwrap_or(false);
        if is_ai {
            self.run_ai_activation(unit_id)?;
            Ok(Engagement::UnitActed(unit_id))
        } else {
            Ok(Engagement::AwaitingInput(unit_id))
        }
    }

    // --- AI flow ---

    fn run_ai_activation(&mut self, unit_id: EntityId) -> Result<()> {
        let decision = self.ai.decide(&self.state, unit_id);
        log::debug!("ai decision for {:?}: {:?}", unit_id, decision);

        if let Some(destination) = decision.move_to {
            let target = ActionTarget::Position(destination);
            if actions::validate(&self.state, unit_id, Action::Move, &target).is_valid() {
                actions::execute(&mut self.state, &mut self.bus, unit_id, Action::Move, &target)?;
                self.fire_move_interrupts(unit_id)?;
            }
        }

        // An interrupt may have killed the actor mid-approach
        let still_up = self.state.unit(unit_id).map(|u| u.is_alive()).unwrap_or(false);
        if !still_up || self.is_battle_over() {
            return self.finish_activation(unit_id, 0);
        }

        let AiDecision { action, target, .. } = decision;
        let (action, target) =
            match actions::validate(&self.state, unit_id, action, &target) {
                ActionValidation::Valid { .. } => (action, target),
                // The controller must produce validating decisions;
                // fall back to Wait rather than corrupt the timeline
                _ => (Action::Wait, ActionTarget::None),
            };

        let event = self.state.event(EventPayload::ActionSelected { unit: unit_id, action });
        self.bus.publish(event, &mut self.state)?;
        self.execute_and_finish(unit_id, action, target)
    }

    // --- input flow ---

    /// Feed one abstract input event into the current phase.
    pub fn handle_input(&mut self, input: InputEvent) -> Result<()> {
        if self.is_battle_over() {
            return Ok(());
        }
        match input {
            InputEvent::Quit => {
                self.state.phase = GamePhase::GameOver;
                return Ok(());
            }
            InputEvent::ToggleInspect => {
                let event = self.state.event(EventPayload::InspectToggled);
                return self.bus.publish(event, &mut self.state);
            }
            _ => {}
        }

        match self.state.battle_phase() {
            BattlePhase::UnitSelection => self.input_unit_selection(input),
            BattlePhase::UnitMoving => self.input_unit_moving(input),
            BattlePhase::ActionSelection => self.input_action_selection(input),
            BattlePhase::ActionTargeting => self.input_action_targeting(input),
            BattlePhase::Inspect => {
                if let InputEvent::MoveCursor { dx, dy } = input {
                    let (w, h) = (self.state.map.width, self.state.map.height);
                    self.state.cursor.shift_clamped(dx, dy, w, h);
                }
                Ok(())
            }
            BattlePhase::TimelineProcessing | BattlePhase::ActionExecuting => Ok(()),
        }
    }

    fn input_unit_selection(&mut self, input: InputEvent) -> Result<()> {
        if input == InputEvent::Confirm {
            if let Some(unit) = self.state.battle.acting_unit {
                let event = self.state.event(EventPayload::UnitSelected { unit });
                return self.bus.publish(event, &mut self.state);
            }
        }
        Ok(())
    }

    fn input_unit_moving(&mut self, input: InputEvent) -> Result<()> {
        match input {
            InputEvent::MoveCursor { dx, dy } => {
                // Cursor is clamped to the reachable set plus the
                // actor's own tile
                let next = crate::core::types::Vector2::new(
                    self.state.cursor.position.x + dx,
                    self.state.cursor.position.y + dy,
                );
                let own = self
                    .state
                    .battle
                    .acting_unit
                    .and_then(|id| self.state.unit(id))
                    .map(|u| u.position());
                if Some(next) == own || self.state.battle.movement_range.contains(&next) {
                    self.state.cursor.position = next;
                }
                Ok(())
            }
            InputEvent::Confirm => self.confirm_move(),
            InputEvent::QuickWait | InputEvent::EndTurn => self.choose_action(Action::Wait),
            InputEvent::QuickAttack => self.choose_action(Action::QuickStrike),
            _ => Ok(()),
        }
    }

    fn input_action_selection(&mut self, input: InputEvent) -> Result<()> {
        match input {
            InputEvent::MoveCursor { dx, dy } => {
                let direction = if dy != 0 { dy.signum() } else { dx.signum() };
                self.state.ui.move_selection(direction);
                Ok(())
            }
            InputEvent::Confirm => match self.state.ui.selected_action() {
                Some(action) => self.choose_action(action),
                None => Ok(()),
            },
            InputEvent::QuickWait | InputEvent::EndTurn => self.choose_action(Action::Wait),
            InputEvent::QuickAttack => self.choose_action(Action::QuickStrike),
            InputEvent::Cancel => self.publish_cancel(),
            _ => Ok(()),
        }
    }

    fn input_action_targeting(&mut self, input: InputEvent) -> Result<()> {
        match input {
            InputEvent::MoveCursor { dx, dy } => {
                let direction = if dy != 0 { dy.signum() } else { dx.signum() };
                self.state.battle.cycle_target(direction);
                let target_position = self
                    .state
                    .battle
                    .current_target()
                    .and_then(|target| self.state.unit(target))
                    .map(|unit| unit.position());
                if let Some(position) = target_position {
                    self.state.cursor.position = position;
                }
                combat_manager::refresh_forecast(&mut self.state);
                Ok(())
            }
            InputEvent::Confirm => self.confirm_target(),
            InputEvent::Cancel => self.publish_cancel(),
            _ => Ok(()),
        }
    }

    fn publish_cancel(&mut self) -> Result<()> {
        if let Some(unit) = self.state.battle.acting_unit {
            let event = self.state.event(EventPayload::ActionCancelled { unit });
            self.bus.publish(event, &mut self.state)?;
        }
        Ok(())
    }

    /// Confirm in UnitMoving: move to the cursor, or stand fast.
    fn confirm_move(&mut self) -> Result<()> {
        let Some(unit_id) = self.state.battle.acting_unit else {
            return Ok(());
        };
        let destination = self.state.cursor.position;
        let standing = self
            .state
            .unit(unit_id)
            .map(|u| u.position() == destination)
            .unwrap_or(true);

        if !standing {
            let target = ActionTarget::Position(destination);
            match actions::validate(&self.state, unit_id, Action::Move, &target) {
                ActionValidation::Valid { .. } => {
                    actions::execute(&mut self.state, &mut self.bus, unit_id, Action::Move, &target)?;
                    self.fire_move_interrupts(unit_id)?;
                    let alive = self.state.unit(unit_id).map(|u| u.is_alive()).unwrap_or(false);
                    if !alive {
                        return self.finish_activation(unit_id, 0);
                    }
                }
                ActionValidation::Invalid(failure) => {
                    // Recovered locally: surface the reason, await input
                    self.state.log.push(LogEntry {
                        tick: self.state.now(),
                        level: LogLevel::Warning,
                        category: "ACTION".into(),
                        text: failure.to_string(),
                    });
                    return Ok(());
                }
                ActionValidation::NeedsConfirmation { .. } => {}
            }
        }

        let event = self.state.event(EventPayload::MovementCompleted { unit: unit_id });
        self.bus.publish(event, &mut self.state)
    }

    /// Select an action from the menu or a shortcut.
    fn choose_action(&mut self, action: Action) -> Result<()> {
        let Some(unit_id) = self.state.battle.acting_unit else {
            return Ok(());
        };
        let event = self.state.event(EventPayload::ActionSelected { unit: unit_id, action });
        self.bus.publish(event, &mut self.state)?;

        if !action.needs_target() {
            // Wait and Prepare skip targeting entirely
            return self.execute_and_finish(unit_id, action, ActionTarget::None);
        }
        Ok(())
    }

    /// Confirm in ActionTargeting, honoring the friendly-fire gate.
    fn confirm_target(&mut self) -> Result<()> {
        let Some(unit_id) = self.state.battle.acting_unit else {
            return Ok(());
        };
        let Some(action) = self.state.battle.pending_action else {
            return Ok(());
        };
        let Some(target_id) = self.state.battle.current_target() else {
            self.state.log.push(LogEntry {
                tick: self.state.now(),
                level: LogLevel::Warning,
                category: "ACTION".into(),
                text: "no target in reach".into(),
            });
            return Ok(());
        };
        let target = ActionTarget::Unit(target_id);

        match actions::validate(&self.state, unit_id, action, &target) {
            ActionValidation::Valid { .. } => {
                let event = self.state.event(EventPayload::TargetConfirmed { unit: unit_id });
                self.bus.publish(event, &mut self.state)?;
                self.execute_and_finish(unit_id, action, target)
            }
            ActionValidation::NeedsConfirmation { .. } => {
                if self.state.battle.awaiting_friendly_confirm {
                    self.state.battle.awaiting_friendly_confirm = false;
                    let event = self.state.event(EventPayload::TargetConfirmed { unit: unit_id });
                    self.bus.publish(event, &mut self.state)?;
                    self.execute_and_finish(unit_id, action, target)
                } else {
                    self.state.battle.awaiting_friendly_confirm = true;
                    self.state.log.push(LogEntry {
                        tick: self.state.now(),
                        level: LogLevel::Warning,
                        category: "ACTION".into(),
                        text: "friendly fire: confirm again to strike an ally".into(),
                    });
                    Ok(())
                }
            }
            ActionValidation::Invalid(failure) => {
                // No mutation, no events; just tell the player why
                self.state.log.push(LogEntry {
                    tick: self.state.now(),
                    level: LogLevel::Warning,
                    category: "ACTION".into(),
                    text: failure.to_string(),
                });
                Ok(())
            }
        }
    }

    // --- shared resolution ---

    fn execute_and_finish(
        &mut self,
        unit_id: EntityId,
        action: Action,
        target: ActionTarget,
    ) -> Result<()> {
        if action.is_attack() {
            if let ActionTarget::Unit(defender) = target {
                self.fire_incoming_attack_interrupt(defender, unit_id)?;
            }
        }

        let outcome = actions::execute(&mut self.state, &mut self.bus, unit_id, action, &target)?;

        let event = self.state.event(EventPayload::ActionExecuted {
            unit: unit_id,
            action,
            success: true,
        });
        self.bus.publish(event, &mut self.state)?;

        self.finish_activation(unit_id, outcome.weight_spent)
    }

    /// Close the activation: reschedule the survivor, flush deferred
    /// work, and announce the turn's end.
    fn finish_activation(&mut self, unit_id: EntityId, weight: Weight) -> Result<()> {
        let alive = self.state.unit(unit_id).map(|u| u.is_alive()).unwrap_or(false);
        if alive {
            self.state.reschedule_actor(unit_id, weight, "Ready")?;
            self.state.expect_unit_mut(unit_id)?.status.end_activation();
        }

        self.bus.drain(&mut self.state)?;
        let event = self.state.event(EventPayload::TurnEnded { unit: unit_id, weight_spent: weight });
        self.bus.publish(event, &mut self.state)
    }

    /// Fire prepared strikes watching the mover's destination.
    fn fire_move_interrupts(&mut self, mover: EntityId) -> Result<()> {
        let watchers = interrupts::watchers_for_move(&self.state, mover);
        for owner in watchers {
            let mover_alive = self.state.unit(mover).map(|u| u.is_alive()).unwrap_or(false);
            if !mover_alive || self.is_battle_over() {
                break;
            }
            let Some(prepared) = interrupts::consume_prepared(&mut self.state, owner) else {
                continue;
            };
            let event = self
                .state
                .event(EventPayload::InterruptTriggered { unit: owner, against: mover });
            self.bus.publish(event, &mut self.state)?;

            if prepared.action.is_attack() {
                let target = ActionTarget::Unit(mover);
                if actions::validate(&self.state, owner, prepared.action, &target).is_valid() {
                    resolver::resolve_attack(
                        &mut self.state,
                        &mut self.bus,
                        owner,
                        mover,
                        prepared.action,
                    )?;
                }
            }
        }
        Ok(())
    }

    /// A braced defender's interrupt fires before the blow lands.
    fn fire_incoming_attack_interrupt(
        &mut self,
        defender: EntityId,
        attacker: EntityId,
    ) -> Result<()> {
        if !interrupts::braced_for_attack(&self.state, defender) {
            return Ok(());
        }
        let Some(prepared) = interrupts::consume_prepared(&mut self.state, defender) else {
            return Ok(());
        };
        let event = self
            .state
            .event(EventPayload::InterruptTriggered { unit: defender, against: attacker });
        self.bus.publish(event, &mut self.state)?;

        if prepared.action.is_attack() {
            let target = ActionTarget::Unit(attacker);
            if actions::validate(&self.state, defender, prepared.action, &target).is_valid() {
                resolver::resolve_attack(
                    &mut self.state,
                    &mut self.bus,
                    defender,
                    attacker,
                    prepared.action,
                )?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Vector2;
    use crate::entity::components::AiComponent;
    use crate::entity::unit::UnitClass;

    fn duel_engine() -> (Engine, EntityId, EntityId) {
        let mut state = GameState::for_tests(8, 8);
        let player = state.spawn("Hero", UnitClass::Knight, Team::Player, Vector2::new(1, 1));
        let foe = state.spawn("Foe", UnitClass::Warrior, Team::Enemy, Vector2::new(6, 6));
        state.unit_mut(foe).unwrap().ai =
            Some(AiComponent::new(crate::ai::AiPersonality::Aggressive));
        state.timeline.schedule(EntryKind::Unit(player), 0, "Ready");
        state.timeline.schedule(EntryKind::Unit(foe), 5, "Ready");
        let mut engine = Engine::new(state);
        engine.start().unwrap();
        (engine, player, foe)
    }

    #[test]
    fn test_player_activation_awaits_input() {
        let (mut engine, player, _) = duel_engine();
        let engagement = engine.advance().unwrap();
        assert_eq!(engagement, Engagement::AwaitingInput(player));
        assert_eq!(engine.state.battle_phase(), BattlePhase::UnitSelection);

        // Advancing again does not pop; the activation is suspended
        assert_eq!(engine.advance().unwrap(), Engagement::AwaitingInput(player));
    }

    #[test]
    fn test_full_player_turn_via_inputs() {
        let (mut engine, player, _) = duel_engine();
        engine.advance().unwrap();

        engine.handle_input(InputEvent::Confirm).unwrap(); // select
        assert_eq!(engine.state.battle_phase(), BattlePhase::UnitMoving);

        engine.handle_input(InputEvent::Confirm).unwrap(); // stand fast
        assert_eq!(engine.state.battle_phase(), BattlePhase::ActionSelection);

        engine.handle_input(InputEvent::QuickWait).unwrap(); // wait out
        assert_eq!(engine.state.battle_phase(), BattlePhase::TimelineProcessing);

        // Rescheduled at now + speed + wait weight
        let next = engine.state.timeline.preview(5);
        let own = next
            .iter()
            .find(|e| e.entity_id() == Some(player))
            .expect("player rescheduled");
        assert_eq!(own.ready_tick, 0 + 10 + 50);
    }

    #[test]
    fn test_ai_activation_runs_to_completion() {
        let (mut engine, player, foe) = duel_engine();
        engine.advance().unwrap();
        engine.handle_input(InputEvent::Confirm).unwrap();
        engine.handle_input(InputEvent::Confirm).unwrap();
        engine.handle_input(InputEvent::QuickWait).unwrap();

        let engagement = engine.advance().unwrap();
        assert_eq!(engagement, Engagement::UnitActed(foe));
        // The aggressive warrior closed distance toward the hero
        let hero_pos = engine.state.unit(player).unwrap().position();
        let foe_pos = engine.state.unit(foe).unwrap().position();
        assert!(foe_pos.manhattan_distance(hero_pos) < Vector2::new(6, 6).manhattan_distance(hero_pos));
    }

    #[test]
    fn test_empty_timeline_is_fatal_mid_battle() {
        let state = GameState::for_tests(4, 4);
        let mut engine = Engine::new(state);
        let err = engine.advance().unwrap_err();
        assert!(matches!(err, GrimError::EmptyTimeline(_)));
    }

    #[test]
    fn test_dead_unit_on_timeline_is_fatal() {
        let mut state = GameState::for_tests(4, 4);
        let unit = state.spawn("U", UnitClass::Warrior, Team::Player, Vector2::new(1, 1));
        state.timeline.schedule(EntryKind::Unit(unit), 0, "Ready");
        state.unit_mut(unit).unwrap().health.hp_current = 0;

        let mut engine = Engine::new(state);
        let err = engine.advance().unwrap_err();
        assert!(matches!(err, GrimError::DeadUnitOnTimeline(_)));
    }

    #[test]
    fn test_invalid_confirm_mutates_nothing() {
        let (mut engine, _, _) = duel_engine();
        engine.advance().unwrap();
        engine.handle_input(InputEvent::Confirm).unwrap();

        let history_before = engine.bus.history().len();
        let json_before = engine.state.to_json().unwrap();

        // Cursor cannot leave the reachable set; aiming at a wall of
        // nothing and confirming moves no one
        engine.handle_input(InputEvent::MoveCursor { dx: 7, dy: 7 }).unwrap();
        let json_after = engine.state.to_json().unwrap();
        assert_eq!(json_before, json_after);
        assert_eq!(engine.bus.history().len(), history_before);
    }

    #[test]
    fn test_quit_ends_battle() {
        let (mut engine, _, _) = duel_engine();
        engine.advance().unwrap();
        engine.handle_input(InputEvent::Quit).unwrap();
        assert!(engine.is_battle_over());
        assert_eq!(engine.advance().unwrap(), Engagement::BattleOver);
    }

    #[test]
    fn test_hazard_entries_resolve() {
        let mut state = GameState::for_tests(8, 8);
        state.spawn("P", UnitClass::Knight, Team::Player, Vector2::new(0, 0));
        state.hazards.push(crate::battle::hazards::Hazard {
            id: 9,
            name: "Fire".into(),
            position: Vector2::new(3, 3),
            potency: 2,
            period: 100,
            charges: 1,
        });
        state.timeline.schedule(EntryKind::Hazard(9), 10, "Fire");

        let mut engine = Engine::new(state);
        assert_eq!(engine.advance().unwrap(), Engagement::HazardResolved(9));
    }
}
