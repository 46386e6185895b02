//! Tactical AI controller
//!
//! Scores every attack it could legally make, weighted by the unit's
//! personality, and approaches the nearest enemy when nothing is in
//! reach. Candidate enumeration and tie-breaking are deterministic.

use crate::actions::{self, Action, ActionTarget};
use crate::ai::personality::{AiPersonality, PersonalityConfig, ScoringWeights};
use crate::ai::{AiController, AiDecision};
use crate::battle::selection;
use crate::battle::state::GameState;
use crate::combat::calculator;
use crate::core::types::{EntityId, Vector2};
use crate::entity::unit::Unit;

/// The default scripted controller
pub struct TacticalAi {
    config: PersonalityConfig,
}

impl TacticalAi {
    pub fn new() -> Self {
        Self { config: PersonalityConfig::default() }
    }

    pub fn with_config(config: PersonalityConfig) -> Self {
        Self { config }
    }

    fn weights_for(&self, unit: &Unit) -> ScoringWeights {
        let personality = unit
            .ai
            .as_ref()
            .map(|ai| ai.personality)
            .unwrap_or(AiPersonality::Balanced);
        self.config.weights(personality)
    }

    /// Score one validated attack candidate
    fn score(
        &self,
        state: &GameState,
        weights: &ScoringWeights,
        actor: &Unit,
        action: Action,
        target: EntityId,
    ) -> Option<i64> {
        let forecast = calculator::forecast(state, actor.id, target, action)?;
        let expected = (forecast.damage_min + forecast.damage_max) as i64 / 2;

        let mut score = expected * weights.damage;
        if forecast.will_kill {
            score += weights.kill_bonus;
        }
        if let Some(counter) = &forecast.counter {
            let counter_expected = (counter.damage_min + counter.damage_max) as i64 / 2;
            score -= counter_expected * weights.exposure;
            if counter.will_kill {
                // Walking into a guaranteed death is never the plan
                score -= weights.exposure * 100;
            }
        }
        score -= action.effective_weight(actor) as i64 * weights.tempo / 100;
        Some(score)
    }

    /// Best attack available from the unit's current position
    fn best_attack(&self, state: &GameState, actor: &Unit) -> Option<(i64, Action, EntityId)> {
        let weights = self.weights_for(actor);
        let mut attacks = vec![Action::QuickStrike, Action::StandardAttack];
        if actor.actor.class.can_power_attack() {
            attacks.push(Action::PowerAttack);
        }

        let mut best: Option<(i64, Action, EntityId)> = None;
        // Unit vector order keeps enumeration deterministic
        for enemy in state.alive_units().filter(|u| u.team() != actor.team()) {
            for &action in &attacks {
                let target = ActionTarget::Unit(enemy.id);
                if !actions::validate(state, actor.id, action, &target).is_valid() {
                    continue;
                }
                let Some(score) = self.score(state, &weights, actor, action, enemy.id) else {
                    continue;
                };
                let better = match &best {
                    None => true,
                    Some((best_score, _, best_target)) => {
                        score > *best_score || (score == *best_score && enemy.id < *best_target)
                    }
                };
                if better {
                    best = Some((score, action, enemy.id));
                }
            }
        }
        best
    }

    /// Reachable tile closest to the nearest living enemy
    fn approach_step(&self, state: &GameState, actor: &Unit) -> Option<Vector2> {
        let nearest = state
            .alive_units()
            .filter(|u| u.team() != actor.team())
            .min_by_key(|u| (actor.position().manhattan_distance(u.position()), u.id))?;
        let goal = nearest.position();

        selection::movement_range(state, actor.id)
            .into_iter()
            .min_by_key(|tile| (tile.manhattan_distance(goal), *tile))
            .filter(|tile| {
                tile.manhattan_distance(goal) < actor.position().manhattan_distance(goal)
            })
    }
}

impl Default for TacticalAi {
    fn default() -> Self {
        Self::new()
    }
}

impl AiController for TacticalAi {
    fn decide(&self, state: &GameState, unit_id: EntityId) -> AiDecision {
        let Some(actor) = state.unit(unit_id) else {
            return AiDecision::wait();
        };

        // Strike from where we stand when something is in reach
        if let Some((_, action, target)) = self.best_attack(state, actor) {
            return AiDecision { move_to: None, action, target: ActionTarget::Unit(target) };
        }

        // Otherwise close the distance, then look for a strike again.
        // The post-move attack is re-validated by the engine against
        // the position actually reached.
        if let Some(step) = self.approach_step(state, actor) {
            let mut probe = state.clone();
            if let Some(unit) = probe.unit_mut(unit_id) {
                let from = unit.movement.position;
                unit.movement.position = step;
                probe.map.move_occupant(from, step, unit_id);
            }
            let follow_up = probe
                .unit(unit_id)
                .and_then(|moved| self.best_attack(&probe, moved));
            return match follow_up {
                Some((_, action, target)) => AiDecision {
                    move_to: Some(step),
                    action,
                    target: ActionTarget::Unit(target),
                },
                None => AiDecision { move_to: Some(step), action: Action::Wait, target: ActionTarget::None },
            };
        }

        AiDecision::wait()
    }
}
