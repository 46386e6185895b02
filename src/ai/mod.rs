//! AI decision layer
//!
//! Controllers are handed read-only state on their unit's turn and
//! must return a decision whose action validates. They go through the
//! same validation and forecasting paths as the player; there is no
//! separate AI combat logic and no hidden information.

pub mod controller;
pub mod personality;

pub use controller::TacticalAi;
pub use personality::{AiPersonality, ScoringWeights};

use crate::actions::{Action, ActionTarget};
use crate::battle::state::GameState;
use crate::core::types::{EntityId, Vector2};

/// A complete activation plan: an optional approach move, then a
/// terminating action.
#[derive(Debug, Clone, PartialEq)]
pub struct AiDecision {
    pub move_to: Option<Vector2>,
    pub action: Action,
    pub target: ActionTarget,
}

impl AiDecision {
    pub fn wait() -> Self {
        Self { move_to: None, action: Action::Wait, target: ActionTarget::None }
    }
}

/// Synchronous decision producer
pub trait AiController {
    fn decide(&self, state: &GameState, unit: EntityId) -> AiDecision;
}
