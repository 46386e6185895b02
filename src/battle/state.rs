//! Game state: the single aggregate all managers mutate
//!
//! Managers hold no references to each other or into this structure;
//! they receive a mutable borrow for the duration of one event handler
//! and communicate only through the bus.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::actions::{Action, ActionTarget};
use crate::battle::hazards::Hazard;
use crate::battle::log_manager::LogRing;
use crate::battle::objectives::ObjectiveSet;
use crate::combat::calculator::Forecast;
use crate::core::config::SimulationConfig;
use crate::core::error::{GrimError, Result};
use crate::core::types::{EntityId, Team, Tick, Vector2};
use crate::entity::unit::{Unit, UnitClass};
use crate::events::events::{EventPayload, GameEvent};
use crate::map::GameMap;
use crate::timeline::Timeline;

/// High level game phases
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GamePhase {
    MainMenu,
    #[default]
    Battle,
    GameOver,
}

/// Phases within a timeline-based battle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BattlePhase {
    #[default]
    TimelineProcessing, // Popping the timeline, deciding who acts
    UnitSelection,      // Player confirms the acting unit
    UnitMoving,         // Acting unit roams the battlefield
    ActionSelection,    // Acting unit picks an action
    ActionTargeting,    // Picking a target for the chosen action
    ActionExecuting,    // Action resolves
    Inspect,            // Free cursor, battle paused
}

/// Cursor position; the camera is derived from it at render time
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CursorState {
    pub position: Vector2,
}

impl CursorState {
    /// Move within map bounds
    pub fn shift_clamped(&mut self, dx: i32, dy: i32, width: u32, height: u32) {
        self.position.x = (self.position.x + dx).clamp(0, width as i32 - 1);
        self.position.y = (self.position.y + dy).clamp(0, height as i32 - 1);
    }
}

/// Action menu state
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UiState {
    pub action_menu: Vec<Action>,
    pub menu_selection: usize,
    pub menu_open: bool,
}

impl UiState {
    pub fn open_action_menu(&mut self, actions: Vec<Action>) {
        self.action_menu = actions;
        self.menu_selection = 0;
        self.menu_open = true;
    }

    pub fn close_action_menu(&mut self) {
        self.action_menu.clear();
        self.menu_selection = 0;
        self.menu_open = false;
    }

    pub fn selected_action(&self) -> Option<Action> {
        if self.menu_open {
            self.action_menu.get(self.menu_selection).copied()
        } else {
            None
        }
    }

    pub fn move_selection(&mut self, direction: i32) {
        if self.menu_open && !self.action_menu.is_empty() {
            let len = self.action_menu.len() as i32;
            let next = (self.menu_selection as i32 + direction).rem_euclid(len);
            self.menu_selection = next as usize;
        }
    }
}

/// Selection and targeting state for the current activation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BattleState {
    pub acting_unit: Option<EntityId>,
    /// Snapshot taken at activation start, used for movement cancel
    pub pre_move_position: Option<Vector2>,
    pub pre_move_points: u32,
    pub moved_this_activation: bool,
    pub movement_range: Vec<Vector2>,
    pub attack_range: Vec<Vector2>,
    pub pending_action: Option<Action>,
    pub pending_target: Option<ActionTarget>,
    pub targetable: Vec<EntityId>,
    pub target_index: usize,
    /// Friendly fire requires a second affirmative confirm
    pub awaiting_friendly_confirm: bool,
}

impl BattleState {
    pub fn reset_selection(&mut self) {
        *self = BattleState::default();
    }

    pub fn current_target(&self) -> Option<EntityId> {
        self.targetable.get(self.target_index).copied()
    }

    pub fn cycle_target(&mut self, direction: i32) {
        if !self.targetable.is_empty() {
            let len = self.targetable.len() as i32;
            let next = (self.target_index as i32 + direction).rem_euclid(len);
            self.target_index = next as usize;
            // A new target invalidates any pending friendly-fire prompt
            self.awaiting_friendly_confirm = false;
        }
    }
}

/// Root state container
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameState {
    pub config: SimulationConfig,
    /// Session seed feeding every derived RNG stream
    pub seed: u64,
    pub scenario_name: String,
    pub map: GameMap,
    units: Vec<Unit>,
    /// Derived id lookup, rebuilt after deserialization
    #[serde(skip)]
    index: AHashMap<EntityId, usize>,
    next_entity: u64,
    pub timeline: Timeline,
    pub phase: GamePhase,
    battle_phase: BattlePhase,
    previous_phase: Option<BattlePhase>,
    pub battle: BattleState,
    pub cursor: CursorState,
    pub ui: UiState,
    pub objectives: ObjectiveSet,
    pub hazards: Vec<Hazard>,
    pub log: LogRing,
    pub forecast: Option<Forecast>,
    /// Monotonic counter identifying each damage resolution for RNG
    /// stream derivation
    rng_cursor: u64,
}

impl GameState {
    pub fn new(map: GameMap, config: SimulationConfig, seed: u64, scenario_name: String) -> Self {
        let log_capacity = config.log_capacity;
        Self {
            config,
            seed,
            scenario_name,
            map,
            units: Vec::new(),
            index: AHashMap::new(),
            next_entity: 1,
            timeline: Timeline::new(),
            phase: GamePhase::Battle,
            battle_phase: BattlePhase::TimelineProcessing,
            previous_phase: None,
            battle: BattleState::default(),
            cursor: CursorState::default(),
            ui: UiState::default(),
            objectives: ObjectiveSet::default(),
            hazards: Vec::new(),
            log: LogRing::new(log_capacity),
            forecast: None,
            rng_cursor: 0,
        }
    }

    /// Open-terrain sandbox state used across the test suites
    pub fn for_tests(width: u32, height: u32) -> Self {
        Self::new(
            GameMap::open(width, height),
            SimulationConfig::default(),
            7,
            "sandbox".into(),
        )
    }

    // --- units ---

    /// Create a unit from its class template and place it
    pub fn spawn(
        &mut self,
        name: impl Into<String>,
        class: UnitClass,
        team: Team,
        position: Vector2,
    ) -> EntityId {
        let id = EntityId(self.next_entity);
        self.next_entity += 1;
        let unit = Unit::from_class(id, name, class, team, position);
        self.map.place_unit(position, id);
        self.index.insert(id, self.units.len());
        self.units.push(unit);
        id
    }

    pub fn unit(&self, id: EntityId) -> Option<&Unit> {
        self.index.get(&id).and_then(|&i| self.units.get(i))
    }

    pub fn unit_mut(&mut self, id: EntityId) -> Option<&mut Unit> {
        match self.index.get(&id) {
            Some(&i) => self.units.get_mut(i),
            None => None,
        }
    }

    pub fn expect_unit(&self, id: EntityId) -> Result<&Unit> {
        self.unit(id).ok_or(GrimError::EntityNotFound(id))
    }

    pub fn expect_unit_mut(&mut self, id: EntityId) -> Result<&mut Unit> {
        match self.index.get(&id) {
            Some(&i) => self.units.get_mut(i).ok_or(GrimError::EntityNotFound(id)),
            None => Err(GrimError::EntityNotFound(id)),
        }
    }

    /// All units in spawn order, corpses included
    pub fn units(&self) -> &[Unit] {
        &self.units
    }

    pub fn alive_units(&self) -> impl Iterator<Item = &Unit> {
        self.units.iter().filter(|u| u.is_alive())
    }

    pub fn unit_at(&self, position: Vector2) -> Option<&Unit> {
        self.map.occupant(position).and_then(|id| self.unit(id))
    }

    pub fn unit_by_name(&self, name: &str) -> Option<&Unit> {
        self.units.iter().find(|u| u.name() == name)
    }

    pub fn count_alive(&self, team: Team) -> usize {
        self.alive_units().filter(|u| u.team() == team).count()
    }

    /// Schedule a unit's next activation from inside the aggregate.
    ///
    /// Field-level access keeps the unit borrow and the timeline
    /// mutation disjoint.
    pub fn reschedule_actor(
        &mut self,
        id: EntityId,
        weight: crate::core::types::Weight,
        label: impl Into<String>,
    ) -> Result<u64> {
        let index = *self.index.get(&id).ok_or(GrimError::EntityNotFound(id))?;
        let unit = self.units.get(index).ok_or(GrimError::EntityNotFound(id))?;
        Ok(self.timeline.schedule_unit(unit, weight, label))
    }

    // --- time & events ---

    pub fn now(&self) -> Tick {
        self.timeline.now()
    }

    /// Stamp a payload with the current tick
    pub fn event(&self, payload: EventPayload) -> GameEvent {
        GameEvent::new(self.now(), payload)
    }

    /// Next damage-resolution identity for RNG stream derivation
    pub fn next_roll(&mut self) -> u64 {
        let roll = self.rng_cursor;
        self.rng_cursor += 1;
        roll
    }

    // --- battle phase (mutated only by the phase state machine) ---

    pub fn battle_phase(&self) -> BattlePhase {
        self.battle_phase
    }

    pub(crate) fn set_battle_phase(&mut self, phase: BattlePhase) {
        self.battle_phase = phase;
    }

    pub(crate) fn enter_inspect(&mut self) {
        if self.battle_phase != BattlePhase::Inspect {
            self.previous_phase = Some(self.battle_phase);
            self.battle_phase = BattlePhase::Inspect;
        }
    }

    pub(crate) fn exit_inspect(&mut self) {
        if self.battle_phase == BattlePhase::Inspect {
            self.battle_phase = self.previous_phase.take().unwrap_or_default();
        }
    }

    // --- hazards ---

    pub fn hazard(&self, id: u32) -> Option<&Hazard> {
        self.hazards.iter().find(|h| h.id == id)
    }

    pub fn hazard_mut(&mut self, id: u32) -> Option<&mut Hazard> {
        self.hazards.iter_mut().find(|h| h.id == id)
    }

    // --- persistence ---

    /// Rebuild derived indexes from authoritative fields
    pub fn reindex(&mut self) {
        self.index.clear();
        for (i, unit) in self.units.iter().enumerate() {
            self.index.insert(unit.id, i);
        }
        let positions: Vec<(EntityId, Vector2)> = self
            .units
            .iter()
            .filter(|u| u.is_alive())
            .map(|u| (u.id, u.position()))
            .collect();
        self.map.reindex(positions.into_iter());
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let mut state: GameState = serde_json::from_str(text)?;
        state.reindex();
        Ok(state)
    }
}
