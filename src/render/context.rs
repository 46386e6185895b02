//! Pull-mode render context
//!
//! Each frame the host calls `build_render_context` and gets a
//! self-contained snapshot. The builder never mutates state, and
//! renderers never subscribe to events; glyphs, colors, and layout are
//! entirely theirs.

use serde::{Deserialize, Serialize};

use crate::actions::available_actions;
use crate::battle::state::{BattlePhase, GameState};
use crate::combat::morale::{self, MoraleState};
use crate::core::types::{EntityId, Team};
use crate::timeline::EntryKind;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraView {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

/// Bit flags folded onto a tile: movement range, attack range
pub const TILE_FLAG_MOVE: u8 = 1;
pub const TILE_FLAG_ATTACK: u8 = 2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileView {
    pub x: i32,
    pub y: i32,
    pub terrain_id: u16,
    pub overlay_flags: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitView {
    pub id: EntityId,
    pub x: i32,
    pub y: i32,
    pub team: Team,
    pub class: String,
    pub hp_cur: i32,
    pub hp_max: i32,
    pub is_selected: bool,
    pub morale_state: Option<MoraleState>,
    pub wound_count: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OverlayKind {
    MovementRange,
    AttackRange,
    DangerZone,
    Cursor,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlayView {
    pub kind: OverlayKind,
    pub x: i32,
    pub y: i32,
    pub team: Option<Team>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuItemView {
    pub label: String,
    pub enabled: bool,
    pub shortcut: Option<char>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuView {
    pub title: String,
    pub items: Vec<MenuItemView>,
    pub selected_idx: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextAnchor {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextView {
    pub anchor: TextAnchor,
    pub text: String,
    pub style_tag: String,
}

/// How much of a timeline entry the player is allowed to see
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntentVisibility {
    Full,
    Partial,
    Hidden,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelinePreviewView {
    pub unit_name: String,
    pub action_icon: String,
    pub ready_in_ticks: u64,
    pub visibility: IntentVisibility,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastView {
    pub attacker: String,
    pub defender: String,
    pub dmg_min: i32,
    pub dmg_max: i32,
    pub counter: Option<(i32, i32)>,
}

/// One frame's worth of renderable state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderContext {
    pub camera: CameraView,
    pub tiles: Vec<TileView>,
    pub units: Vec<UnitView>,
    pub overlays: Vec<OverlayView>,
    pub menus: Vec<MenuView>,
    pub texts: Vec<TextView>,
    pub timeline_preview: Vec<TimelinePreviewView>,
    pub forecast: Option<ForecastView>,
}

/// Camera centered on the cursor, clamped to the map
fn camera_for(state: &GameState, viewport_w: i32, viewport_h: i32) -> CameraView {
    let max_x = (state.map.width as i32 - viewport_w).max(0);
    let max_y = (state.map.height as i32 - viewport_h).max(0);
    CameraView {
        x: (state.cursor.position.x - viewport_w / 2).clamp(0, max_x),
        y: (state.cursor.position.y - viewport_h / 2).clamp(0, max_y),
        w: viewport_w,
        h: viewport_h,
    }
}

fn visibility_for(state: &GameState, entry_unit: EntityId) -> IntentVisibility {
    let Some(unit) = state.unit(entry_unit) else {
        return IntentVisibility::Hidden;
    };
    if unit.team() == Team::Player {
        return IntentVisibility::Full;
    }
    let reveal = state.config.intent_reveal_range;
    let near_player = state
        .alive_units()
        .filter(|u| u.team() == Team::Player)
        .any(|u| u.position().manhattan_distance(unit.position()) <= reveal);
    if near_player {
        IntentVisibility::Full
    } else {
        IntentVisibility::Partial
    }
}

/// Build the frame snapshot. Read-only by construction.
pub fn build_render_context(state: &GameState, viewport_w: i32, viewport_h: i32) -> RenderContext {
    let camera = camera_for(state, viewport_w, viewport_h);
    let phase = state.battle_phase();

    // Visible tiles only
    let mut tiles = Vec::new();
    for y in camera.y..(camera.y + camera.h).min(state.map.height as i32) {
        for x in camera.x..(camera.x + camera.w).min(state.map.width as i32) {
            let pos = crate::core::types::Vector2::new(x, y);
            if let Some(tile) = state.map.tile(pos) {
                let mut overlay_flags = 0u8;
                if state.battle.movement_range.contains(&pos) {
                    overlay_flags |= TILE_FLAG_MOVE;
                }
                if state.battle.attack_range.contains(&pos) {
                    overlay_flags |= TILE_FLAG_ATTACK;
                }
                tiles.push(TileView { x, y, terrain_id: tile.terrain.0, overlay_flags });
            }
        }
    }

    let units = state
        .alive_units()
        .map(|unit| UnitView {
            id: unit.id,
            x: unit.position().x,
            y: unit.position().y,
            team: unit.team(),
            class: unit.actor.class.name().to_string(),
            hp_cur: unit.health.hp_current,
            hp_max: unit.health.hp_max,
            is_selected: state.battle.acting_unit == Some(unit.id),
            morale_state: unit.morale.as_ref().map(morale::state_of),
            wound_count: unit.wound.as_ref().map(|w| w.count()),
        })
        .collect();

    let mut overlays = Vec::new();
    for pos in &state.battle.movement_range {
        overlays.push(OverlayView { kind: OverlayKind::MovementRange, x: pos.x, y: pos.y, team: None });
    }
    for pos in &state.battle.attack_range {
        overlays.push(OverlayView { kind: OverlayKind::AttackRange, x: pos.x, y: pos.y, team: None });
    }
    // Inspect mode paints the enemy threat ranges
    if phase == BattlePhase::Inspect {
        for unit in state.alive_units().filter(|u| u.team() == Team::Enemy) {
            for pos in crate::map::pathfinding::attack_range_tiles(
                &state.map,
                unit.position(),
                unit.combat.range_min,
                unit.combat.range_max,
            ) {
                overlays.push(OverlayView {
                    kind: OverlayKind::DangerZone,
                    x: pos.x,
                    y: pos.y,
                    team: Some(Team::Enemy),
                });
            }
        }
    }
    overlays.push(OverlayView {
        kind: OverlayKind::Cursor,
        x: state.cursor.position.x,
        y: state.cursor.position.y,
        team: None,
    });

    let mut menus = Vec::new();
    if state.ui.menu_open {
        let enabled_for = state.battle.acting_unit.and_then(|id| state.unit(id));
        let items = state
            .ui
            .action_menu
            .iter()
            .map(|action| MenuItemView {
                label: action.name().to_string(),
                enabled: enabled_for
                    .map(|unit| available_actions(unit).contains(action))
                    .unwrap_or(false),
                shortcut: match action {
                    crate::actions::Action::Wait => Some('w'),
                    crate::actions::Action::QuickStrike => Some('q'),
                    _ => None,
                },
            })
            .collect();
        menus.push(MenuView {
            title: "Act".to_string(),
            items,
            selected_idx: state.ui.menu_selection,
        });
    }

    let mut texts = Vec::new();
    texts.push(TextView {
        anchor: TextAnchor::TopLeft,
        text: format!("t{} {:?}", state.now(), phase),
        style_tag: "status".into(),
    });
    for entry in state.objectives.victory.iter() {
        texts.push(TextView {
            anchor: TextAnchor::TopRight,
            text: entry.description.clone(),
            style_tag: "objective".into(),
        });
    }
    for line in state.log.latest(3) {
        texts.push(TextView {
            anchor: TextAnchor::BottomLeft,
            text: line.text.clone(),
            style_tag: "log".into(),
        });
    }

    let now = state.now();
    let timeline_preview = state
        .timeline
        .preview(state.config.timeline_preview_len)
        .into_iter()
        .map(|entry| match entry.kind {
            EntryKind::Unit(id) => {
                let visibility = visibility_for(state, id);
                let unit_name = state
                    .unit(id)
                    .map(|u| u.name().to_string())
                    .unwrap_or_else(|| "?".into());
                let action_icon = match visibility {
                    IntentVisibility::Full => entry.label.clone(),
                    _ => "???".into(),
                };
                TimelinePreviewView {
                    unit_name,
                    action_icon,
                    ready_in_ticks: entry.ready_tick.saturating_sub(now),
                    visibility,
                }
            }
            EntryKind::Hazard(_) | EntryKind::Event(_) => TimelinePreviewView {
                unit_name: "???".into(),
                action_icon: "???".into(),
                ready_in_ticks: entry.ready_tick.saturating_sub(now),
                visibility: IntentVisibility::Hidden,
            },
        })
        .collect();

    let forecast = state.forecast.as_ref().map(|f| ForecastView {
        attacker: state
            .unit(f.attacker)
            .map(|u| u.name().to_string())
            .unwrap_or_default(),
        defender: state
            .unit(f.defender)
            .map(|u| u.name().to_string())
            .unwrap_or_default(),
        dmg_min: f.damage_min,
        dmg_max: f.damage_max,
        counter: f.counter.as_ref().map(|c| (c.damage_min, c.damage_max)),
    });

    RenderContext {
        camera,
        tiles,
        units,
        overlays,
        menus,
        texts,
        timeline_preview,
        forecast,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Vector2;
    use crate::entity::unit::UnitClass;
    use crate::timeline::EntryKind;

    fn scene() -> GameState {
        let mut state = GameState::for_tests(20, 20);
        let hero = state.spawn("Hero", UnitClass::Knight, Team::Player, Vector2::new(5, 5));
        let foe = state.spawn("Foe", UnitClass::Warrior, Team::Enemy, Vector2::new(15, 15));
        state.timeline.schedule(EntryKind::Unit(hero), 10, "Attack");
        state.timeline.schedule(EntryKind::Unit(foe), 60, "Move");
        state
    }

    #[test]
    fn test_build_does_not_mutate_state() {
        let state = scene();
        let before = serde_json::to_string(&state).unwrap();
        let _context = build_render_context(&state, 10, 8);
        let after = serde_json::to_string(&state).unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn test_camera_clamped_to_map() {
        let mut state = scene();
        state.cursor.position = Vector2::new(0, 0);
        let context = build_render_context(&state, 10, 8);
        assert_eq!((context.camera.x, context.camera.y), (0, 0));

        state.cursor.position = Vector2::new(19, 19);
        let context = build_render_context(&state, 10, 8);
        assert_eq!(context.camera.x, 10);
        assert_eq!(context.camera.y, 12);
    }

    #[test]
    fn test_units_and_cursor_present() {
        let state = scene();
        let context = build_render_context(&state, 10, 8);
        assert_eq!(context.units.len(), 2);
        assert!(context
            .overlays
            .iter()
            .any(|o| o.kind == OverlayKind::Cursor));
    }

    #[test]
    fn test_dead_units_not_rendered() {
        let mut state = scene();
        let foe = state.unit_by_name("Foe").unwrap().id;
        state.unit_mut(foe).unwrap().health.hp_current = 0;
        let context = build_render_context(&state, 10, 8);
        assert_eq!(context.units.len(), 1);
    }

    #[test]
    fn test_player_intent_is_full() {
        let state = scene();
        let context = build_render_context(&state, 10, 8);
        let hero_entry = context
            .timeline_preview
            .iter()
            .find(|p| p.unit_name == "Hero")
            .unwrap();
        assert_eq!(hero_entry.visibility, IntentVisibility::Full);
        assert_eq!(hero_entry.action_icon, "Attack");
    }

    #[test]
    fn test_distant_enemy_intent_is_partial() {
        let state = scene();
        let context = build_render_context(&state, 10, 8);
        let foe_entry = context
            .timeline_preview
            .iter()
            .find(|p| p.unit_name == "Foe")
            .unwrap();
        assert_eq!(foe_entry.visibility, IntentVisibility::Partial);
        assert_eq!(foe_entry.action_icon, "???");
    }

    #[test]
    fn test_nearby_enemy_intent_revealed() {
        let mut state = scene();
        let foe = state.unit_by_name("Foe").unwrap().id;
        state.unit_mut(foe).unwrap().movement.position = Vector2::new(6, 5);
        let context = build_render_context(&state, 10, 8);
        let foe_entry = context
            .timeline_preview
            .iter()
            .find(|p| p.unit_name == "Foe")
            .unwrap();
        assert_eq!(foe_entry.visibility, IntentVisibility::Full);
    }

    #[test]
    fn test_preview_ticks_are_relative() {
        let state = scene();
        let context = build_render_context(&state, 10, 8);
        assert_eq!(context.timeline_preview[0].ready_in_ticks, 10);
        assert_eq!(context.timeline_preview[1].ready_in_ticks, 60);
    }
}
