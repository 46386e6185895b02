//! Abstract input events
//!
//! The core never sees raw keys; any device-specific decoder maps its
//! input onto this closed set.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InputEvent {
    MoveCursor { dx: i32, dy: i32 },
    Confirm,
    Cancel,
    QuickWait,
    QuickAttack,
    ToggleInspect,
    EndTurn,
    Quit,
}
