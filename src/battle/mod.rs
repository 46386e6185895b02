pub mod combat_manager;
pub mod engine;
pub mod hazards;
pub mod interrupts;
pub mod log_manager;
pub mod morale_manager;
pub mod objectives;
pub mod phase;
pub mod selection;
pub mod state;
pub mod timeline_manager;

pub use engine::{Engagement, Engine};
pub use state::{BattlePhase, GamePhase, GameState};
