pub mod calculator;
pub mod morale;
pub mod resolver;
pub mod wounds;

pub use calculator::Forecast;
pub use resolver::AttackReport;
pub use wounds::{BodyPart, Wound, WoundSeverity};
