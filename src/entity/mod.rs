pub mod components;
pub mod unit;

pub use unit::{Unit, UnitClass};
