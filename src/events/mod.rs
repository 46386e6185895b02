pub mod bus;
pub mod events;

pub use bus::{EventBus, EventWriter, Subscriber};
pub use events::{EventKind, EventPayload, GameEvent};
