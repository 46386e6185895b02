//! Central event bus
//!
//! Managers never hold references to one another; every cross-manager
//! effect flows through here. Publishing is synchronous: all direct
//! handlers of an event run to completion, then events they emitted are
//! dispatched in emission order at depth + 1. Depth beyond the
//! configured limit is fatal so event loops surface instead of hanging.

use std::collections::VecDeque;

use crate::battle::state::GameState;
use crate::core::error::{GrimError, Result};
use crate::events::events::{EventKind, GameEvent};

/// A manager's subscription surface.
///
/// Handlers receive the event, exclusive access to GameState for the
/// duration of the call, and a writer for follow-up events. They never
/// see the bus itself or other subscribers.
pub trait Subscriber {
    fn name(&self) -> &'static str;

    /// Kinds this subscriber wants; an empty slice means every event
    fn interests(&self) -> &'static [EventKind];

    fn handle(&mut self, event: &GameEvent, state: &mut GameState, out: &mut EventWriter);
}

/// Collects events emitted from inside a handler
#[derive(Debug, Default)]
pub struct EventWriter {
    pending: Vec<GameEvent>,
}

impl EventWriter {
    pub fn emit(&mut self, event: GameEvent) {
        self.pending.push(event);
    }
}

struct Subscription {
    priority: i32,
    order: u64,
    handler: Box<dyn Subscriber>,
}

/// Priority pub/sub mediator with queued dispatch
pub struct EventBus {
    subscriptions: Vec<Subscription>,
    deferred: VecDeque<GameEvent>,
    history: Vec<GameEvent>,
    recursion_limit: usize,
    next_order: u64,
}

impl EventBus {
    pub fn new(recursion_limit: usize) -> Self {
        Self {
            subscriptions: Vec::new(),
            deferred: VecDeque::new(),
            history: Vec::new(),
            recursion_limit,
            next_order: 0,
        }
    }

    /// Register a subscriber. Same-kind handlers run in descending
    /// priority; ties keep subscription order.
    pub fn subscribe(&mut self, priority: i32, handler: Box<dyn Subscriber>) {
        let order = self.next_order;
        self.next_order += 1;
        self.subscriptions.push(Subscription { priority, order, handler });
        self.subscriptions
            .sort_by(|a, b| b.priority.cmp(&a.priority).then(a.order.cmp(&b.order)));
    }

    /// Publish immediately: every handler runs before this returns.
    pub fn publish(&mut self, event: GameEvent, state: &mut GameState) -> Result<()> {
        self.dispatch(event, state, 0)
    }

    fn dispatch(&mut self, event: GameEvent, state: &mut GameState, depth: usize) -> Result<()> {
        if depth > self.recursion_limit {
            return Err(GrimError::EventRecursionLimit(depth));
        }
        self.history.push(event.clone());

        let kind = event.kind();
        let mut writer = EventWriter::default();

        // Handlers are owned by the bus; take them out so a handler can
        // never observe or mutate the subscription list mid-dispatch.
        let mut subscriptions = std::mem::take(&mut self.subscriptions);
        for sub in subscriptions.iter_mut() {
            let interests = sub.handler.interests();
            if interests.is_empty() || interests.contains(&kind) {
                sub.handler.handle(&event, state, &mut writer);
            }
        }
        self.subscriptions = subscriptions;

        for nested in writer.pending {
            self.dispatch(nested, state, depth + 1)?;
        }
        Ok(())
    }

    /// Queue an event for a later drain (end-of-activation batches)
    pub fn enqueue(&mut self, event: GameEvent) {
        self.deferred.push_back(event);
    }

    /// Dispatch all queued events in FIFO order
    pub fn drain(&mut self, state: &mut GameState) -> Result<usize> {
        let mut processed = 0;
        while let Some(event) = self.deferred.pop_front() {
            self.dispatch(event, state, 0)?;
            processed += 1;
        }
        Ok(processed)
    }

    /// Every event dispatched so far, in observation order
    pub fn history(&self) -> &[GameEvent] {
        &self.history
    }

    pub fn has_deferred(&self) -> bool {
        !self.deferred.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::state::GameState;
    use crate::events::events::EventPayload;

    struct Recorder {
        tag: &'static str,
        seen: std::rc::Rc<std::cell::RefCell<Vec<&'static str>>>,
    }

    impl Subscriber for Recorder {
        fn name(&self) -> &'static str {
            "recorder"
        }

        fn interests(&self) -> &'static [EventKind] {
            &[EventKind::InspectToggled]
        }

        fn handle(&mut self, _event: &GameEvent, _state: &mut GameState, _out: &mut EventWriter) {
            self.seen.borrow_mut().push(self.tag);
        }
    }

    struct Chainer {
        fired: bool,
    }

    impl Subscriber for Chainer {
        fn name(&self) -> &'static str {
            "chainer"
        }

        fn interests(&self) -> &'static [EventKind] {
            &[EventKind::InspectToggled]
        }

        fn handle(&mut self, _event: &GameEvent, _state: &mut GameState, out: &mut EventWriter) {
            if !self.fired {
                self.fired = true;
                out.emit(GameEvent::new(0, EventPayload::TurnEnded {
                    unit: crate::core::types::EntityId(1),
                    weight_spent: 50,
                }));
            }
        }
    }

    struct Looper;

    impl Subscriber for Looper {
        fn name(&self) -> &'static str {
            "looper"
        }

        fn interests(&self) -> &'static [EventKind] {
            &[EventKind::InspectToggled]
        }

        fn handle(&mut self, event: &GameEvent, _state: &mut GameState, out: &mut EventWriter) {
            out.emit(event.clone());
        }
    }

    fn toggle() -> GameEvent {
        GameEvent::new(0, EventPayload::InspectToggled)
    }

    #[test]
    fn test_priority_descending_then_subscription_order() {
        let seen = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
        let mut bus = EventBus::new(16);
        bus.subscribe(0, Box::new(Recorder { tag: "low-first", seen: seen.clone() }));
        bus.subscribe(10, Box::new(Recorder { tag: "high", seen: seen.clone() }));
        bus.subscribe(0, Box::new(Recorder { tag: "low-second", seen: seen.clone() }));

        let mut state = GameState::for_tests(4, 4);
        bus.publish(toggle(), &mut state).unwrap();

        assert_eq!(*seen.borrow(), vec!["high", "low-first", "low-second"]);
    }

    #[test]
    fn test_nested_events_follow_outer_handlers() {
        let mut bus = EventBus::new(16);
        bus.subscribe(0, Box::new(Chainer { fired: false }));

        let mut state = GameState::for_tests(4, 4);
        bus.publish(toggle(), &mut state).unwrap();

        let kinds: Vec<EventKind> = bus.history().iter().map(|e| e.kind()).collect();
        assert_eq!(kinds, vec![EventKind::InspectToggled, EventKind::TurnEnded]);
    }

    #[test]
    fn test_recursion_limit_is_fatal() {
        let mut bus = EventBus::new(8);
        bus.subscribe(0, Box::new(Looper));

        let mut state = GameState::for_tests(4, 4);
        let err = bus.publish(toggle(), &mut state).unwrap_err();
        assert!(matches!(err, GrimError::EventRecursionLimit(_)));
    }

    #[test]
    fn test_drain_processes_fifo() {
        let seen = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
        let mut bus = EventBus::new(16);
        bus.subscribe(0, Box::new(Recorder { tag: "a", seen: seen.clone() }));

        let mut state = GameState::for_tests(4, 4);
        bus.enqueue(toggle());
        bus.enqueue(toggle());
        assert!(bus.has_deferred());

        let processed = bus.drain(&mut state).unwrap();
        assert_eq!(processed, 2);
        assert_eq!(seen.borrow().len(), 2);
        assert!(!bus.has_deferred());
    }

    #[test]
    fn test_history_records_publish_order() {
        let mut bus = EventBus::new(16);
        let mut state = GameState::for_tests(4, 4);
        bus.publish(toggle(), &mut state).unwrap();
        bus.publish(toggle(), &mut state).unwrap();
        assert_eq!(bus.history().len(), 2);
    }
}
