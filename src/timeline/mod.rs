//! Timeline scheduler
//!
//! A min-priority queue over discrete ticks. Units, hazards, and
//! scheduled events share one queue; ordering is strictly
//! `(ready_tick, seq)` with no priority by kind, so runs are
//! deterministic. Cancellation is lazy: entries are tombstoned and
//! discarded when they surface.

use std::cmp::Ordering;
use std::collections::{BTreeSet, BinaryHeap};

use serde::{Deserialize, Serialize};

use crate::core::types::{EntityId, Tick, Weight};
use crate::entity::unit::Unit;

/// What a timeline entry activates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryKind {
    Unit(EntityId),
    Hazard(u32),
    Event(u32),
}

/// A scheduled activation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub ready_tick: Tick,
    /// Session-unique, monotonically increasing; breaks every tie
    pub seq: u64,
    pub kind: EntryKind,
    /// Display label for the timeline preview ("Attack", "???", ...)
    pub label: String,
}

impl TimelineEntry {
    pub fn entity_id(&self) -> Option<EntityId> {
        match self.kind {
            EntryKind::Unit(id) => Some(id),
            _ => None,
        }
    }
}

// Reversed so BinaryHeap pops the earliest (ready_tick, seq) first
impl Ord for TimelineEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        (other.ready_tick, other.seq).cmp(&(self.ready_tick, self.seq))
    }
}

impl PartialOrd for TimelineEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// The time axis of the battle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Timeline {
    heap: BinaryHeap<TimelineEntry>,
    // Ordered so that serialized timelines are byte-stable
    tombstones: BTreeSet<u64>,
    now: Tick,
    next_seq: u64,
}

impl Timeline {
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            tombstones: BTreeSet::new(),
            now: 0,
            next_seq: 0,
        }
    }

    pub fn now(&self) -> Tick {
        self.now
    }

    /// The next seq that will be assigned; also the count of entries
    /// ever scheduled
    pub fn sequence(&self) -> u64 {
        self.next_seq
    }

    /// Schedule an entry at an absolute tick. Returns its seq.
    pub fn schedule(&mut self, kind: EntryKind, ready_tick: Tick, label: impl Into<String>) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(TimelineEntry {
            ready_tick,
            seq,
            kind,
            label: label.into(),
        });
        seq
    }

    /// Schedule a unit's next activation at `now + speed + weight`
    pub fn schedule_unit(&mut self, unit: &Unit, weight: Weight, label: impl Into<String>) -> u64 {
        debug_assert!(unit.is_alive(), "scheduling a dead unit");
        let ready = self.now + unit.movement.speed as Tick + weight as Tick;
        self.schedule(EntryKind::Unit(unit.id), ready, label)
    }

    /// Inspect the earliest live entry, discarding tombstoned heads
    pub fn peek(&mut self) -> Option<&TimelineEntry> {
        loop {
            let head_dead = match self.heap.peek() {
                Some(head) => self.tombstones.contains(&head.seq),
                None => return None,
            };
            if !head_dead {
                break;
            }
            if let Some(entry) = self.heap.pop() {
                self.tombstones.remove(&entry.seq);
            }
        }
        self.heap.peek()
    }

    /// Remove and return the earliest live entry, advancing `now`
    pub fn pop(&mut self) -> Option<TimelineEntry> {
        while let Some(entry) = self.heap.pop() {
            if self.tombstones.remove(&entry.seq) {
                continue;
            }
            self.now = self.now.max(entry.ready_tick);
            return Some(entry);
        }
        None
    }

    /// Tombstone every live entry referencing an entity
    pub fn cancel(&mut self, id: EntityId) -> usize {
        let mut cancelled = 0;
        for entry in self.heap.iter() {
            if entry.entity_id() == Some(id) && !self.tombstones.contains(&entry.seq) {
                self.tombstones.insert(entry.seq);
                cancelled += 1;
            }
        }
        cancelled
    }

    /// Cancel any existing entries for the unit and schedule it afresh
    pub fn reschedule(&mut self, unit: &Unit, weight: Weight, label: impl Into<String>) -> u64 {
        self.cancel(unit.id);
        self.schedule_unit(unit, weight, label)
    }

    /// The next `count` live entries, without mutating the queue
    pub fn preview(&self, count: usize) -> Vec<TimelineEntry> {
        let mut scratch = self.heap.clone();
        let mut entries = Vec::new();
        while entries.len() < count {
            match scratch.pop() {
                Some(entry) if self.tombstones.contains(&entry.seq) => continue,
                Some(entry) => entries.push(entry),
                None => break,
            }
        }
        entries
    }

    /// True when no live entries remain
    pub fn is_empty(&self) -> bool {
        !self
            .heap
            .iter()
            .any(|entry| !self.tombstones.contains(&entry.seq))
    }

    /// Count of live entries
    pub fn live_len(&self) -> usize {
        self.heap
            .iter()
            .filter(|entry| !self.tombstones.contains(&entry.seq))
            .count()
    }

    /// Rebuild the heap without tombstoned entries. Worth calling only
    /// when the tombstone set has grown large.
    pub fn compact(&mut self) -> usize {
        let before = self.heap.len();
        let tombstones = std::mem::take(&mut self.tombstones);
        let entries: Vec<TimelineEntry> = std::mem::take(&mut self.heap)
            .into_iter()
            .filter(|entry| !tombstones.contains(&entry.seq))
            .collect();
        self.heap = entries.into();
        before - self.heap.len()
    }
}

impl Default for Timeline {
    fn default() -> Self {
        Self::new()
    }
}
