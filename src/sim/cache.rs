//! Event cache
//!
//! Next-event times are expensive (one polynomial per pair), but almost all of them
//! stay valid from one event to the next: only pairs involving a ball that was just
//! resolved can change. Entries are stored as absolute times and dropped for exactly
//! those pairs.

use std::collections::BTreeMap;

use super::events::{Event, EventClass};

/// Cache key: a pair of object IDs, see [`EventClass::ball_slots`]
pub type PairKey = (u32, u32);

/// Per-class collision times plus per-ball transition events
#[derive(Debug, Clone, Default)]
pub struct EventCache {
    collisions: BTreeMap<EventClass, BTreeMap<PairKey, f64>>,
    transitions: BTreeMap<u32, Event>,
}

impl EventCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, class: EventClass, key: PairKey) -> Option<f64> {
        self.collisions.get(&class).and_then(|m| m.get(&key).copied())
    }

    pub fn contains(&self, class: EventClass, key: PairKey) -> bool {
        self.get(class, key).is_some()
    }

    pub fn insert(&mut self, class: EventClass, key: PairKey, time: f64) {
        self.collisions.entry(class).or_default().insert(key, time);
    }

    pub fn transition(&self, ball_id: u32) -> Option<&Event> {
        self.transitions.get(&ball_id)
    }

    pub fn insert_transition(&mut self, ball_id: u32, event: Event) {
        self.transitions.insert(ball_id, event);
    }

    /// Earliest entry of a class. Ties go to the smallest key.
    pub fn next(&self, class: EventClass) -> Option<(PairKey, f64)> {
        let mut best: Option<(PairKey, f64)> = None;
        for (key, t) in self.collisions.get(&class)? {
            if best.is_none_or(|(_, bt)| *t < bt) {
                best = Some((*key, *t));
            }
        }
        best
    }

    /// Earliest transition. Ties go to the smallest ball ID.
    pub fn next_transition(&self) -> Option<Event> {
        let mut best: Option<Event> = None;
        for event in self.transitions.values() {
            if best.is_none_or(|b| event.time < b.time) {
                best = Some(*event);
            }
        }
        best
    }

    /// Drop every entry that involves one of `ball_ids`
    pub fn invalidate(&mut self, ball_ids: &[u32]) {
        if ball_ids.is_empty() {
            return;
        }
        for (class, times) in self.collisions.iter_mut() {
            let slots = class.ball_slots();
            times.retain(|key, _| {
                let ids = [key.0, key.1];
                !slots.iter().any(|&i| ball_ids.contains(&ids[i]))
            });
        }
        for id in ball_ids {
            self.transitions.remove(id);
        }
    }

    /// Number of cached collision entries
    pub fn len(&self) -> usize {
        self.collisions.values().map(|m| m.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0 && self.transitions.is_empty()
    }
}
