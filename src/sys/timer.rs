//! Deadlines for the manager's one-shot timers.
//!
//! Nothing here sleeps: the owner asks for [`Timers::next_deadline`] and
//! calls [`Timers::pop_due`] until it runs dry once its clock has passed it.

use std::cell::Cell;
use std::hash::Hash;
use std::rc::Rc;
use std::time::{Duration, Instant};

use crate::common::collections::HashMap;

pub trait Clock {
    fn now(&self) -> Instant;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant { Instant::now() }
}

/// Clock that only moves when told to. Used by tests and trace replay.
#[derive(Debug, Clone)]
pub struct ManualClock(Rc<Cell<Instant>>);

impl ManualClock {
    pub fn new() -> Self { ManualClock(Rc::new(Cell::new(Instant::now()))) }

    pub fn set(&self, at: Instant) {
        if at > self.0.get() {
            self.0.set(at);
        }
    }
}

impl Default for ManualClock {
    fn default() -> Self { Self::new() }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant { self.0.get() }
}

#[derive(Debug, Clone, Copy)]
struct Entry {
    deadline: Instant,
    seq: u64,
}

/// One pending deadline per key. Scheduling a key that is already pending
/// replaces its deadline.
#[derive(Debug)]
pub struct Timers<K> {
    pending: HashMap<K, Entry>,
    next_seq: u64,
}

impl<K> Default for Timers<K> {
    fn default() -> Self {
        Timers {
            pending: HashMap::default(),
            next_seq: 0,
        }
    }
}

impl<K: Copy + Eq + Hash> Timers<K> {
    pub fn new() -> Self { Self::default() }

    pub fn schedule(&mut self, key: K, deadline: Instant) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.pending.insert(key, Entry { deadline, seq });
    }

    pub fn cancel(&mut self, key: K) -> bool { self.pending.remove(&key).is_some() }

    pub fn cancel_where(&mut self, mut pred: impl FnMut(&K) -> bool) -> usize {
        let before = self.pending.len();
        self.pending.retain(|key, _| !pred(key));
        before - self.pending.len()
    }

    pub fn clear(&mut self) { self.pending.clear(); }

    pub fn is_pending(&self, key: K) -> bool { self.pending.contains_key(&key) }

    pub fn len(&self) -> usize { self.pending.len() }

    pub fn is_empty(&self) -> bool { self.pending.is_empty() }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.values().map(|entry| entry.deadline).min()
    }

    /// Removes and returns the earliest key due at `now`.
    pub fn pop_due(&mut self, now: Instant) -> Option<K> {
        let key = self
            .pending
            .iter()
            .filter(|(_, entry)| entry.deadline <= now)
            .min_by_key(|(_, entry)| (entry.deadline, entry.seq))
            .map(|(key, _)| *key)?;
        self.pending.remove(&key);
        Some(key)
    }
}
