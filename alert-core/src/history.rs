//! Bounded, persisted log of alerts received by the companion.

use heapless::{Deque, Vec};
use serde::{Serialize, Serializer};

use crate::store::{KeyValueStore, StoreError, load_record, save_record};
use crate::wire::{AlertEvent, MAX_ALERT_BLOB};

pub const DEFAULT_HISTORY_CAPACITY: usize = 50;

/// Largest capacity whose snapshot fits [`HISTORY_SCRATCH`].
pub const MAX_HISTORY_CAPACITY: usize = 64;

/// Storage key for the serialized history snapshot.
pub const HISTORY_KEY: &str = "alertHistory";

/// Scratch space needed to encode a full snapshot.
pub const HISTORY_SCRATCH: usize = MAX_HISTORY_CAPACITY * MAX_ALERT_BLOB + 8;

/// Newest-first list of received alerts holding at most `CAP` entries.
#[derive(Clone, Debug)]
pub struct AlertHistoryStore<const CAP: usize = DEFAULT_HISTORY_CAPACITY> {
    events: Deque<AlertEvent, CAP>,
}

struct Snapshot<'a, const CAP: usize>(&'a Deque<AlertEvent, CAP>);

impl<const CAP: usize> Serialize for Snapshot<'_, CAP> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_seq(self.0.iter())
    }
}

impl<const CAP: usize> AlertHistoryStore<CAP> {
    #[must_use]
    pub const fn new() -> Self {
        const { assert!(CAP > 0 && CAP <= MAX_HISTORY_CAPACITY) };
        Self {
            events: Deque::new(),
        }
    }

    /// Restores the snapshot saved under [`HISTORY_KEY`].
    ///
    /// A missing key yields an empty history.
    pub fn load<S>(store: &S) -> Result<Self, StoreError>
    where
        S: KeyValueStore + ?Sized,
    {
        let mut scratch = [0u8; HISTORY_SCRATCH];
        let mut history = Self::new();
        let saved: Option<Vec<AlertEvent, CAP>> = load_record(store, HISTORY_KEY, &mut scratch)?;
        for event in saved.into_iter().flatten() {
            if history.events.push_back(event).is_err() {
                break;
            }
        }
        Ok(history)
    }

    /// Inserts `event` at the front, returning the entry dropped from the tail.
    pub fn push(&mut self, event: AlertEvent) -> Option<AlertEvent> {
        let evicted = if self.events.is_full() {
            self.events.pop_back()
        } else {
            None
        };
        // A slot is free after the eviction above.
        let _ = self.events.push_front(event);
        evicted
    }

    /// Writes the whole history under [`HISTORY_KEY`].
    pub fn persist<S>(&self, store: &mut S) -> Result<(), StoreError>
    where
        S: KeyValueStore + ?Sized,
    {
        let mut scratch = [0u8; HISTORY_SCRATCH];
        save_record(store, HISTORY_KEY, &Snapshot(&self.events), &mut scratch)
    }

    /// Empties the history and removes the persisted snapshot.
    pub fn clear<S>(&mut self, store: &mut S) -> Result<(), StoreError>
    where
        S: KeyValueStore + ?Sized,
    {
        self.events.clear();
        store.remove(HISTORY_KEY)
    }

    /// Iterates newest first.
    pub fn iter(&self) -> impl Iterator<Item = &AlertEvent> {
        self.events.iter()
    }

    pub fn latest(&self) -> Option<&AlertEvent> {
        self.events.front()
    }

    pub fn get(&self, index: usize) -> Option<&AlertEvent> {
        self.events.iter().nth(index)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub const fn capacity(&self) -> usize {
        CAP
    }

    #[cfg(feature = "alloc")]
    pub fn to_vec(&self) -> alloc::vec::Vec<AlertEvent> {
        self.events.iter().cloned().collect()
    }
}

impl<const CAP: usize> Default for AlertHistoryStore<CAP> {
    fn default() -> Self {
        Self::new()
    }
}
