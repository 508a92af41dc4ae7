// Client registry: live connections and the last record each one sent.
//
// `Registry` is a plain data structure with no internal locking. It lives
// inside `SharedState` (see `shared.rs`), whose single mutex serializes every
// call, so `update_and_snapshot` is atomic with respect to concurrent
// add/remove/update from other handler threads.
//
// Capacity is an explicit precondition of `add`: the map is never allowed to
// grow past `capacity` entries. Removal is keyed by handle, so no positional
// swapping is involved and the order of the remaining entries carries no
// meaning.

use std::fmt;

use minefield_protocol::Record;
use rustc_hash::FxHashMap;

/// Relay-assigned handle for one accepted connection. Never reused within a
/// process.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

pub struct Registry {
    entries: FxHashMap<ConnectionId, Record>,
    capacity: usize,
}

impl Registry {
    pub fn new(capacity: usize) -> Self {
        let mut entries = FxHashMap::default();
        entries.reserve(capacity);
        Self { entries, capacity }
    }

    /// Register `id` with the default idle record. Returns `false` (and leaves
    /// the registry untouched) when the registry is already full.
    ///
    /// Re-adding a handle that is already present resets its record and does
    /// not count against capacity a second time.
    pub fn add(&mut self, id: ConnectionId) -> bool {
        if let Some(record) = self.entries.get_mut(&id) {
            *record = Record::default();
            return true;
        }
        if self.is_full() {
            return false;
        }
        self.entries.insert(id, Record::default());
        true
    }

    /// Remove `id` if present. Removing an absent handle is a no-op.
    pub fn remove(&mut self, id: ConnectionId) -> Option<Record> {
        self.entries.remove(&id)
    }

    /// Overwrite `id`'s record, then copy out every registered record.
    ///
    /// The returned snapshot always includes the record just written. If `id`
    /// is not registered (it was removed concurrently) the record is not
    /// re-inserted and the snapshot reflects the registry without it.
    pub fn update_and_snapshot(&mut self, id: ConnectionId, record: Record) -> Vec<Record> {
        if let Some(slot) = self.entries.get_mut(&id) {
            *slot = record;
        }
        self.entries.values().copied().collect()
    }

    pub fn get(&self, id: ConnectionId) -> Option<&Record> {
        self.entries.get(&id)
    }

    pub fn contains(&self, id: ConnectionId) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.capacity
    }
}
