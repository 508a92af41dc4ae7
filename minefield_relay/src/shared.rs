// Shared relay state: registry + session behind one lock.
//
// `SharedState` is the only thing handler, acceptor, and monitor threads
// share. A single `Mutex` covers both the `Registry` and the `SessionState`,
// which makes the per-record exchange one critical section:
//
//   restart request (if phase == Lose) → seed stamp → registry update → copy
//
// so a snapshot always reflects one instant, and every record in it that was
// stamped after a seed publish carries that seed or a newer one.
//
// The critical sections only mutate and copy memory. Callers do their network
// writes after the guard is dropped, using the returned `Batch`; the reply
// count and seed therefore always come from the snapshot itself, never from
// state re-read after unlocking.
//
// A `Condvar` paired with the same mutex lets the seed restart monitor sleep
// until a restart is requested instead of polling in a tight loop.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use minefield_protocol::{Batch, GamePhase, Record};

use crate::registry::{ConnectionId, Registry};
use crate::session::{SessionState, next_seed};

struct Inner {
    registry: Registry,
    session: SessionState,
}

pub struct SharedState {
    inner: Mutex<Inner>,
    restart_signal: Condvar,
}

impl SharedState {
    pub fn new(capacity: usize, seed: u32) -> Self {
        Self {
            inner: Mutex::new(Inner {
                registry: Registry::new(capacity),
                session: SessionState::new(seed),
            }),
            restart_signal: Condvar::new(),
        }
    }

    // A handler that panicked mid-section leaves plain data behind (a map of
    // `Copy` records and two scalars), so recovering the guard is sound.
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a newly accepted connection. Returns `false` when the registry
    /// is at capacity; nothing is mutated in that case.
    pub fn admit(&self, id: ConnectionId) -> bool {
        self.lock().registry.add(id)
    }

    /// Drop a connection's entry. Idempotent.
    pub fn remove(&self, id: ConnectionId) {
        self.lock().registry.remove(id);
    }

    /// Apply one received record and return the resulting snapshot.
    ///
    /// Under a single critical section: request a restart if the record
    /// reports `Lose`, overwrite its seed with the authoritative one, store
    /// it as `id`'s latest record, and copy every registered record along
    /// with the seed.
    pub fn update_and_snapshot(&self, id: ConnectionId, record: Record) -> Batch {
        let mut inner = self.lock();
        let restart = record.phase == GamePhase::Lose && inner.session.request_restart();
        let seed = inner.session.seed();
        let records = inner.registry.update_and_snapshot(id, record.with_seed(seed));
        drop(inner);
        let snapshot = Batch::new(seed, records);

        if restart {
            self.restart_signal.notify_all();
        }
        snapshot
    }

    /// Ask the monitor for a fresh seed without going through a record.
    pub fn request_restart(&self) {
        let newly = self.lock().session.request_restart();
        if newly {
            self.restart_signal.notify_all();
        }
    }

    /// Block until a restart is pending or `timeout` elapses. Returns whether
    /// a restart is pending on return.
    pub fn wait_for_restart(&self, timeout: Duration) -> bool {
        let guard = self.lock();
        let (guard, _timeout) = self
            .restart_signal
            .wait_timeout_while(guard, timeout, |inner| !inner.session.restart_requested())
            .unwrap_or_else(PoisonError::into_inner);
        guard.session.restart_requested()
    }

    /// If a restart is pending, publish a new seed and clear the request.
    /// Returns the published seed.
    pub fn regenerate_seed(&self) -> Option<u32> {
        let mut inner = self.lock();
        if !inner.session.restart_requested() {
            return None;
        }
        let seed = next_seed(inner.session.seed());
        inner.session.publish_seed(seed);
        Some(seed)
    }

    /// Wake every thread blocked in `wait_for_restart` (used on shutdown).
    pub fn wake_all(&self) {
        self.restart_signal.notify_all();
    }

    pub fn seed(&self) -> u32 {
        self.lock().session.seed()
    }

    pub fn restart_requested(&self) -> bool {
        self.lock().session.restart_requested()
    }

    pub fn client_count(&self) -> usize {
        self.lock().registry.len()
    }

    pub fn capacity(&self) -> usize {
        self.lock().registry.capacity()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;
    use std::time::Instant;

    use minefield_protocol::{CellAction, Cursor};

    use super::*;

    fn playing(x: f32) -> Record {
        Record::new(Cursor::new(x, 0.0), CellAction::Opened, GamePhase::Playing)
    }

    #[test]
    fn stamps_authoritative_seed_over_sender_seed() {
        let state = SharedState::new(4, 777);
        state.admit(ConnectionId(1));

        let snapshot = state.update_and_snapshot(ConnectionId(1), playing(1.0).with_seed(5));
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.seed, 777);
        assert_eq!(snapshot.records[0].seed, 777);
    }

    #[test]
    fn lose_requests_restart_and_monitor_publishes() {
        let state = SharedState::new(4, 1);
        state.admit(ConnectionId(1));

        let lose = Record::new(Cursor::default(), CellAction::Opened, GamePhase::Lose);
        let snapshot = state.update_and_snapshot(ConnectionId(1), lose);
        assert_eq!(snapshot.seed, 1, "stamped before the monitor runs");
        assert!(state.restart_requested());

        assert!(state.wait_for_restart(Duration::from_millis(10)));
        let seed = state.regenerate_seed().unwrap();
        assert_ne!(seed, 1);
        assert!(!state.restart_requested());
        assert_eq!(state.regenerate_seed(), None, "nothing pending anymore");

        let snapshot = state.update_and_snapshot(ConnectionId(1), playing(2.0));
        assert_eq!(snapshot.seed, seed);
        assert_eq!(snapshot.records[0].seed, seed);
    }

    #[test]
    fn wait_for_restart_times_out_without_request() {
        let state = SharedState::new(1, 1);
        let start = Instant::now();
        assert!(!state.wait_for_restart(Duration::from_millis(20)));
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn restart_request_wakes_waiting_thread() {
        let state = Arc::new(SharedState::new(1, 1));
        let waiter = {
            let state = Arc::clone(&state);
            thread::spawn(move || state.wait_for_restart(Duration::from_secs(10)))
        };
        thread::sleep(Duration::from_millis(20));
        let start = Instant::now();
        state.request_restart();
        assert!(waiter.join().unwrap());
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn capacity_bound_under_concurrent_admits() {
        let state = Arc::new(SharedState::new(8, 0));
        let handles: Vec<_> = (0..32)
            .map(|i| {
                let state = Arc::clone(&state);
                thread::spawn(move || state.admit(ConnectionId(i)))
            })
            .collect();
        let admitted = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();
        assert_eq!(admitted, 8);
        assert_eq!(state.client_count(), 8);
    }

    /// Concurrent updaters interleaved with admits/removes: every snapshot
    /// contains the caller's own just-written record and never exceeds
    /// capacity.
    #[test]
    fn snapshots_are_atomic_under_churn() {
        const WRITERS: u64 = 4;
        const CAPACITY: usize = 12;
        let state = Arc::new(SharedState::new(CAPACITY, 9));
        for id in 0..WRITERS {
            assert!(state.admit(ConnectionId(id)));
        }

        let churn = {
            let state = Arc::clone(&state);
            thread::spawn(move || {
                for round in 0..500u64 {
                    let id = ConnectionId(1000 + round % 8);
                    state.admit(id);
                    state.remove(id);
                }
            })
        };

        let writers: Vec<_> = (0..WRITERS)
            .map(|id| {
                let state = Arc::clone(&state);
                thread::spawn(move || {
                    for step in 0..500u32 {
                        let record = playing(id as f32 * 1000.0 + step as f32);
                        let snapshot = state.update_and_snapshot(ConnectionId(id), record);
                        assert!(snapshot.len() >= WRITERS as usize);
                        assert!(snapshot.len() <= CAPACITY);
                        assert!(snapshot.records.contains(&record.with_seed(9)));
                    }
                })
            })
            .collect();

        churn.join().unwrap();
        for writer in writers {
            writer.join().unwrap();
        }
        assert_eq!(state.client_count(), WRITERS as usize);
    }
}
