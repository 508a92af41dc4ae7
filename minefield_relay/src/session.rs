// Session state: the process-wide board seed and the restart request flag.
//
// Like `Registry`, `SessionState` has no internal locking; it lives inside
// `SharedState` next to the registry and is only touched under that lock.
//
// State machine for the seed:
//
//   current ──(any handler sees phase == Lose)──> pending regeneration
//   pending ──(monitor publishes a new seed)────> current
//
// Only the seed restart monitor (`monitor.rs`) moves a pending seed back to
// current. Handlers only ever set the flag and read the seed.

use std::time::{SystemTime, UNIX_EPOCH};

pub struct SessionState {
    seed: u32,
    restart_requested: bool,
}

impl SessionState {
    pub fn new(seed: u32) -> Self {
        Self {
            seed,
            restart_requested: false,
        }
    }

    /// The authoritative seed every reply is stamped with.
    pub fn seed(&self) -> u32 {
        self.seed
    }

    pub fn restart_requested(&self) -> bool {
        self.restart_requested
    }

    /// Mark the seed as pending regeneration. Returns `true` if this call
    /// changed the flag (it was not already pending).
    pub fn request_restart(&mut self) -> bool {
        let newly = !self.restart_requested;
        self.restart_requested = true;
        newly
    }

    /// Publish `seed` as the new authoritative value and clear the pending
    /// flag.
    pub fn publish_seed(&mut self, seed: u32) {
        self.seed = seed;
        self.restart_requested = false;
    }
}

/// Derive a seed from the wall clock (seconds mixed with sub-second nanos).
pub fn time_seed() -> u32 {
    let elapsed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    // Truncation to the low 32 bits is intended.
    let secs = elapsed.as_secs() as u32;
    secs.rotate_left(16) ^ elapsed.subsec_nanos()
}

/// Pick the seed that replaces `previous`. Time-derived, but never equal to
/// `previous`, so peers comparing against their last known seed always see a
/// restart.
pub fn next_seed(previous: u32) -> u32 {
    let candidate = time_seed();
    if candidate == previous {
        candidate.wrapping_add(1)
    } else {
        candidate
    }
}
