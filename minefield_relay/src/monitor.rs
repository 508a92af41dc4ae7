// Seed restart monitor.
//
// A background thread that waits for a restart request (a handler saw a peer
// report `GamePhase::Lose`) and then publishes a fresh seed. It sleeps on the
// shared condvar with `interval` as an upper bound, so it reacts immediately
// to a request, rechecks at a coarse cadence regardless, and never spins.
//
// Publishing does not push anything to peers. Each peer picks up the new seed
// the next time its handler stamps a reply.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tracing::debug;

use crate::event_log::{EventRecorder, RelayEvent};
use crate::shared::SharedState;

pub struct SeedMonitor {
    pub state: Arc<SharedState>,
    pub events: EventRecorder,
    pub interval: Duration,
    pub keep_running: Arc<AtomicBool>,
}

impl SeedMonitor {
    pub fn run(self) {
        debug!(interval = ?self.interval, "seed monitor started");
        while self.keep_running.load(Ordering::SeqCst) {
            if !self.state.wait_for_restart(self.interval) {
                continue;
            }
            if let Some(seed) = self.state.regenerate_seed() {
                self.events.emit(RelayEvent::SeedRegenerated { seed });
            }
        }
        debug!("seed monitor stopped");
    }
}
