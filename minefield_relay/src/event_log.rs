// Relay events and the bounded log display they feed.
//
// Every significant relay event (peer connected, peer rejected, peer
// disconnected, seed regenerated, accept failure) is emitted twice:
// - as a structured `tracing` event, for whatever subscriber the host process
//   installed (see `main.rs`);
// - as a short formatted line appended to an `EventLog`, a bounded
//   append-only display that evicts its oldest line when full. A UI or
//   console front-end reads it via `EventRecorder::lines`.
//
// The log has its own mutex, separate from the registry/session lock, so
// emitting an event never extends the registry critical section.

use std::collections::VecDeque;
use std::fmt;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{info, warn};

use crate::registry::ConnectionId;

/// Something worth telling the operator about.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RelayEvent {
    Listening { addr: SocketAddr },
    PeerConnected { id: ConnectionId, addr: SocketAddr },
    PeerRejected { addr: SocketAddr, capacity: usize },
    PeerDisconnected { id: ConnectionId },
    SeedRegenerated { seed: u32 },
    AcceptFailed { reason: String },
}

impl fmt::Display for RelayEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Listening { addr } => write!(f, "listening on {addr}"),
            Self::PeerConnected { id, addr } => write!(f, "peer {id} connected from {addr}"),
            Self::PeerRejected { addr, capacity } => {
                write!(f, "rejected {addr}: relay full ({capacity} peers)")
            }
            Self::PeerDisconnected { id } => write!(f, "peer {id} connection closed"),
            Self::SeedRegenerated { seed } => write!(f, "seed restart {seed}"),
            Self::AcceptFailed { reason } => write!(f, "accept failed: {reason}"),
        }
    }
}

/// Bounded append-only list of display lines. Oldest lines are evicted first.
pub struct EventLog {
    lines: VecDeque<String>,
    capacity: usize,
}

impl EventLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            lines: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, line: String) {
        if self.capacity == 0 {
            return;
        }
        while self.lines.len() >= self.capacity {
            self.lines.pop_front();
        }
        self.lines.push_back(line);
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Cloneable handle shared by the acceptor, handlers, and monitor.
#[derive(Clone)]
pub struct EventRecorder {
    log: Arc<Mutex<EventLog>>,
}

impl EventRecorder {
    pub fn new(capacity: usize) -> Self {
        Self {
            log: Arc::new(Mutex::new(EventLog::new(capacity))),
        }
    }

    /// Trace the event and append its display line to the log.
    pub fn emit(&self, event: RelayEvent) {
        match &event {
            RelayEvent::Listening { addr } => info!(%addr, "relay listening"),
            RelayEvent::PeerConnected { id, addr } => info!(%id, %addr, "peer connected"),
            RelayEvent::PeerRejected { addr, capacity } => {
                warn!(%addr, capacity, "peer rejected, relay full")
            }
            RelayEvent::PeerDisconnected { id } => info!(%id, "connection closed"),
            RelayEvent::SeedRegenerated { seed } => info!(seed, "seed regenerated"),
            RelayEvent::AcceptFailed { reason } => warn!(%reason, "accept failed"),
        }
        let line = event.to_string();
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(line);
    }

    /// Copy of the current display lines, oldest first.
    pub fn lines(&self) -> Vec<String> {
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .lines()
            .map(str::to_owned)
            .collect()
    }
}
