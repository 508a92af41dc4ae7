// TCP acceptor and relay lifecycle.
//
// Architecture: thread-per-connection around one shared, lock-protected
// state.
//
// - **Acceptor thread** (`TcpListener::accept()` loop): assigns each new
//   connection a `ConnectionId`, admits it into the registry, and spawns a
//   detached handler thread. A connection that would exceed `max_clients` is
//   closed on the spot without touching the registry.
// - **Handler threads** (one per peer, see `handler.rs`): blocking
//   read → update/snapshot → reply loop. Each handler is the only reader and
//   the only writer of its own `TcpStream`.
// - **Seed monitor thread** (see `monitor.rs`): regenerates the shared seed
//   when a restart is requested.
//
// All three share an `Arc<SharedState>` (registry + session under one mutex)
// and an `EventRecorder` for the event log.
//
// Shutdown: `RelayHandle::stop` clears `keep_running`, wakes the monitor, and
// joins the acceptor and monitor threads. Handler threads notice the flag
// after their next record; a peer that never sends again keeps its handler
// blocked until it disconnects.

use std::io;
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use tracing::warn;

use crate::config::RelayConfig;
use crate::error::RelayError;
use crate::event_log::{EventRecorder, RelayEvent};
use crate::handler::ConnectionHandler;
use crate::monitor::SeedMonitor;
use crate::registry::ConnectionId;
use crate::session::time_seed;
use crate::shared::SharedState;

/// How long the acceptor sleeps when no connection is pending.
const ACCEPT_POLL: Duration = Duration::from_millis(20);

/// Handle returned by `start_relay` to observe and control the running relay.
pub struct RelayHandle {
    keep_running: Arc<AtomicBool>,
    state: Arc<SharedState>,
    events: EventRecorder,
    threads: Vec<thread::JoinHandle<()>>,
}

impl RelayHandle {
    /// Signal the relay to stop and wait for the acceptor and monitor threads.
    pub fn stop(self) {
        self.keep_running.store(false, Ordering::SeqCst);
        self.state.wake_all();
        for handle in self.threads {
            let _ = handle.join();
        }
    }

    /// Block the calling thread until the relay's background threads exit.
    pub fn wait(self) {
        for handle in self.threads {
            let _ = handle.join();
        }
    }

    /// Current event log lines, oldest first.
    pub fn events(&self) -> Vec<String> {
        self.events.lines()
    }

    /// Current authoritative seed.
    pub fn seed(&self) -> u32 {
        self.state.seed()
    }

    /// Number of registered peers.
    pub fn client_count(&self) -> usize {
        self.state.client_count()
    }
}

/// Start the relay on background threads. Returns a handle for stopping it
/// and the actual bound address (useful when port 0 is used to let the OS
/// pick a free port).
///
/// Fails if the configuration is invalid or the listener cannot be bound;
/// those are the only fatal errors.
pub fn start_relay(config: RelayConfig) -> Result<(RelayHandle, SocketAddr), RelayError> {
    config.validate()?;

    let listen_addr = config.listen_addr();
    let listener = TcpListener::bind(&listen_addr).map_err(|source| RelayError::Bind {
        addr: listen_addr.clone(),
        source,
    })?;
    let addr = listener.local_addr()?;
    // Non-blocking so the acceptor can observe `keep_running` between polls.
    listener.set_nonblocking(true)?;

    let keep_running = Arc::new(AtomicBool::new(true));
    let state = Arc::new(SharedState::new(config.max_clients, time_seed()));
    let events = EventRecorder::new(config.event_log_capacity);
    events.emit(RelayEvent::Listening { addr });

    let monitor = SeedMonitor {
        state: Arc::clone(&state),
        events: events.clone(),
        interval: config.monitor_interval(),
        keep_running: Arc::clone(&keep_running),
    };
    let monitor_thread = thread::Builder::new()
        .name("minefield-seed-monitor".into())
        .spawn(move || monitor.run())?;

    let acceptor = Acceptor {
        listener,
        state: Arc::clone(&state),
        events: events.clone(),
        keep_running: Arc::clone(&keep_running),
        reseed_on_join: config.reseed_on_join,
        next_id: 0,
    };
    let acceptor_thread = match thread::Builder::new()
        .name("minefield-acceptor".into())
        .spawn(move || acceptor.run())
    {
        Ok(handle) => handle,
        Err(e) => {
            keep_running.store(false, Ordering::SeqCst);
            state.wake_all();
            let _ = monitor_thread.join();
            return Err(e.into());
        }
    };

    Ok((
        RelayHandle {
            keep_running,
            state,
            events,
            threads: vec![acceptor_thread, monitor_thread],
        },
        addr,
    ))
}

struct Acceptor {
    listener: TcpListener,
    state: Arc<SharedState>,
    events: EventRecorder,
    keep_running: Arc<AtomicBool>,
    reseed_on_join: bool,
    next_id: u64,
}

impl Acceptor {
    fn run(mut self) {
        while self.keep_running.load(Ordering::SeqCst) {
            match self.listener.accept() {
                Ok((stream, addr)) => self.admit(stream, addr),
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => {
                    thread::sleep(ACCEPT_POLL);
                }
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => {
                    // Typically fd exhaustion; keep listening.
                    self.events.emit(RelayEvent::AcceptFailed {
                        reason: e.to_string(),
                    });
                    thread::sleep(ACCEPT_POLL);
                }
            }
        }
    }

    /// Admit one accepted connection, or close it if the registry is full.
    fn admit(&mut self, stream: TcpStream, addr: SocketAddr) {
        let id = ConnectionId(self.next_id);
        self.next_id += 1;

        if !self.state.admit(id) {
            self.events.emit(RelayEvent::PeerRejected {
                addr,
                capacity: self.state.capacity(),
            });
            let _ = stream.shutdown(Shutdown::Both);
            return;
        }

        // Accepted sockets may inherit the listener's non-blocking mode.
        if let Err(e) = stream.set_nonblocking(false) {
            warn!(%id, error = %e, "failed to make stream blocking");
            self.state.remove(id);
            return;
        }
        stream.set_nodelay(true).ok();

        self.events.emit(RelayEvent::PeerConnected { id, addr });
        if self.reseed_on_join {
            self.state.request_restart();
        }

        let handler = ConnectionHandler {
            id,
            stream,
            state: Arc::clone(&self.state),
            events: self.events.clone(),
            keep_running: Arc::clone(&self.keep_running),
        };
        if let Err(e) = thread::Builder::new()
            .name(format!("minefield-peer-{}", id.0))
            .spawn(move || handler.run())
        {
            warn!(%id, error = %e, "failed to spawn handler thread");
            self.state.remove(id);
        }
    }
}
