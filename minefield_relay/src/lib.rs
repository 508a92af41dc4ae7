// minefield_relay — multiplayer state relay and seed coordinator.
//
// The relay is a thin state mirror for a shared minesweeper-style board. Each
// peer periodically sends its cursor, last tile action, and game phase; the
// relay stores it and answers with every peer's latest record, stamped with
// one process-wide board seed. When any peer reports a loss, the relay picks a
// new seed and every peer picks it up on its next exchange. The relay never
// runs game logic.
//
// Module overview:
// - `registry.rs`:  `Registry` — capacity-bounded map of `ConnectionId` to
//                   latest record, with atomic update-and-snapshot.
// - `session.rs`:   `SessionState` — authoritative seed and restart flag,
//                   plus time-derived seed generation.
// - `shared.rs`:    `SharedState` — registry and session behind one mutex,
//                   and the condvar the seed monitor sleeps on.
// - `handler.rs`:   Per-connection receive → update → reply loop.
// - `monitor.rs`:   Seed restart monitor thread.
// - `server.rs`:    TCP acceptor, capacity enforcement, `start_relay`.
// - `event_log.rs`: `RelayEvent` tracing plus a bounded display log.
// - `config.rs`:    `RelayConfig` defaults, validation, JSON loading.
// - `client.rs`:    Blocking `NetClient` for peers, tests, and tools.
// - `error.rs`:     `RelayError`.
//
// Dependencies: `minefield_protocol` (record layout and framing). The relay
// can run as a standalone binary (`main.rs`) or be embedded via `start_relay`.

pub mod client;
pub mod config;
pub mod error;
pub mod event_log;
pub mod handler;
pub mod monitor;
pub mod registry;
pub mod server;
pub mod session;
pub mod shared;

pub use config::RelayConfig;
pub use error::RelayError;
pub use registry::ConnectionId;
pub use server::{RelayHandle, start_relay};
