// Test-only game peer for multiplayer integration tests.
//
// Wraps the real `NetClient` (from `minefield_relay::client`) with the bit of
// client-side state a game peer keeps: the board seed it is currently playing
// on, how many restarts it has seen, and the last view of everyone else. The
// board seed is initialized from the first reply and replaced whenever a
// reply carries a different seed, which is exactly how a real peer detects a
// restart.
//
// See also: `tests/full_pipeline.rs` for the scenarios.

use std::net::SocketAddr;
use std::thread;
use std::time::{Duration, Instant};

use minefield_protocol::{CellAction, Cursor, GamePhase, Record};
use minefield_relay::client::{Exchange, NetClient};

/// Default timeout for blocking waits.
pub const POLL_TIMEOUT: Duration = Duration::from_secs(5);

/// Sleep between polls in blocking waits.
pub const POLL_INTERVAL: Duration = Duration::from_millis(10);

pub struct TestPeer {
    client: NetClient,
    pub name: String,
    pub cursor: Cursor,
    pub phase: GamePhase,
    /// Seed the local board was generated from. `None` until the first reply.
    pub board_seed: Option<u32>,
    /// Number of times the board was regenerated after the first reply.
    pub restarts: usize,
    /// Every peer's record from the most recent reply.
    pub view: Vec<Record>,
}

impl TestPeer {
    pub fn connect(addr: SocketAddr, name: &str) -> Self {
        let client = NetClient::connect(addr).expect("TestPeer::connect failed");
        client
            .set_read_timeout(Some(POLL_TIMEOUT))
            .expect("set_read_timeout failed");
        Self {
            client,
            name: name.into(),
            cursor: Cursor::default(),
            phase: GamePhase::Start,
            board_seed: None,
            restarts: 0,
            view: Vec::new(),
        }
    }

    /// Move the cursor and perform a tile action.
    pub fn act(&mut self, x: f32, y: f32, action: CellAction) -> Exchange {
        self.cursor = Cursor::new(x, y);
        if self.phase == GamePhase::Start {
            self.phase = GamePhase::Playing;
        }
        self.send(Record::new(self.cursor, action, self.phase))
    }

    /// Report a lost game. The loss is reported once; afterwards the peer
    /// sits at the start screen until the new board arrives, so its polls do
    /// not keep requesting restarts.
    pub fn lose(&mut self) -> Exchange {
        let reply = self.send(Record::new(self.cursor, CellAction::Opened, GamePhase::Lose));
        self.phase = GamePhase::Start;
        reply
    }

    /// Send a no-op record to pull the latest view.
    pub fn poll(&mut self) -> Exchange {
        self.send(Record::poll(self.cursor, self.phase))
    }

    /// Poll until the board seed differs from `seed`.
    pub fn poll_until_seed_changes_from(&mut self, seed: u32) -> u32 {
        let start = Instant::now();
        loop {
            assert!(
                start.elapsed() < POLL_TIMEOUT,
                "{}: timed out waiting for seed to change from {seed}",
                self.name
            );
            let reply = self.poll();
            if reply.seed != seed {
                return reply.seed;
            }
            thread::sleep(POLL_INTERVAL);
        }
    }

    /// Poll until the view holds exactly `count` records.
    pub fn poll_until_view_len(&mut self, count: usize) {
        let start = Instant::now();
        loop {
            assert!(
                start.elapsed() < POLL_TIMEOUT,
                "{}: timed out waiting for {count} records, last view had {}",
                self.name,
                self.view.len()
            );
            if self.poll().records.len() == count {
                return;
            }
            thread::sleep(POLL_INTERVAL);
        }
    }

    pub fn disconnect(self) {
        self.client.disconnect();
    }

    fn send(&mut self, record: Record) -> Exchange {
        let reply = self
            .client
            .exchange(record)
            .unwrap_or_else(|e| panic!("{}: exchange failed: {e}", self.name));
        self.observe(&reply);
        reply
    }

    fn observe(&mut self, reply: &Exchange) {
        match self.board_seed {
            None => self.board_seed = Some(reply.seed),
            Some(current) if current != reply.seed => {
                self.board_seed = Some(reply.seed);
                self.restarts += 1;
                // A fresh board means a fresh game.
                self.phase = GamePhase::Start;
            }
            Some(_) => {}
        }
        self.view.clone_from(&reply.records);
    }
}
