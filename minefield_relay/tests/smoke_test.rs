// Integration smoke tests for the relay server.
//
// Each test starts a relay on a random localhost port and drives it with
// real TCP peers: `NetClient` for well-behaved peers, raw `TcpStream`s for
// peers that send malformed bytes. Covers the snapshot reply, capacity
// rejection, seed restart propagation, disconnect cleanup, and malformed or
// oversized payload handling.

use std::io::{Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::thread;
use std::time::{Duration, Instant};

use minefield_protocol::{BATCH_HEADER_SIZE, CellAction, Cursor, GamePhase, RECORD_SIZE, Record};
use minefield_relay::client::NetClient;
use minefield_relay::{RelayConfig, RelayHandle, start_relay};

const TIMEOUT: Duration = Duration::from_secs(5);

fn start(max_clients: usize) -> (RelayHandle, SocketAddr) {
    start_with(RelayConfig {
        max_clients,
        ..test_config()
    })
}

fn start_with(config: RelayConfig) -> (RelayHandle, SocketAddr) {
    start_relay(config).unwrap()
}

fn test_config() -> RelayConfig {
    RelayConfig {
        bind_address: "127.0.0.1".into(),
        port: 0,
        monitor_interval_ms: 20,
        ..RelayConfig::default()
    }
}

/// Poll `cond` until it holds, failing the test after `TIMEOUT`.
fn wait_until(what: &str, mut cond: impl FnMut() -> bool) {
    let start = Instant::now();
    while !cond() {
        assert!(start.elapsed() < TIMEOUT, "timed out waiting for {what}");
        thread::sleep(Duration::from_millis(5));
    }
}

/// Connect a peer and wait until the relay has registered it.
fn connect(handle: &RelayHandle, addr: SocketAddr) -> NetClient {
    let expected = handle.client_count() + 1;
    let client = NetClient::connect(addr).unwrap();
    client.set_read_timeout(Some(TIMEOUT)).unwrap();
    wait_until("peer admission", || handle.client_count() == expected);
    client
}

fn playing(x: f32, y: f32, action: CellAction) -> Record {
    Record::new(Cursor::new(x, y), action, GamePhase::Playing)
}

#[test]
fn two_peers_see_each_other() {
    let (handle, addr) = start(4);
    let mut a = connect(&handle, addr);
    let _b = connect(&handle, addr);

    let sent = playing(1.0, 2.0, CellAction::Opened).with_seed(0xDEAD);
    let reply = a.exchange(sent).unwrap();

    assert_eq!(reply.records.len(), 2);
    let stamped = sent.with_seed(handle.seed());
    assert!(reply.records.contains(&stamped), "A's own stamped record");
    assert!(
        reply.records.contains(&Record::default()),
        "B's default idle record"
    );
    assert_eq!(reply.seed, handle.seed());
    assert!(!reply.seed_changed);

    handle.stop();
}

#[test]
fn peer_updates_are_pulled_not_pushed() {
    let (handle, addr) = start(4);
    let mut a = connect(&handle, addr);
    let mut b = connect(&handle, addr);

    let moved = playing(7.0, 8.0, CellAction::Flagged);
    a.exchange(moved).unwrap();

    // B only learns about A's move when B itself sends something.
    let reply = b.poll().unwrap();
    assert_eq!(reply.records.len(), 2);
    assert!(reply.records.contains(&moved.with_seed(handle.seed())));

    handle.stop();
}

#[test]
fn connection_beyond_capacity_is_closed() {
    let (handle, addr) = start(2);
    let mut a = connect(&handle, addr);
    let _b = connect(&handle, addr);

    let mut extra = NetClient::connect(addr).unwrap();
    extra.set_read_timeout(Some(TIMEOUT)).unwrap();
    wait_until("rejection event", || {
        handle.events().iter().any(|l| l.contains("relay full"))
    });
    assert!(
        extra.exchange(Record::default()).is_err(),
        "rejected peer gets no reply"
    );
    assert_eq!(handle.client_count(), 2);

    let reply = a.poll().unwrap();
    assert_eq!(reply.records.len(), 2, "rejected peer never appears");

    handle.stop();
}

#[test]
fn lose_restarts_seed_for_everyone() {
    let (handle, addr) = start(4);
    let mut a = connect(&handle, addr);
    let mut b = connect(&handle, addr);

    let before = b.poll().unwrap().seed;
    assert_eq!(b.seed(), Some(before));

    let lose = Record::new(Cursor::new(3.0, 3.0), CellAction::Opened, GamePhase::Lose);
    let reply = a.exchange(lose).unwrap();
    assert_eq!(reply.seed, before, "stamped before the monitor runs");

    wait_until("seed regeneration", || handle.seed() != before);
    let after = handle.seed();

    let reply = b.poll().unwrap();
    assert_eq!(reply.seed, after);
    assert!(reply.seed_changed);
    // A has not sent since its loss, so its record still carries the old seed.
    assert!(reply.records.iter().any(|r| r.seed == after));
    assert!(reply.records.iter().all(|r| r.seed == after || r.seed == before));

    assert!(
        handle
            .events()
            .iter()
            .any(|l| l == &format!("seed restart {after}"))
    );

    // Once observed, the new seed sticks.
    for _ in 0..5 {
        assert_eq!(b.poll().unwrap().seed, after);
    }

    handle.stop();
}

#[test]
fn polling_after_a_loss_restarts_only_once() {
    let (handle, addr) = start(4);
    let mut a = connect(&handle, addr);

    let before = a.poll().unwrap().seed;
    let lose = Record::new(Cursor::new(2.0, 2.0), CellAction::Opened, GamePhase::Lose);
    a.exchange(lose).unwrap();
    wait_until("seed regeneration", || handle.seed() != before);

    // Several monitor intervals pass between polls; a repeated Lose would
    // reseed every time.
    let mut seeds = Vec::new();
    for _ in 0..6 {
        thread::sleep(Duration::from_millis(60));
        seeds.push(a.poll().unwrap().seed);
    }
    assert!(seeds.iter().all(|s| *s == seeds[0]), "seeds: {seeds:?}");
    assert_ne!(seeds[0], before);
    let restarts = handle
        .events()
        .iter()
        .filter(|l| l.starts_with("seed restart"))
        .count();
    assert_eq!(restarts, 1);

    handle.stop();
}

#[test]
fn disconnect_removes_peer_and_logs() {
    let (handle, addr) = start(4);
    let a = connect(&handle, addr);
    let mut b = connect(&handle, addr);
    assert_eq!(b.poll().unwrap().records.len(), 2);

    a.disconnect();
    wait_until("peer removal", || handle.client_count() == 1);

    let reply = b.poll().unwrap();
    assert_eq!(reply.records.len(), 1);
    assert!(
        handle
            .events()
            .iter()
            .any(|l| l == "peer #0 connection closed"),
        "events: {:?}",
        handle.events()
    );

    handle.stop();
}

#[test]
fn short_payload_is_treated_as_disconnect() {
    let (handle, addr) = start(4);
    let mut b = connect(&handle, addr);

    let mut raw = TcpStream::connect(addr).unwrap();
    wait_until("raw peer admission", || handle.client_count() == 2);
    let bytes = playing(1.0, 1.0, CellAction::Opened).encode();
    raw.write_all(&bytes[..RECORD_SIZE / 2]).unwrap();
    raw.shutdown(Shutdown::Write).unwrap();

    wait_until("malformed peer removal", || handle.client_count() == 1);
    raw.set_read_timeout(Some(TIMEOUT)).unwrap();
    let mut buf = Vec::new();
    let _ = raw.read_to_end(&mut buf);
    assert!(buf.is_empty(), "no reply for a partial record");

    // The relay keeps serving everyone else.
    assert_eq!(b.poll().unwrap().records.len(), 1);

    handle.stop();
}

#[test]
fn oversized_payload_does_not_disturb_other_peers() {
    let (handle, addr) = start(4);
    let mut b = connect(&handle, addr);

    let mut raw = TcpStream::connect(addr).unwrap();
    raw.set_read_timeout(Some(TIMEOUT)).unwrap();
    wait_until("raw peer admission", || handle.client_count() == 2);

    // One full record followed by four stray bytes, 20 bytes in total.
    let mut payload = playing(4.0, 4.0, CellAction::Clear).encode().to_vec();
    payload.extend_from_slice(&[0; 4]);
    raw.write_all(&payload).unwrap();

    // The complete record is answered like any other.
    let mut reply = vec![0u8; BATCH_HEADER_SIZE + 2 * RECORD_SIZE];
    raw.read_exact(&mut reply).unwrap();
    assert_eq!(u16::from_be_bytes([reply[2], reply[3]]), 2);

    let reply = b.poll().unwrap();
    assert_eq!(reply.records.len(), 2);
    assert!(
        reply
            .records
            .iter()
            .any(|r| r.action == CellAction::Clear && r.cursor.x == 4.0)
    );

    // The leftover partial record ends the connection once the peer hangs up.
    raw.shutdown(Shutdown::Write).unwrap();
    wait_until("oversized peer removal", || handle.client_count() == 1);
    assert_eq!(b.poll().unwrap().records.len(), 1);

    handle.stop();
}

#[test]
fn garbage_record_is_treated_as_disconnect() {
    let (handle, addr) = start(4);
    let mut b = connect(&handle, addr);

    let mut raw = TcpStream::connect(addr).unwrap();
    wait_until("raw peer admission", || handle.client_count() == 2);
    raw.write_all(&[0xEE; RECORD_SIZE]).unwrap();

    wait_until("garbage peer removal", || handle.client_count() == 1);
    assert_eq!(b.poll().unwrap().records.len(), 1);

    handle.stop();
}

#[test]
fn reseed_on_join_changes_seed_when_peer_arrives() {
    let (handle, addr) = start_with(RelayConfig {
        reseed_on_join: true,
        ..test_config()
    });
    let mut a = connect(&handle, addr);
    wait_until("first join reseed", || {
        handle.events().iter().any(|l| l.starts_with("seed restart"))
    });
    let first = a.poll().unwrap().seed;

    let _b = connect(&handle, addr);
    wait_until("second join reseed", || handle.seed() != first);
    let reply = a.poll().unwrap();
    assert!(reply.seed_changed);

    handle.stop();
}

#[test]
fn bind_failure_is_reported() {
    let (handle, addr) = start(1);
    let err = start_relay(RelayConfig {
        port: addr.port(),
        ..test_config()
    });
    assert!(matches!(
        err,
        Err(minefield_relay::RelayError::Bind { .. })
    ));
    handle.stop();
}
