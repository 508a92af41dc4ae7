// Blocking TCP client for talking to the relay.
//
// The relay protocol is strictly request/reply: the client writes one record,
// the relay answers with one counted batch holding every registered peer's
// latest record. `NetClient::exchange` does exactly one round trip on the
// calling thread. There is no background reader, since the relay never sends
// anything unprompted.
//
// Seed tracking: every reply header carries the authoritative seed. The
// client remembers the last seed it saw and reports when it changes, which is
// how a peer learns that the board was restarted. A peer initializes its board
// from the seed of its first reply.
//
// This lives in the relay crate because it depends only on std TCP and the
// protocol crate; tests and tools use it without any game code.

use std::io::{BufReader, BufWriter};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::time::Duration;

use minefield_protocol::{CodecError, GamePhase, Record, read_batch, write_record};

/// Result of one request/reply round trip.
#[derive(Clone, Debug, PartialEq)]
pub struct Exchange {
    /// Every registered peer's latest record, this client's included.
    pub records: Vec<Record>,
    /// Authoritative seed at the instant the relay took the snapshot.
    pub seed: u32,
    /// True when `seed` differs from the seed seen on the previous exchange.
    /// Always false on the first exchange.
    pub seed_changed: bool,
}

pub struct NetClient {
    reader: BufReader<TcpStream>,
    writer: BufWriter<TcpStream>,
    last_seed: Option<u32>,
    last_sent: Record,
}

impl NetClient {
    pub fn connect<A: ToSocketAddrs>(addr: A) -> Result<Self, CodecError> {
        let stream = TcpStream::connect(addr)?;
        stream.set_nodelay(true).ok();
        let reader = BufReader::new(stream.try_clone()?);
        Ok(Self {
            reader,
            writer: BufWriter::new(stream),
            last_seed: None,
            last_sent: Record::default(),
        })
    }

    /// Bound how long `exchange` may block waiting for a reply.
    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> Result<(), CodecError> {
        self.reader.get_ref().set_read_timeout(timeout)?;
        Ok(())
    }

    /// Send one record and read the relay's snapshot reply.
    pub fn exchange(&mut self, record: Record) -> Result<Exchange, CodecError> {
        write_record(&mut self.writer, &record)?;
        self.last_sent = record;
        let batch = read_batch(&mut self.reader)?;

        let seed_changed = self.last_seed.is_some_and(|previous| previous != batch.seed);
        self.last_seed = Some(batch.seed);
        Ok(Exchange {
            records: batch.records,
            seed: batch.seed,
            seed_changed,
        })
    }

    /// Poll for updates with a no-op record that repeats the last cursor
    /// and phase sent.
    ///
    /// A loss is reported once: after sending `GamePhase::Lose` the poll
    /// carries `GamePhase::Start`, so idle polling never requests another
    /// restart.
    pub fn poll(&mut self) -> Result<Exchange, CodecError> {
        let phase = match self.last_sent.phase {
            GamePhase::Lose => GamePhase::Start,
            phase => phase,
        };
        self.exchange(Record::poll(self.last_sent.cursor, phase))
    }

    /// Last authoritative seed seen, `None` before the first exchange.
    pub fn seed(&self) -> Option<u32> {
        self.last_seed
    }

    /// Close both directions of the connection.
    pub fn disconnect(self) {
        let _ = self.reader.get_ref().shutdown(Shutdown::Both);
    }
}
