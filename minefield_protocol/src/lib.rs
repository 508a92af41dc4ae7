// minefield_protocol — wire protocol for the Minefield state relay.
//
// This crate defines the record layout and framing used by the relay
// (`minefield_relay`) and game peers to exchange cursor/action/phase state
// over TCP. It is shared between both sides and knows nothing about sockets,
// threads, or the registry.
//
// Module overview:
// - `types.rs`:    Value types carried in a record — `Cursor`, `CellAction`,
//                  `GamePhase` — with their fixed wire discriminants.
// - `record.rs`:   `Record`, its 16-byte big-endian versioned encoding, and
//                  `PROTOCOL_VERSION` / `RECORD_SIZE`.
// - `framing.rs`:  Reading/writing single records (peer → relay) and counted,
//                  seed-stamped batches (relay → peer) over any `Read`/`Write`.
// - `error.rs`:    `CodecError`.
//
// Design decisions:
// - **Fixed-size binary records.** Every record is exactly `RECORD_SIZE`
//   bytes, so a request needs no length prefix.
// - **Counted replies.** A reply may hold many records; the batch header
//   carries the count explicitly instead of leaving it to be inferred from
//   however many bytes a single socket read returned. It also carries the
//   authoritative seed, since other peers' records may predate a restart.
// - **No async runtime.** Uses `std::io::Read`/`Write` only.

pub mod error;
pub mod framing;
pub mod record;
pub mod types;

pub use error::CodecError;
pub use framing::{
    BATCH_HEADER_SIZE, Batch, MAX_BATCH_RECORDS, encode_batch, read_batch, read_record,
    write_batch, write_record,
};
pub use record::{PROTOCOL_VERSION, RECORD_SIZE, Record};
pub use types::{CellAction, Cursor, GamePhase};
