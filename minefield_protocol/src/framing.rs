// Record framing over a byte stream.
//
// Peer → relay: exactly one record (`RECORD_SIZE` bytes), no prefix. The
// record size alone is the framing unit.
//
// Relay → peer: a batch. An 8-byte header
//
//   [version: u8][reserved: u8][count: u16][seed: u32]   (big-endian)
//
// followed by `count` records back to back. The explicit count means a reader
// never has to infer the batch size from how many bytes one `read()` call
// happened to return; TCP is free to split or merge segments. The header seed
// is the authoritative seed at the instant the batch was taken. Records of
// peers that have not sent since a restart still carry the seed they were
// stamped with, so a reader must take the seed from the header.
//
// All functions operate on `std::io::Read`/`Write`, so they work equally on a
// raw `TcpStream`, a `BufReader`/`BufWriter`, or an in-memory `Cursor`.

use std::io::{Read, Write};

use crate::error::CodecError;
use crate::record::{PROTOCOL_VERSION, RECORD_SIZE, Record};

/// Size of the batch header in bytes.
pub const BATCH_HEADER_SIZE: usize = 8;

/// Largest batch the header can describe.
pub const MAX_BATCH_RECORDS: usize = u16::MAX as usize;

/// One relay reply: the authoritative seed plus every registered record.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Batch {
    pub seed: u32,
    pub records: Vec<Record>,
}

impl Batch {
    pub fn new(seed: u32, records: Vec<Record>) -> Self {
        Self { seed, records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Write a single record and flush.
pub fn write_record<W: Write>(writer: &mut W, record: &Record) -> Result<(), CodecError> {
    writer.write_all(&record.encode())?;
    writer.flush()?;
    Ok(())
}

/// Read exactly one record.
///
/// A stream that ends before a full record arrives yields an `Io` error of kind
/// `UnexpectedEof`, whether zero or some bytes of the record were received.
pub fn read_record<R: Read>(reader: &mut R) -> Result<Record, CodecError> {
    let mut buf = [0u8; RECORD_SIZE];
    reader.read_exact(&mut buf)?;
    Record::decode(&buf)
}

/// Encode a batch (header + records) into one contiguous buffer.
pub fn encode_batch(batch: &Batch) -> Result<Vec<u8>, CodecError> {
    let records = &batch.records;
    let count = u16::try_from(records.len()).map_err(|_| CodecError::BatchTooLarge {
        count: records.len(),
        max: MAX_BATCH_RECORDS,
    })?;
    let mut buf = Vec::with_capacity(BATCH_HEADER_SIZE + records.len() * RECORD_SIZE);
    buf.push(PROTOCOL_VERSION);
    buf.push(0);
    buf.extend_from_slice(&count.to_be_bytes());
    buf.extend_from_slice(&batch.seed.to_be_bytes());
    for record in records {
        buf.extend_from_slice(&record.encode());
    }
    Ok(buf)
}

/// Write a batch in a single `write_all` and flush.
pub fn write_batch<W: Write>(writer: &mut W, batch: &Batch) -> Result<(), CodecError> {
    let buf = encode_batch(batch)?;
    writer.write_all(&buf)?;
    writer.flush()?;
    Ok(())
}

/// Read one batch: header, then exactly `count` records.
pub fn read_batch<R: Read>(reader: &mut R) -> Result<Batch, CodecError> {
    let mut header = [0u8; BATCH_HEADER_SIZE];
    reader.read_exact(&mut header)?;
    if header[0] != PROTOCOL_VERSION {
        return Err(CodecError::VersionMismatch {
            expected: PROTOCOL_VERSION,
            found: header[0],
        });
    }
    let count = usize::from(u16::from_be_bytes([header[2], header[3]]));
    let seed = u32::from_be_bytes([header[4], header[5], header[6], header[7]]);

    let mut records = Vec::with_capacity(count);
    let mut buf = [0u8; RECORD_SIZE];
    for _ in 0..count {
        reader.read_exact(&mut buf)?;
        records.push(Record::decode(&buf)?);
    }
    Ok(Batch { seed, records })
}
