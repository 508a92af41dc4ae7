// The fixed-size state record exchanged between peers and the relay.
//
// Layout (16 bytes, all multi-byte fields big-endian):
//
//   offset  size  field
//   0       1     protocol version (PROTOCOL_VERSION)
//   1       1     action   (i8, CellAction discriminant)
//   2       1     phase    (u8, GamePhase discriminant)
//   3       1     reserved (written as 0, ignored on read)
//   4       4     cursor.x (f32 bits)
//   8       4     cursor.y (f32 bits)
//   12      4     seed     (u32)
//
// The byte order is fixed so peers built for different architectures agree on
// the layout. There is no checksum: bytes that happen to carry a valid version
// and valid discriminants decode as a legitimate record.

use serde::{Deserialize, Serialize};

use crate::error::CodecError;
use crate::types::{CellAction, Cursor, GamePhase};

/// Current wire protocol version. Bumped whenever the record layout changes.
pub const PROTOCOL_VERSION: u8 = 1;

/// Encoded size of one `Record` in bytes.
pub const RECORD_SIZE: usize = 16;

/// One peer's state for one tick.
///
/// `Record::default()` is the idle record a freshly admitted peer is
/// registered with: cursor at the origin, no action, seed 0, phase `Start`.
/// Its action byte is `0xFF` (`CellAction::None`), not zero.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub cursor: Cursor,
    pub action: CellAction,
    pub seed: u32,
    pub phase: GamePhase,
}

impl Record {
    pub fn new(cursor: Cursor, action: CellAction, phase: GamePhase) -> Self {
        Self {
            cursor,
            action,
            seed: 0,
            phase,
        }
    }

    /// A no-op record used to poll for updates without acting.
    pub fn poll(cursor: Cursor, phase: GamePhase) -> Self {
        Self::new(cursor, CellAction::None, phase)
    }

    /// Return a copy with the seed field replaced.
    pub fn with_seed(mut self, seed: u32) -> Self {
        self.seed = seed;
        self
    }

    pub fn encode(&self) -> [u8; RECORD_SIZE] {
        let mut buf = [0u8; RECORD_SIZE];
        buf[0] = PROTOCOL_VERSION;
        buf[1] = self.action.to_wire().to_be_bytes()[0];
        buf[2] = self.phase.to_wire();
        buf[4..8].copy_from_slice(&self.cursor.x.to_be_bytes());
        buf[8..12].copy_from_slice(&self.cursor.y.to_be_bytes());
        buf[12..16].copy_from_slice(&self.seed.to_be_bytes());
        buf
    }

    pub fn decode(buf: &[u8; RECORD_SIZE]) -> Result<Self, CodecError> {
        if buf[0] != PROTOCOL_VERSION {
            return Err(CodecError::VersionMismatch {
                expected: PROTOCOL_VERSION,
                found: buf[0],
            });
        }
        let action = CellAction::from_wire(i8::from_be_bytes([buf[1]]))?;
        let phase = GamePhase::from_wire(buf[2])?;
        let x = f32::from_be_bytes([buf[4], buf[5], buf[6], buf[7]]);
        let y = f32::from_be_bytes([buf[8], buf[9], buf[10], buf[11]]);
        let seed = u32::from_be_bytes([buf[12], buf[13], buf[14], buf[15]]);
        Ok(Self {
            cursor: Cursor { x, y },
            action,
            seed,
            phase,
        })
    }
}
