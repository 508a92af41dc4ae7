// Decode and framing errors for the wire protocol.

use std::io;

use thiserror::Error;

/// Everything that can go wrong reading or writing protocol bytes.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    #[error("protocol version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u8, found: u8 },

    #[error("unknown cell action discriminant {0}")]
    UnknownAction(i8),

    #[error("unknown game phase discriminant {0}")]
    UnknownPhase(u8),

    #[error("batch of {count} records exceeds the maximum of {max}")]
    BatchTooLarge { count: usize, max: usize },
}

impl CodecError {
    /// True when the underlying stream ended (cleanly or mid-record). The
    /// relay treats this the same as any other read failure, but clients and
    /// tests sometimes want to tell "peer went away" from "peer sent junk".
    pub fn is_eof(&self) -> bool {
        matches!(self, Self::Io(e) if e.kind() == io::ErrorKind::UnexpectedEof)
    }
}
