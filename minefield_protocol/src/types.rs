// Core value types carried inside a wire record.
//
// `CellAction` and `GamePhase` have fixed integer discriminants because those
// integers are what travels on the wire (see `record.rs`). Converting back
// from the wire is fallible: an unknown discriminant is a decode error, not a
// silently-accepted garbage value.

use serde::{Deserialize, Serialize};

use crate::error::CodecError;

/// A peer's cursor position on the shared board, in board coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Cursor {
    pub x: f32,
    pub y: f32,
}

impl Cursor {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// The tile action a peer performed this tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i8)]
pub enum CellAction {
    /// No tile action this tick. Used by idle peers to poll for updates.
    #[default]
    None = -1,
    Opened = 0,
    Clear = 1,
    Flagged = 2,
    Questioned = 3,
}

impl CellAction {
    pub fn to_wire(self) -> i8 {
        self as i8
    }

    pub fn from_wire(value: i8) -> Result<Self, CodecError> {
        match value {
            -1 => Ok(Self::None),
            0 => Ok(Self::Opened),
            1 => Ok(Self::Clear),
            2 => Ok(Self::Flagged),
            3 => Ok(Self::Questioned),
            other => Err(CodecError::UnknownAction(other)),
        }
    }

    /// True for every action except `None`.
    pub fn is_action(self) -> bool {
        self != Self::None
    }
}

/// Game-outcome state reported by a peer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum GamePhase {
    #[default]
    Start = 0,
    Playing = 1,
    Win = 2,
    /// A peer hit a mine. Seeing this asks the relay for a fresh board seed.
    Lose = 3,
}

impl GamePhase {
    pub fn to_wire(self) -> u8 {
        self as u8
    }

    pub fn from_wire(value: u8) -> Result<Self, CodecError> {
        match value {
            0 => Ok(Self::Start),
            1 => Ok(Self::Playing),
            2 => Ok(Self::Win),
            3 => Ok(Self::Lose),
            other => Err(CodecError::UnknownPhase(other)),
        }
    }
}
