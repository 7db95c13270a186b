//! Moves between grid configurations
//!
//! Every move is atomic and has an inverse that is itself a move, which is
//! what lets the generator scramble a solved grid and treat the reversed
//! scramble as a known (if not optimal) solution.

use crate::core::GridPosition;
use crate::{PuzzleError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Move {
    /// Exchange the symbols of two adjacent tiles (`a < b` always)
    Swap { a: GridPosition, b: GridPosition },
    /// Step one tile's symbol forward or backward through the alphabet
    Cycle { position: GridPosition, forward: bool },
}

impl Move {
    /// Build a swap; the order of the two positions does not matter
    pub fn swap(a: GridPosition, b: GridPosition) -> Self {
        if a <= b {
            Move::Swap { a, b }
        } else {
            Move::Swap { a: b, b: a }
        }
    }

    pub fn cycle(position: GridPosition, forward: bool) -> Self {
        Move::Cycle { position, forward }
    }

    /// The move that undoes this one
    pub fn inverse(&self) -> Move {
        match *self {
            Move::Swap { a, b } => Move::Swap { a, b },
            Move::Cycle { position, forward } => Move::Cycle {
                position,
                forward: !forward,
            },
        }
    }

    /// The representative of this move's effect on a grid of `alphabet` symbols
    ///
    /// With two symbols both cycle directions flip the tile the same way,
    /// so backward cycles collapse onto forward ones.
    pub fn canonical(&self, alphabet: u8) -> Move {
        match *self {
            Move::Cycle { position, .. } if alphabet <= 2 => Move::Cycle {
                position,
                forward: true,
            },
            mv => mv,
        }
    }

    /// Positions whose symbol this move changes
    pub fn positions(&self) -> impl Iterator<Item = GridPosition> {
        let (first, second) = match *self {
            Move::Swap { a, b } => (a, Some(b)),
            Move::Cycle { position, .. } => (position, None),
        };
        std::iter::once(first).chain(second)
    }

    pub fn touches(&self, position: GridPosition) -> bool {
        self.positions().any(|p| p == position)
    }

    /// Compact text form: `S r,c r,c`, `C+ r,c` or `C- r,c`
    pub fn encode(&self) -> String {
        self.to_string()
    }

    pub fn parse(s: &str) -> Result<Self> {
        let mut parts = s.split_whitespace();
        let kind = parts.next().unwrap_or("");
        let mv = match kind {
            "S" => {
                let a = parse_position(parts.next(), s)?;
                let b = parse_position(parts.next(), s)?;
                Move::swap(a, b)
            }
            "C+" | "C-" => {
                let position = parse_position(parts.next(), s)?;
                Move::cycle(position, kind == "C+")
            }
            _ => {
                return Err(PuzzleError::ParseError(format!(
                    "unknown move kind in '{}'",
                    s
                )))
            }
        };
        if parts.next().is_some() {
            return Err(PuzzleError::ParseError(format!(
                "trailing input in move '{}'",
                s
            )));
        }
        Ok(mv)
    }
}

fn parse_position(part: Option<&str>, whole: &str) -> Result<GridPosition> {
    part.ok_or_else(|| PuzzleError::ParseError(format!("missing position in move '{}'", whole)))?
        .parse()
        .map_err(PuzzleError::ParseError)
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Move::Swap { a, b } => write!(f, "S {} {}", a, b),
            Move::Cycle { position, forward } => {
                write!(f, "C{} {}", if *forward { '+' } else { '-' }, position)
            }
        }
    }
}

/// Encode a move sequence as `;`-separated moves
pub fn encode_moves(moves: &[Move]) -> String {
    moves
        .iter()
        .map(Move::encode)
        .collect::<Vec<_>>()
        .join(";")
}

/// Parse a `;`-separated move sequence; the empty string is the empty sequence
pub fn decode_moves(encoded: &str) -> Result<Vec<Move>> {
    encoded
        .split(';')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(Move::parse)
        .collect()
}
