//! Tiles and their behavioral states

use crate::core::{GridPosition, Symbol};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Behavioral state of a tile
///
/// The state belongs to the position, not the symbol: swapping two tiles
/// exchanges their symbols and leaves both states where they were.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TileState {
    /// Free to be swapped and cycled
    #[default]
    Default,
    /// Rejects every symbol mutation
    Locked,
    /// Can be swapped but not cycled; matches any target symbol
    Wildcard,
    /// Never moves, never matches, ignored by goal predicates
    Obstacle,
}

impl TileState {
    /// Whether this tile may take part in a swap
    pub fn can_swap(&self) -> bool {
        matches!(self, TileState::Default | TileState::Wildcard)
    }

    /// Whether this tile's symbol may be cycled through the alphabet
    pub fn can_cycle(&self) -> bool {
        matches!(self, TileState::Default)
    }

    /// Whether goal predicates look at this tile's symbol
    pub fn is_scored(&self) -> bool {
        matches!(self, TileState::Default | TileState::Locked)
    }

    pub fn as_byte(&self) -> u8 {
        match self {
            TileState::Default => 0,
            TileState::Locked => 1,
            TileState::Wildcard => 2,
            TileState::Obstacle => 3,
        }
    }

    pub fn from_byte(byte: u8) -> Option<TileState> {
        match byte {
            0 => Some(TileState::Default),
            1 => Some(TileState::Locked),
            2 => Some(TileState::Wildcard),
            3 => Some(TileState::Obstacle),
            _ => None,
        }
    }
}

/// A single grid cell as seen from outside the grid
///
/// Tiles are values handed out by [`crate::core::Grid`]; changing one means
/// going through the grid (or the owning puzzle), never mutating a tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tile {
    pub position: GridPosition,
    pub symbol: Symbol,
    pub state: TileState,
}

impl Tile {
    pub fn new(position: GridPosition, symbol: Symbol, state: TileState) -> Self {
        Tile {
            position,
            symbol,
            state,
        }
    }

    /// Notation character used by the legacy row format and `Display` for grids
    ///
    /// Uppercase is a default tile, lowercase a locked tile, `*` a wildcard and
    /// `#` an obstacle.
    pub fn notation(&self) -> char {
        match self.state {
            TileState::Default => self.symbol.as_char(),
            TileState::Locked => self.symbol.as_char().to_ascii_lowercase(),
            TileState::Wildcard => '*',
            TileState::Obstacle => '#',
        }
    }
}

impl fmt::Display for Tile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.notation(), self.position)
    }
}

/// Parse one notation character into (symbol, state)
pub fn parse_notation(c: char) -> Option<(Symbol, TileState)> {
    match c {
        '*' => Some((Symbol::new(0), TileState::Wildcard)),
        '#' => Some((Symbol::new(0), TileState::Obstacle)),
        c if c.is_ascii_uppercase() => Symbol::from_char(c).map(|s| (s, TileState::Default)),
        c if c.is_ascii_lowercase() => Symbol::from_char(c).map(|s| (s, TileState::Locked)),
        _ => None,
    }
}
