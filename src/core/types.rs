//! Strongly-typed wrappers for grid concepts
//!
//! Positions and symbols are tiny value types. Wrapping them keeps a row
//! index from being passed where a symbol is expected and gives both a
//! stable human-readable form for logs and level files.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A (row, column) coordinate on a grid
///
/// Ordering is row-major, which is also the order moves are enumerated in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridPosition {
    pub row: u8,
    pub column: u8,
}

impl GridPosition {
    pub fn new(row: u8, column: u8) -> Self {
        GridPosition { row, column }
    }

    /// Manhattan distance to another position
    pub fn distance(&self, other: GridPosition) -> u32 {
        (self.row.abs_diff(other.row) as u32) + (self.column.abs_diff(other.column) as u32)
    }

    /// Two positions are adjacent iff their Manhattan distance is exactly 1
    pub fn is_adjacent(&self, other: GridPosition) -> bool {
        self.distance(other) == 1
    }

    /// Row-major index into a grid of the given width
    pub fn index(&self, width: u8) -> usize {
        self.row as usize * width as usize + self.column as usize
    }

    /// Inverse of [`GridPosition::index`]
    pub fn from_index(index: usize, width: u8) -> Self {
        let width = width as usize;
        GridPosition {
            row: (index / width) as u8,
            column: (index % width) as u8,
        }
    }

    /// In-bounds neighbours in fixed order: up, down, left, right
    pub fn neighbors(&self, width: u8, height: u8) -> impl Iterator<Item = GridPosition> {
        let GridPosition { row, column } = *self;
        let up = row.checked_sub(1).map(|r| GridPosition::new(r, column));
        let down = (row + 1 < height).then(|| GridPosition::new(row + 1, column));
        let left = column.checked_sub(1).map(|c| GridPosition::new(row, c));
        let right = (column + 1 < width).then(|| GridPosition::new(row, column + 1));
        [up, down, left, right].into_iter().flatten()
    }

    pub fn in_bounds(&self, width: u8, height: u8) -> bool {
        self.row < height && self.column < width
    }
}

impl fmt::Display for GridPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.row, self.column)
    }
}

impl std::str::FromStr for GridPosition {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (row, column) = s
            .trim()
            .split_once(',')
            .ok_or_else(|| format!("invalid position '{s}' (expected: <row>,<column>)"))?;
        let row = row
            .trim()
            .parse::<u8>()
            .map_err(|_| format!("invalid row in position '{s}'"))?;
        let column = column
            .trim()
            .parse::<u8>()
            .map_err(|_| format!("invalid column in position '{s}'"))?;
        Ok(GridPosition { row, column })
    }
}

/// One letter of a puzzle's alphabet
///
/// Symbols are opaque: only equality and their index within the alphabet
/// matter. They display as `A`, `B`, `C`, ...
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Symbol(u8);

/// Largest alphabet the letter notation can express
pub const MAX_SYMBOLS: u8 = 26;

impl Symbol {
    pub fn new(index: u8) -> Self {
        Symbol(index)
    }

    pub fn index(&self) -> u8 {
        self.0
    }

    /// Next symbol in an alphabet of `alphabet` letters, wrapping around
    pub fn cycled(&self, alphabet: u8, forward: bool) -> Symbol {
        if alphabet == 0 {
            return *self;
        }
        if forward {
            Symbol((self.0 + 1) % alphabet)
        } else {
            Symbol((self.0 + alphabet - 1) % alphabet)
        }
    }

    pub fn as_char(&self) -> char {
        (b'A' + self.0.min(MAX_SYMBOLS - 1)) as char
    }

    /// Parse a letter (either case) into a symbol
    pub fn from_char(c: char) -> Option<Symbol> {
        let upper = c.to_ascii_uppercase();
        if upper.is_ascii_uppercase() {
            Some(Symbol(upper as u8 - b'A'))
        } else {
            None
        }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}
