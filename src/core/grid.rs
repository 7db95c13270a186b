//! Immutable puzzle grid
//!
//! A grid stores its tiles column-wise: one symbol vector (the part moves
//! change) and one shared tile-state slice (the part they never change).
//! Cloning a grid is therefore a small inline copy plus a refcount bump,
//! which is what keeps breadth-first search over grids affordable.

use crate::core::tile::parse_notation;
use crate::core::{GridPosition, Move, Symbol, Tile, TileState, MAX_SYMBOLS};
use crate::{PuzzleError, Result};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;
use std::sync::Arc;

/// The part of a grid that moves change: one symbol per position, row-major
///
/// Two grids with the same tile states are the same search state iff their
/// configurations are equal.
pub type Configuration = SmallVec<[Symbol; 64]>;

/// Largest supported side length
pub const MAX_DIMENSION: u8 = 16;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid {
    width: u8,
    height: u8,
    alphabet: u8,
    symbols: Configuration,
    states: Arc<[TileState]>,
}

impl Grid {
    /// Build a grid from a full set of tiles
    ///
    /// Every position in `[0,height) x [0,width)` must appear exactly once.
    pub fn new(width: u8, height: u8, alphabet: u8, tiles: Vec<Tile>) -> Result<Self> {
        check_dimensions(width, height, alphabet)?;
        let len = width as usize * height as usize;
        if tiles.len() != len {
            return Err(PuzzleError::InvalidGrid(format!(
                "expected {} tiles for a {}x{} grid, got {}",
                len,
                width,
                height,
                tiles.len()
            )));
        }

        let mut symbols: Vec<Option<Symbol>> = vec![None; len];
        let mut states = vec![TileState::Default; len];
        for tile in tiles {
            if !tile.position.in_bounds(width, height) {
                return Err(PuzzleError::InvalidGrid(format!(
                    "tile at {} is outside the {}x{} grid",
                    tile.position, width, height
                )));
            }
            let idx = tile.position.index(width);
            if symbols[idx].is_some() {
                return Err(PuzzleError::InvalidGrid(format!(
                    "duplicate tile at {}",
                    tile.position
                )));
            }
            symbols[idx] = Some(tile.symbol);
            states[idx] = tile.state;
        }

        // Length matched and there were no duplicates, so every slot is filled
        let symbols: Vec<Symbol> = symbols.into_iter().flatten().collect();
        Self::from_parts(width, height, alphabet, symbols, states)
    }

    /// Build a grid from row-major symbol and state vectors
    pub fn from_parts(
        width: u8,
        height: u8,
        alphabet: u8,
        symbols: Vec<Symbol>,
        states: Vec<TileState>,
    ) -> Result<Self> {
        check_dimensions(width, height, alphabet)?;
        let len = width as usize * height as usize;
        if symbols.len() != len || states.len() != len {
            return Err(PuzzleError::InvalidGrid(format!(
                "expected {} cells, got {} symbols and {} states",
                len,
                symbols.len(),
                states.len()
            )));
        }
        if let Some(bad) = symbols.iter().find(|s| s.index() >= alphabet) {
            return Err(PuzzleError::InvalidGrid(format!(
                "symbol {} outside alphabet of {} symbols",
                bad, alphabet
            )));
        }

        Ok(Grid {
            width,
            height,
            alphabet,
            symbols: symbols.into_iter().collect(),
            states: states.into(),
        })
    }

    /// A grid where every tile is a default tile holding `symbol`
    pub fn filled(width: u8, height: u8, alphabet: u8, symbol: Symbol) -> Result<Self> {
        let len = width as usize * height as usize;
        Self::from_parts(
            width,
            height,
            alphabet,
            vec![symbol; len],
            vec![TileState::Default; len],
        )
    }

    /// Parse rows of tile notation (`A`, `b`, `*`, `#`)
    ///
    /// The alphabet is the smallest one that covers every symbol used.
    pub fn from_rows<S: AsRef<str>>(rows: &[S]) -> Result<Self> {
        let height = rows.len();
        let width = rows.first().map(|r| r.as_ref().chars().count()).unwrap_or(0);
        if height > MAX_DIMENSION as usize || width > MAX_DIMENSION as usize {
            return Err(PuzzleError::InvalidGrid(format!(
                "{}x{} exceeds the maximum dimension of {}",
                width, height, MAX_DIMENSION
            )));
        }

        let mut symbols = Vec::with_capacity(width * height);
        let mut states = Vec::with_capacity(width * height);
        for (r, row) in rows.iter().enumerate() {
            let row = row.as_ref();
            if row.chars().count() != width {
                return Err(PuzzleError::InvalidGrid(format!(
                    "row {} has {} tiles, expected {}",
                    r,
                    row.chars().count(),
                    width
                )));
            }
            for c in row.chars() {
                let (symbol, state) = parse_notation(c).ok_or_else(|| {
                    PuzzleError::InvalidGrid(format!("unknown tile notation '{}' in row {}", c, r))
                })?;
                symbols.push(symbol);
                states.push(state);
            }
        }

        let alphabet = symbols.iter().map(|s| s.index() + 1).max().unwrap_or(1);
        Self::from_parts(width as u8, height as u8, alphabet, symbols, states)
    }

    /// Same tiles over a larger alphabet (needed when cycling can reach unused symbols)
    pub fn with_alphabet(&self, alphabet: u8) -> Result<Self> {
        let mut grid = self.clone();
        check_dimensions(self.width, self.height, alphabet)?;
        if let Some(bad) = self.symbols.iter().find(|s| s.index() >= alphabet) {
            return Err(PuzzleError::InvalidGrid(format!(
                "symbol {} outside alphabet of {} symbols",
                bad, alphabet
            )));
        }
        grid.alphabet = alphabet;
        Ok(grid)
    }

    pub fn width(&self) -> u8 {
        self.width
    }

    pub fn height(&self) -> u8 {
        self.height
    }

    pub fn alphabet(&self) -> u8 {
        self.alphabet
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn contains(&self, position: GridPosition) -> bool {
        position.in_bounds(self.width, self.height)
    }

    pub fn tile(&self, position: GridPosition) -> Option<Tile> {
        if !self.contains(position) {
            return None;
        }
        let idx = position.index(self.width);
        Some(Tile::new(position, self.symbols[idx], self.states[idx]))
    }

    pub fn symbol_at(&self, position: GridPosition) -> Option<Symbol> {
        self.contains(position)
            .then(|| self.symbols[position.index(self.width)])
    }

    pub fn state_at(&self, position: GridPosition) -> Option<TileState> {
        self.contains(position)
            .then(|| self.states[position.index(self.width)])
    }

    /// All positions in row-major order
    pub fn positions(&self) -> impl Iterator<Item = GridPosition> + '_ {
        (0..self.len()).map(move |idx| GridPosition::from_index(idx, self.width))
    }

    /// All tiles in row-major order
    pub fn tiles(&self) -> impl Iterator<Item = Tile> + '_ {
        self.positions().map(move |pos| {
            let idx = pos.index(self.width);
            Tile::new(pos, self.symbols[idx], self.states[idx])
        })
    }

    /// Tiles of one row, left to right
    pub fn row(&self, row: u8) -> impl Iterator<Item = Tile> + '_ {
        (0..self.width).filter_map(move |column| self.tile(GridPosition::new(row, column)))
    }

    /// Tiles of one column, top to bottom
    pub fn column(&self, column: u8) -> impl Iterator<Item = Tile> + '_ {
        (0..self.height).filter_map(move |row| self.tile(GridPosition::new(row, column)))
    }

    /// The symbol configuration, which is the search-state identity
    pub fn configuration(&self) -> &[Symbol] {
        &self.symbols
    }

    pub fn states(&self) -> &[TileState] {
        &self.states
    }

    /// Whether two grids share the same tile-state layout (and so can be compared by configuration)
    pub fn same_layout(&self, other: &Grid) -> bool {
        self.width == other.width && self.height == other.height && self.states == other.states
    }

    /// Check that a move can be applied to this grid
    ///
    /// A move is legal when its positions are on the grid, the tiles involved
    /// allow the mutation, and the configuration actually changes.
    pub fn check_move(&self, mv: &Move) -> Result<()> {
        match *mv {
            Move::Swap { a, b } => {
                let (ta, tb) = match (self.tile(a), self.tile(b)) {
                    (Some(ta), Some(tb)) => (ta, tb),
                    _ => {
                        return Err(PuzzleError::InvalidMove(format!(
                            "swap {} is off the grid",
                            mv
                        )))
                    }
                };
                if !a.is_adjacent(b) {
                    return Err(PuzzleError::InvalidMove(format!(
                        "swap {} joins non-adjacent tiles",
                        mv
                    )));
                }
                if !ta.state.can_swap() || !tb.state.can_swap() {
                    return Err(PuzzleError::InvalidMove(format!(
                        "swap {} touches a {:?}/{:?} tile",
                        mv, ta.state, tb.state
                    )));
                }
                if ta.symbol == tb.symbol {
                    return Err(PuzzleError::InvalidMove(format!(
                        "swap {} exchanges equal symbols",
                        mv
                    )));
                }
                Ok(())
            }
            Move::Cycle { position, .. } => {
                let tile = self.tile(position).ok_or_else(|| {
                    PuzzleError::InvalidMove(format!("cycle {} is off the grid", mv))
                })?;
                if !tile.state.can_cycle() {
                    return Err(PuzzleError::InvalidMove(format!(
                        "cycle {} targets a {:?} tile",
                        mv, tile.state
                    )));
                }
                if self.alphabet < 2 {
                    return Err(PuzzleError::InvalidMove(format!(
                        "cycle {} has nothing to cycle through",
                        mv
                    )));
                }
                Ok(())
            }
        }
    }

    /// Produce the grid that results from a legal move
    pub fn apply(&self, mv: &Move) -> Result<Grid> {
        self.check_move(mv)?;
        Ok(self.apply_unchecked(mv))
    }

    /// Apply a move already known to be legal
    pub(crate) fn apply_unchecked(&self, mv: &Move) -> Grid {
        let mut next = self.clone();
        match *mv {
            Move::Swap { a, b } => {
                next.symbols
                    .swap(a.index(self.width), b.index(self.width));
            }
            Move::Cycle { position, forward } => {
                let idx = position.index(self.width);
                next.symbols[idx] = self.symbols[idx].cycled(self.alphabet, forward);
            }
        }
        next
    }

    /// Same layout, different symbols
    pub fn with_configuration(&self, symbols: &[Symbol]) -> Result<Grid> {
        if symbols.len() != self.len() {
            return Err(PuzzleError::InvalidGrid(format!(
                "configuration has {} symbols, grid has {} tiles",
                symbols.len(),
                self.len()
            )));
        }
        let mut next = self.clone();
        next.symbols = symbols.iter().copied().collect();
        Ok(next)
    }

    /// Rows in tile notation
    pub fn rows(&self) -> Vec<String> {
        (0..self.height)
            .map(|r| self.row(r).map(|t| t.notation()).collect())
            .collect()
    }

    /// Compact binary layout: `[width, height, alphabet, (symbol, state)*]`
    pub fn to_layout_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(3 + self.len() * 2);
        bytes.extend([self.width, self.height, self.alphabet]);
        for (symbol, state) in self.symbols.iter().zip(self.states.iter()) {
            bytes.push(symbol.index());
            bytes.push(state.as_byte());
        }
        bytes
    }

    /// Inverse of [`Grid::to_layout_bytes`]
    pub fn from_layout_bytes(bytes: &[u8]) -> Result<Grid> {
        let (header, cells) = match bytes {
            [w, h, a, rest @ ..] => ((*w, *h, *a), rest),
            _ => {
                return Err(PuzzleError::InvalidGrid(
                    "layout is shorter than its header".to_string(),
                ))
            }
        };
        let (width, height, alphabet) = header;
        let len = width as usize * height as usize;
        if cells.len() != len * 2 {
            return Err(PuzzleError::InvalidGrid(format!(
                "layout holds {} bytes of tiles, expected {}",
                cells.len(),
                len * 2
            )));
        }

        let mut symbols = Vec::with_capacity(len);
        let mut states = Vec::with_capacity(len);
        for pair in cells.chunks_exact(2) {
            symbols.push(Symbol::new(pair[0]));
            states.push(TileState::from_byte(pair[1]).ok_or_else(|| {
                PuzzleError::InvalidGrid(format!("unknown tile state byte {}", pair[1]))
            })?);
        }
        Self::from_parts(width, height, alphabet, symbols, states)
    }
}

fn check_dimensions(width: u8, height: u8, alphabet: u8) -> Result<()> {
    if width == 0 || height == 0 {
        return Err(PuzzleError::InvalidGrid(format!(
            "grid dimensions must be positive, got {}x{}",
            width, height
        )));
    }
    if width > MAX_DIMENSION || height > MAX_DIMENSION {
        return Err(PuzzleError::InvalidGrid(format!(
            "{}x{} exceeds the maximum dimension of {}",
            width, height, MAX_DIMENSION
        )));
    }
    if alphabet == 0 || alphabet > MAX_SYMBOLS {
        return Err(PuzzleError::InvalidGrid(format!(
            "alphabet size {} outside 1..={}",
            alphabet, MAX_SYMBOLS
        )));
    }
    Ok(())
}

impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rows = self.rows();
        write!(f, "{}", rows.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos(r: u8, c: u8) -> GridPosition {
        GridPosition::new(r, c)
    }

    #[test]
    fn test_from_rows_and_display() {
        let grid = Grid::from_rows(&["AB", "c#"]).unwrap();
        assert_eq!(grid.width(), 2);
        assert_eq!(grid.height(), 2);
        assert_eq!(grid.alphabet(), 3);
        assert_eq!(grid.state_at(pos(1, 0)), Some(TileState::Locked));
        assert_eq!(grid.state_at(pos(1, 1)), Some(TileState::Obstacle));
        assert_eq!(grid.to_string(), "AB\nc#");
    }

    #[test]
    fn test_new_rejects_missing_and_duplicate_tiles() {
        let a = Symbol::new(0);
        let tiles = vec![
            Tile::new(pos(0, 0), a, TileState::Default),
            Tile::new(pos(0, 0), a, TileState::Default),
        ];
        assert!(Grid::new(2, 1, 1, tiles).is_err());

        let tiles = vec![Tile::new(pos(0, 0), a, TileState::Default)];
        assert!(Grid::new(2, 1, 1, tiles).is_err());

        assert!(Grid::filled(0, 3, 1, a).is_err());
    }

    #[test]
    fn test_apply_returns_new_grid() {
        let grid = Grid::from_rows(&["AB"]).unwrap();
        let next = grid.apply(&Move::swap(pos(0, 0), pos(0, 1))).unwrap();
        assert_eq!(next.to_string(), "BA");
        assert_eq!(grid.to_string(), "AB");
    }

    #[test]
    fn test_locked_and_obstacle_reject_mutation() {
        let grid = Grid::from_rows(&["Ab#"]).unwrap();
        assert!(grid.apply(&Move::swap(pos(0, 0), pos(0, 1))).is_err());
        assert!(grid.apply(&Move::cycle(pos(0, 1), true)).is_err());
        assert!(grid.apply(&Move::cycle(pos(0, 2), true)).is_err());
        assert!(grid.apply(&Move::cycle(pos(0, 0), true)).is_ok());
    }

    #[test]
    fn test_equal_symbol_swap_is_not_a_move() {
        let grid = Grid::from_rows(&["AA"]).unwrap();
        let err = grid.apply(&Move::swap(pos(0, 0), pos(0, 1))).unwrap_err();
        assert!(matches!(err, PuzzleError::InvalidMove(_)));
    }

    #[test]
    fn test_cycle_uses_alphabet() {
        let grid = Grid::from_rows(&["AB"]).unwrap().with_alphabet(3).unwrap();
        let next = grid.apply(&Move::cycle(pos(0, 1), true)).unwrap();
        assert_eq!(next.to_string(), "AC");
        let back = next.apply(&Move::cycle(pos(0, 1), false)).unwrap();
        assert_eq!(back, grid);
    }

    #[test]
    fn test_layout_bytes_roundtrip() {
        let grid = Grid::from_rows(&["Ab*", "#CA"]).unwrap();
        let bytes = grid.to_layout_bytes();
        assert_eq!(&bytes[..3], &[3, 2, 3]);
        assert_eq!(Grid::from_layout_bytes(&bytes).unwrap(), grid);
        assert!(Grid::from_layout_bytes(&bytes[..5]).is_err());
    }
}
