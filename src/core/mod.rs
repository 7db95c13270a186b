//! Core grid types, moves and the puzzle aggregate

pub mod grid;
pub mod moves;
pub mod profile;
pub mod puzzle;
pub mod tile;
pub mod types;

pub use grid::{Configuration, Grid};
pub use moves::{decode_moves, encode_moves, Move};
pub use profile::{DifficultyProfile, PuzzleType};
pub use puzzle::{Goal, MoveSet, Puzzle};
pub use tile::{Tile, TileState};
pub use types::{GridPosition, Symbol, MAX_SYMBOLS};
