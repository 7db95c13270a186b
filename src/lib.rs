//! Tile Forge - solvable tile-puzzle generation
//!
//! Generates grid puzzles that are guaranteed solvable and calibrated to a
//! difficulty profile, validates them with an exhaustive shortest-path
//! search, and migrates persisted levels across schema versions.

pub mod config;
pub mod core;
pub mod error;
pub mod generator;
pub mod level;
pub mod logger;
pub mod orchestrator;
pub mod rules;
pub mod solver;
pub mod undo;

pub use error::{PuzzleError, Result};
