//! Difficulty profiles requested by callers

use crate::core::{grid::MAX_DIMENSION, MAX_SYMBOLS};
use crate::{PuzzleError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which goal family a puzzle uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PuzzleType {
    /// The grid must equal a target pattern
    #[default]
    DirectMatch,
    /// A set of declarative rules must all hold
    RuleBased,
}

impl std::str::FromStr for PuzzleType {
    type Err = PuzzleError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().replace(['-', '_', ' '], "").as_str() {
            "directmatch" | "match" => Ok(PuzzleType::DirectMatch),
            "rulebased" | "rules" => Ok(PuzzleType::RuleBased),
            _ => Err(PuzzleError::ParseError(format!("Invalid puzzle type: {}", s))),
        }
    }
}

impl fmt::Display for PuzzleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PuzzleType::DirectMatch => write!(f, "DirectMatch"),
            PuzzleType::RuleBased => write!(f, "RuleBased"),
        }
    }
}

/// What the caller asks the generator for
///
/// Fields are signed because profiles arrive from remote configuration and
/// may be nonsense; [`DifficultyProfile::validate`] is the gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DifficultyProfile {
    pub grid_width: i32,
    pub grid_height: i32,
    pub unique_symbol_count: i32,
    pub puzzle_type: PuzzleType,
    pub minimum_solution_moves: i32,
}

impl Default for DifficultyProfile {
    fn default() -> Self {
        Self {
            grid_width: 4,
            grid_height: 4,
            unique_symbol_count: 3,
            puzzle_type: PuzzleType::DirectMatch,
            minimum_solution_moves: 4,
        }
    }
}

impl DifficultyProfile {
    pub fn new(
        grid_width: i32,
        grid_height: i32,
        unique_symbol_count: i32,
        puzzle_type: PuzzleType,
        minimum_solution_moves: i32,
    ) -> Self {
        DifficultyProfile {
            grid_width,
            grid_height,
            unique_symbol_count,
            puzzle_type,
            minimum_solution_moves,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.grid_width <= 0 || self.grid_height <= 0 {
            return Err(PuzzleError::InvalidProfile(format!(
                "grid dimensions must be positive, got {}x{}",
                self.grid_width, self.grid_height
            )));
        }
        if self.grid_width > MAX_DIMENSION as i32 || self.grid_height > MAX_DIMENSION as i32 {
            return Err(PuzzleError::InvalidProfile(format!(
                "grid dimensions must be at most {}, got {}x{}",
                MAX_DIMENSION, self.grid_width, self.grid_height
            )));
        }
        if self.unique_symbol_count < 1 || self.unique_symbol_count > MAX_SYMBOLS as i32 {
            return Err(PuzzleError::InvalidProfile(format!(
                "symbol count must be in 1..={}, got {}",
                MAX_SYMBOLS, self.unique_symbol_count
            )));
        }
        if self.minimum_solution_moves < 0 {
            return Err(PuzzleError::InvalidProfile(format!(
                "minimum solution moves must not be negative, got {}",
                self.minimum_solution_moves
            )));
        }
        Ok(())
    }

    /// Width and height, once validated
    pub fn dimensions(&self) -> (u8, u8) {
        (
            self.grid_width.clamp(1, MAX_DIMENSION as i32) as u8,
            self.grid_height.clamp(1, MAX_DIMENSION as i32) as u8,
        )
    }

    pub fn symbol_count(&self) -> u8 {
        self.unique_symbol_count.clamp(1, MAX_SYMBOLS as i32) as u8
    }

    pub fn minimum_moves(&self) -> usize {
        self.minimum_solution_moves.max(0) as usize
    }

    /// A gentler profile: one fewer required move, never below zero
    ///
    /// Callers use this after `GenerationExhausted` to retry at an easier level.
    pub fn broadened(&self) -> DifficultyProfile {
        DifficultyProfile {
            minimum_solution_moves: (self.minimum_solution_moves - 1).max(0),
            ..self.clone()
        }
    }
}

impl fmt::Display for DifficultyProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}x{} {} symbols, {}, min {} moves",
            self.grid_width,
            self.grid_height,
            self.unique_symbol_count,
            self.puzzle_type,
            self.minimum_solution_moves
        )
    }
}
