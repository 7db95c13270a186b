//! Error types for Tile Forge

use crate::level::MigrationError;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PuzzleError {
    #[error("Invalid move: {0}")]
    InvalidMove(String),

    #[error("Puzzle integrity violation: {0}")]
    PuzzleIntegrity(String),

    #[error("Rule conflict between '{first}' and '{second}'")]
    RuleConflict { first: String, second: String },

    #[error("Invalid difficulty profile: {0}")]
    InvalidProfile(String),

    #[error("Invalid grid: {0}")]
    InvalidGrid(String),

    #[error("Generator gave up after {candidates} candidates")]
    GenerationFailed { candidates: usize },

    #[error("Generation exhausted after {attempts} attempts")]
    GenerationExhausted { attempts: usize },

    #[error("Generation aborted after {elapsed:?}")]
    GenerationTimeout { elapsed: Duration },

    #[error("Migration error: {0}")]
    Migration(#[from] MigrationError),

    #[error("State inconsistency: {0}")]
    StateInconsistency(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Task join error: {0}")]
    JoinError(#[from] tokio::task::JoinError),
}

impl PuzzleError {
    /// Whether the caller may retry the same request (possibly with a broader profile)
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            PuzzleError::GenerationExhausted { .. }
                | PuzzleError::GenerationFailed { .. }
                | PuzzleError::GenerationTimeout { .. }
                | PuzzleError::IoError(_)
        )
    }

    /// Short message suitable for showing to a player
    pub fn user_message(&self) -> &'static str {
        match self {
            PuzzleError::GenerationExhausted { .. } | PuzzleError::GenerationFailed { .. } => {
                "Could not build a puzzle at this difficulty. Try a different difficulty."
            }
            PuzzleError::GenerationTimeout { .. } => {
                "Puzzle generation is taking too long. Try again shortly."
            }
            PuzzleError::Migration(_) | PuzzleError::StateInconsistency(_) => {
                "Saved level data could not be restored. Defaults will be used."
            }
            _ => "Something went wrong while preparing the puzzle.",
        }
    }
}

pub type Result<T> = std::result::Result<T, PuzzleError>;
