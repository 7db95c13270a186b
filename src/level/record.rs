//! The canonical persisted level

use crate::core::{Goal, Grid, MoveSet, Puzzle, PuzzleType};
use crate::generator::GenerationResult;
use crate::level::MigrationError;
use crate::rules::Rule;
use crate::solver::{calculate_par, SolutionPath, SolvabilityResult, SolvabilityValidator};
use crate::{PuzzleError, Result};
use serde::{Deserialize, Serialize};

/// Schema version every record is migrated to on load
pub const CURRENT_SCHEMA_VERSION: u32 = 3;

fn default_true() -> bool {
    true
}

/// Player-facing toggles stored with each level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelSettings {
    #[serde(default = "default_true")]
    pub sound_enabled: bool,
    #[serde(default = "default_true")]
    pub haptics_enabled: bool,
}

impl Default for LevelSettings {
    fn default() -> Self {
        LevelSettings {
            sound_enabled: true,
            haptics_enabled: true,
        }
    }
}

/// Coarse 1-5 rating for a par
pub fn difficulty_rating(par: u32) -> u32 {
    match par {
        0..=2 => 1,
        3..=4 => 2,
        5..=7 => 3,
        8..=11 => 4,
        _ => 5,
    }
}

/// A level at the current schema version
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelRecord {
    pub schema_version: u32,
    pub level_id: String,
    /// `[width, height, alphabet, (symbol, state)*]`
    pub layout: Vec<u8>,
    /// `;`-joined move encoding
    pub solution: String,
    pub par: u32,
    pub difficulty_rating: u32,
    pub puzzle_type: PuzzleType,
    #[serde(default)]
    pub move_set: MoveSet,
    /// Completion rules for rule-based levels; empty means uniform rows
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rules: Vec<Rule>,
    #[serde(default)]
    pub settings: LevelSettings,
}

impl LevelRecord {
    /// Persistable form of a freshly generated puzzle
    pub fn from_generation(level_id: impl Into<String>, result: &GenerationResult) -> Self {
        let puzzle = result.puzzle();
        let solution = result
            .solvability()
            .solution_path()
            .map(SolutionPath::encode)
            .unwrap_or_default();
        let rules = match puzzle.goal() {
            Goal::RuleBased { rules } => rules.clone(),
            Goal::DirectMatch { .. } => Vec::new(),
        };

        LevelRecord {
            schema_version: CURRENT_SCHEMA_VERSION,
            level_id: level_id.into(),
            layout: puzzle.grid().to_layout_bytes(),
            solution,
            par: result.par(),
            difficulty_rating: difficulty_rating(result.par()),
            puzzle_type: puzzle.puzzle_type(),
            move_set: puzzle.move_set(),
            rules,
            settings: LevelSettings::default(),
        }
    }

    pub fn grid(&self) -> Result<Grid> {
        Grid::from_layout_bytes(&self.layout)
    }

    pub fn solution_path(&self) -> Result<SolutionPath> {
        SolutionPath::decode(&self.solution)
    }

    /// Rebuild the playable puzzle
    ///
    /// A direct-match target is not stored; it is the grid reached by
    /// replaying the stored solution.
    pub fn to_puzzle(&self) -> Result<Puzzle> {
        let grid = self.grid()?;
        let goal = match self.puzzle_type {
            PuzzleType::DirectMatch => Goal::DirectMatch {
                target: self.solution_path()?.replay(&grid)?,
            },
            PuzzleType::RuleBased if self.rules.is_empty() => Goal::RuleBased {
                rules: Rule::uniform_rows(grid.height()),
            },
            PuzzleType::RuleBased => Goal::RuleBased {
                rules: self.rules.clone(),
            },
        };
        Ok(Puzzle::new(grid, goal, self.move_set))
    }

    /// Structural checks every loaded record must pass
    pub fn validate(&self) -> std::result::Result<(), MigrationError> {
        let invalid = MigrationError::InvalidRecord;

        if self.schema_version != CURRENT_SCHEMA_VERSION {
            return Err(invalid(format!(
                "schema version {} is not current ({})",
                self.schema_version, CURRENT_SCHEMA_VERSION
            )));
        }
        if self.level_id.trim().is_empty() {
            return Err(invalid("level id is empty".to_string()));
        }
        let path = self
            .solution_path()
            .map_err(|e| invalid(format!("solution: {}", e)))?;
        if path.par() != self.par {
            return Err(invalid(format!(
                "par {} disagrees with a {}-move solution",
                self.par,
                path.len()
            )));
        }
        if let Some(mv) = path.moves().iter().find(|mv| !self.move_set.permits(mv)) {
            return Err(invalid(format!("solution uses {} outside the move set", mv)));
        }

        let mut puzzle = self
            .to_puzzle()
            .map_err(|e| invalid(format!("layout: {}", e)))?;
        for mv in path.moves() {
            puzzle
                .apply_move(*mv)
                .map_err(|e| invalid(format!("solution does not replay: {}", e)))?;
        }
        match puzzle.is_solved() {
            Ok(true) => Ok(()),
            Ok(false) => Err(invalid("solution does not reach the goal".to_string())),
            Err(e) => Err(invalid(format!("goal: {}", e))),
        }
    }

    /// Re-solve the stored puzzle and check the persisted par still holds
    pub fn verify_against(&self, validator: &SolvabilityValidator) -> Result<SolvabilityResult> {
        let puzzle = self.to_puzzle()?;
        let result = validator.try_find_solution(&puzzle)?;
        let fresh = calculate_par(&result);
        if !result.is_solvable() || fresh != self.par {
            return Err(PuzzleError::StateInconsistency(format!(
                "level '{}' stores par {} but the solver finds {} ({:?})",
                self.level_id,
                self.par,
                fresh,
                result.termination()
            )));
        }
        Ok(result)
    }
}
