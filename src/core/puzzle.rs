//! The puzzle aggregate
//!
//! A puzzle owns its grid, goal and move history. The grid itself is
//! immutable; the puzzle's only mutation is replacing it with the result of
//! a move that the grid, the move set and the goal's rules all accept.

use crate::core::{DifficultyProfile, Grid, GridPosition, Move, PuzzleType};
use crate::rules::{evaluator_for, GoalEvaluator, Rule};
use crate::undo::MoveLog;
use crate::{PuzzleError, Result};
use serde::{Deserialize, Serialize};

/// Which kinds of move a puzzle allows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MoveSet {
    pub swaps: bool,
    pub cycles: bool,
}

impl Default for MoveSet {
    fn default() -> Self {
        MoveSet {
            swaps: true,
            cycles: false,
        }
    }
}

impl MoveSet {
    pub fn swaps_only() -> Self {
        MoveSet::default()
    }

    pub fn with_cycles() -> Self {
        MoveSet {
            swaps: true,
            cycles: true,
        }
    }

    pub fn permits(&self, mv: &Move) -> bool {
        match mv {
            Move::Swap { .. } => self.swaps,
            Move::Cycle { .. } => self.cycles,
        }
    }

    /// Append every move the tile states allow, in deterministic order
    ///
    /// Order: positions row-major; for each, swap right, swap down, cycle
    /// forward, cycle backward. Search tie-breaking depends on this order.
    pub fn enumerate_into(&self, grid: &Grid, out: &mut Vec<Move>) {
        for pos in grid.positions() {
            if self.swaps {
                let right = GridPosition::new(pos.row, pos.column + 1);
                let down = GridPosition::new(pos.row + 1, pos.column);
                for other in [right, down] {
                    let mv = Move::swap(pos, other);
                    if grid.contains(other) && grid.check_move(&mv).is_ok() {
                        out.push(mv);
                    }
                }
            }
            if self.cycles {
                for forward in [true, false] {
                    let mv = Move::cycle(pos, forward);
                    // Same effect as another move already listed
                    if mv.canonical(grid.alphabet()) != mv {
                        continue;
                    }
                    if grid.check_move(&mv).is_ok() {
                        out.push(mv);
                    }
                }
            }
        }
    }

    pub fn enumerate(&self, grid: &Grid) -> Vec<Move> {
        let mut moves = Vec::new();
        self.enumerate_into(grid, &mut moves);
        moves
    }
}

/// What it means for a puzzle to be solved
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Goal {
    /// Match a target pattern tile for tile
    DirectMatch { target: Grid },
    /// Satisfy every level-completion rule
    RuleBased { rules: Vec<Rule> },
}

impl Goal {
    pub fn puzzle_type(&self) -> PuzzleType {
        match self {
            Goal::DirectMatch { .. } => PuzzleType::DirectMatch,
            Goal::RuleBased { .. } => PuzzleType::RuleBased,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Puzzle {
    grid: Grid,
    goal: Goal,
    move_set: MoveSet,
    #[serde(default)]
    history: MoveLog,
}

impl Puzzle {
    pub fn new(grid: Grid, goal: Goal, move_set: MoveSet) -> Self {
        Puzzle {
            grid,
            goal,
            move_set,
            history: MoveLog::new(),
        }
    }

    pub fn direct_match(grid: Grid, target: Grid) -> Self {
        Self::new(grid, Goal::DirectMatch { target }, MoveSet::default())
    }

    pub fn rule_based(grid: Grid, rules: Vec<Rule>) -> Self {
        Self::new(grid, Goal::RuleBased { rules }, MoveSet::default())
    }

    pub fn with_move_set(mut self, move_set: MoveSet) -> Self {
        self.move_set = move_set;
        self
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn goal(&self) -> &Goal {
        &self.goal
    }

    pub fn move_set(&self) -> MoveSet {
        self.move_set
    }

    pub fn puzzle_type(&self) -> PuzzleType {
        self.goal.puzzle_type()
    }

    pub fn history(&self) -> &MoveLog {
        &self.history
    }

    /// Goal strategy for this puzzle's type
    pub fn evaluator(&self) -> Box<dyn GoalEvaluator + '_> {
        evaluator_for(&self.goal)
    }

    pub fn is_solved(&self) -> Result<bool> {
        self.evaluator().is_goal_met(&self.grid)
    }

    /// Whether the puzzle's shape agrees with a profile (dimensions, alphabet, type)
    pub fn matches_profile(&self, profile: &DifficultyProfile) -> bool {
        let (width, height) = profile.dimensions();
        self.grid.width() == width
            && self.grid.height() == height
            && self.grid.alphabet() == profile.symbol_count()
            && self.puzzle_type() == profile.puzzle_type
    }

    /// Moves that may be applied right now, in deterministic order
    pub fn legal_moves(&self) -> Result<Vec<Move>> {
        let evaluator = self.evaluator();
        let mut legal = Vec::new();
        for mv in self.move_set.enumerate(&self.grid) {
            let after = self.grid.apply_unchecked(&mv);
            if evaluator.allows_move(&self.grid, &mv, &after)? {
                legal.push(mv);
            }
        }
        Ok(legal)
    }

    /// Apply a move through the aggregate
    ///
    /// Fails with `InvalidMove` if the move set, tile states or the goal's
    /// move rules reject it; the puzzle is unchanged on failure.
    pub fn apply_move(&mut self, mv: Move) -> Result<()> {
        if !self.move_set.permits(&mv) {
            return Err(PuzzleError::InvalidMove(format!(
                "{} is not allowed in this puzzle",
                mv
            )));
        }
        let after = self.grid.apply(&mv)?;
        if !self.evaluator().allows_move(&self.grid, &mv, &after)? {
            return Err(PuzzleError::InvalidMove(format!("{} is rejected by a rule", mv)));
        }
        self.grid = after;
        self.history.log(mv);
        Ok(())
    }

    /// Revert the most recent move
    pub fn undo_move(&mut self) -> Option<Move> {
        let mv = self.history.pop()?;
        self.grid = self.grid.apply_unchecked(&mv.inverse());
        Some(mv)
    }

    pub fn mark_checkpoint(&mut self) {
        self.history.mark_checkpoint();
    }

    /// Revert every move since the last checkpoint; returns how many were undone
    pub fn rewind_to_checkpoint(&mut self) -> usize {
        let undone = self.history.rewind_to_checkpoint();
        for mv in &undone {
            self.grid = self.grid.apply_unchecked(&mv.inverse());
        }
        undone.len()
    }

    /// Forget history; the current grid becomes the starting point
    pub fn clear_history(&mut self) {
        self.history.clear();
    }
}
