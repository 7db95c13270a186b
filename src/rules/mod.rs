//! Rule evaluation engine
//!
//! Goal semantics are pluggable: each puzzle type has one [`GoalEvaluator`]
//! strategy. The solver and the puzzle aggregate only ever talk to the
//! trait, so search stays agnostic to what "solved" means.

pub mod direct_match;
pub mod rule_based;

pub use direct_match::DirectMatchEvaluator;
pub use rule_based::{Condition, Enforcement, Rule, RuleBasedEvaluator, RuleScope};

use crate::core::{Goal, Grid, Move, MoveSet};
use crate::Result;

/// Goal strategy for one puzzle type
pub trait GoalEvaluator {
    /// Short name for logs
    fn name(&self) -> &'static str;

    /// Whether `grid` satisfies the goal
    ///
    /// Fails with `RuleConflict` when rules disagree about the same state.
    fn is_goal_met(&self, grid: &Grid) -> Result<bool>;

    /// Fails with `PuzzleIntegrity` when the goal cannot be reached from
    /// `grid` under `move_set` no matter which moves are played
    ///
    /// This is distinct from "not solved yet": a puzzle passing this check
    /// may still be unsolvable within search limits.
    fn check_integrity(&self, grid: &Grid, move_set: MoveSet) -> Result<()>;

    /// Whether the goal's rules permit `mv` taking `before` to `after`
    ///
    /// Tile-state legality has already been checked by the grid.
    fn allows_move(&self, _before: &Grid, _mv: &Move, _after: &Grid) -> Result<bool> {
        Ok(true)
    }
}

/// Pick the strategy for a goal
pub fn evaluator_for(goal: &Goal) -> Box<dyn GoalEvaluator + '_> {
    match goal {
        Goal::DirectMatch { target } => Box::new(DirectMatchEvaluator::new(target)),
        Goal::RuleBased { rules } => Box::new(RuleBasedEvaluator::new(rules)),
    }
}
