//! Search results

use crate::core::{decode_moves, encode_moves, Grid, Move};
use crate::Result;
use serde::{Deserialize, Serialize};
use std::fmt;

/// An ordered sequence of moves that solves a puzzle
///
/// Par is the move count. The empty path is only produced for puzzles
/// that are already solved.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SolutionPath {
    moves: Vec<Move>,
}

impl SolutionPath {
    pub fn new(moves: Vec<Move>) -> Self {
        SolutionPath { moves }
    }

    pub fn empty() -> Self {
        SolutionPath { moves: Vec::new() }
    }

    pub fn moves(&self) -> &[Move] {
        &self.moves
    }

    pub fn len(&self) -> usize {
        self.moves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }

    pub fn par(&self) -> u32 {
        self.moves.len() as u32
    }

    pub fn encode(&self) -> String {
        encode_moves(&self.moves)
    }

    pub fn decode(encoded: &str) -> Result<Self> {
        Ok(SolutionPath::new(decode_moves(encoded)?))
    }

    /// Apply every move in order, failing on the first illegal one
    pub fn replay(&self, start: &Grid) -> Result<Grid> {
        self.moves
            .iter()
            .try_fold(start.clone(), |grid, mv| grid.apply(mv))
    }
}

impl fmt::Display for SolutionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.moves.is_empty() {
            write!(f, "(already solved)")
        } else {
            write!(f, "{}", self.encode())
        }
    }
}

/// Why a search stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SearchTermination {
    /// A goal state was reached
    Solved,
    /// Every reachable state was visited
    Exhausted,
    /// States remained beyond the depth limit
    DepthLimit,
    /// The node budget ran out
    NodeLimit,
    /// The wall-clock deadline passed
    Deadline,
    /// A cooperative cancel flag was raised
    Cancelled,
}

impl SearchTermination {
    /// Stopped by a limit rather than by finishing the search
    pub fn is_bounded(&self) -> bool {
        !matches!(self, SearchTermination::Solved | SearchTermination::Exhausted)
    }
}

/// Outcome of one validator call; never mutated afterwards
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolvabilityResult {
    is_solvable: bool,
    moves_in_solution: usize,
    solution_path: Option<SolutionPath>,
    nodes_expanded: usize,
    termination: SearchTermination,
}

impl SolvabilityResult {
    pub fn solved(path: SolutionPath, nodes_expanded: usize) -> Self {
        SolvabilityResult {
            is_solvable: true,
            moves_in_solution: path.len(),
            solution_path: Some(path),
            nodes_expanded,
            termination: SearchTermination::Solved,
        }
    }

    /// No solution found; a bounded stop carries no partial path
    pub fn unsolved(termination: SearchTermination, nodes_expanded: usize) -> Self {
        SolvabilityResult {
            is_solvable: false,
            moves_in_solution: 0,
            solution_path: None,
            nodes_expanded,
            termination,
        }
    }

    pub fn is_solvable(&self) -> bool {
        self.is_solvable
    }

    pub fn moves_in_solution(&self) -> usize {
        self.moves_in_solution
    }

    pub fn solution_path(&self) -> Option<&SolutionPath> {
        self.solution_path.as_ref()
    }

    pub fn nodes_expanded(&self) -> usize {
        self.nodes_expanded
    }

    pub fn termination(&self) -> SearchTermination {
        self.termination
    }

    /// The `(found, solution)` pair callers of `try_find_solution` expect
    pub fn into_parts(self) -> (bool, Option<SolutionPath>) {
        (self.is_solvable, self.solution_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::GridPosition;

    #[test]
    fn test_replay() {
        let start = Grid::from_rows(&["BA"]).unwrap();
        let path = SolutionPath::new(vec![Move::swap(
            GridPosition::new(0, 0),
            GridPosition::new(0, 1),
        )]);
        assert_eq!(path.replay(&start).unwrap().to_string(), "AB");
        assert_eq!(path.par(), 1);

        let bad = SolutionPath::new(vec![Move::swap(
            GridPosition::new(0, 0),
            GridPosition::new(0, 5),
        )]);
        assert!(bad.replay(&start).is_err());
    }

    #[test]
    fn test_unsolved_has_no_path() {
        let result = SolvabilityResult::unsolved(SearchTermination::Deadline, 10);
        assert!(!result.is_solvable());
        assert!(result.solution_path().is_none());
        assert!(result.termination().is_bounded());
        assert_eq!(result.into_parts(), (false, None));
    }
}
