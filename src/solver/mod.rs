//! Solvability validation
//!
//! Breadth-first search over the move graph. The first goal state reached
//! is at minimal depth, and because moves are enumerated in a fixed order
//! the same puzzle always yields the same solution path.

pub mod par;
pub mod solution;

pub use par::{calculate_par, efficiency_ratio};
pub use solution::{SearchTermination, SolutionPath, SolvabilityResult};

use crate::core::{Configuration, Grid, Move, Puzzle};
use crate::Result;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Bounds on a single search
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchLimits {
    /// Deepest move count explored
    pub max_depth: usize,
    /// Distinct configurations the search may discover
    pub max_nodes: usize,
    /// Wall-clock budget per call, in milliseconds
    pub time_budget_ms: Option<u64>,
}

impl Default for SearchLimits {
    fn default() -> Self {
        SearchLimits {
            max_depth: 24,
            max_nodes: 1_000_000,
            time_budget_ms: None,
        }
    }
}

/// Cooperative stop signals shared with the caller
#[derive(Debug, Clone, Default)]
pub struct SearchControl {
    pub deadline: Option<Instant>,
    pub cancel: Vec<Arc<AtomicBool>>,
}

impl SearchControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.iter().any(|flag| flag.load(Ordering::Relaxed))
    }

    pub fn is_expired(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// The reason to stop now, if any
    pub fn interruption(&self) -> Option<SearchTermination> {
        if self.is_cancelled() {
            Some(SearchTermination::Cancelled)
        } else if self.is_expired() {
            Some(SearchTermination::Deadline)
        } else {
            None
        }
    }
}

/// A discovered configuration, linked back to the state it came from
struct Node {
    grid: Grid,
    parent: usize,
    mv: Option<Move>,
    depth: usize,
}

#[derive(Debug, Clone, Default)]
pub struct SolvabilityValidator {
    limits: SearchLimits,
    control: SearchControl,
}

impl SolvabilityValidator {
    pub fn new(limits: SearchLimits) -> Self {
        SolvabilityValidator {
            limits,
            control: SearchControl::new(),
        }
    }

    pub fn with_control(mut self, control: SearchControl) -> Self {
        self.control = control;
        self
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.control.deadline = Some(match self.control.deadline {
            Some(existing) => existing.min(deadline),
            None => deadline,
        });
        self
    }

    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.control.cancel.push(flag);
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.limits.max_depth = max_depth;
        self
    }

    pub fn limits(&self) -> &SearchLimits {
        &self.limits
    }

    /// Search for a shortest solution from the puzzle's current grid
    ///
    /// Returns `Err` for integrity violations and rule conflicts. Running
    /// out of depth, nodes, time or being cancelled is not an error: the
    /// result is unsolvable with the reason in `termination`.
    pub fn try_find_solution(&self, puzzle: &Puzzle) -> Result<SolvabilityResult> {
        let evaluator = puzzle.evaluator();
        let move_set = puzzle.move_set();
        let start = puzzle.grid();

        evaluator.check_integrity(start, move_set)?;
        if evaluator.is_goal_met(start)? {
            return Ok(SolvabilityResult::solved(SolutionPath::empty(), 0));
        }

        let budget = self
            .limits
            .time_budget_ms
            .and_then(|ms| Instant::now().checked_add(Duration::from_millis(ms)));
        let control = match budget {
            Some(deadline) => self.clone().with_deadline(deadline).control,
            None => self.control.clone(),
        };

        let mut nodes = vec![Node {
            grid: start.clone(),
            parent: 0,
            mv: None,
            depth: 0,
        }];
        let mut visited: FxHashSet<Configuration> = FxHashSet::default();
        visited.insert(start.configuration().iter().copied().collect());
        let mut frontier = VecDeque::from([0usize]);
        let mut moves = Vec::with_capacity(4 * start.len());
        let mut nodes_expanded = 0;
        let mut depth_cut = false;

        while let Some(index) = frontier.pop_front() {
            if let Some(stop) = control.interruption() {
                return Ok(SolvabilityResult::unsolved(stop, nodes_expanded));
            }
            let depth = nodes[index].depth;
            if depth >= self.limits.max_depth {
                depth_cut = true;
                continue;
            }
            nodes_expanded += 1;

            let parent = nodes[index].grid.clone();
            moves.clear();
            move_set.enumerate_into(&parent, &mut moves);

            for mv in &moves {
                let child = parent.apply_unchecked(mv);
                if visited.contains(child.configuration()) {
                    continue;
                }
                // A state rejected via this move may still be reachable via another
                if !evaluator.allows_move(&parent, mv, &child)? {
                    continue;
                }
                if visited.len() >= self.limits.max_nodes {
                    return Ok(SolvabilityResult::unsolved(
                        SearchTermination::NodeLimit,
                        nodes_expanded,
                    ));
                }
                visited.insert(child.configuration().iter().copied().collect());

                let solved = evaluator.is_goal_met(&child)?;
                nodes.push(Node {
                    grid: child,
                    parent: index,
                    mv: Some(*mv),
                    depth: depth + 1,
                });
                if solved {
                    let path = Self::trace_path(&nodes, nodes.len() - 1);
                    return Ok(SolvabilityResult::solved(path, nodes_expanded));
                }
                frontier.push_back(nodes.len() - 1);
            }
        }

        let termination = if depth_cut {
            SearchTermination::DepthLimit
        } else {
            SearchTermination::Exhausted
        };
        Ok(SolvabilityResult::unsolved(termination, nodes_expanded))
    }

    fn trace_path(nodes: &[Node], mut index: usize) -> SolutionPath {
        let mut moves = Vec::with_capacity(nodes[index].depth);
        while let Some(mv) = nodes[index].mv {
            moves.push(mv);
            index = nodes[index].parent;
        }
        moves.reverse();
        SolutionPath::new(moves)
    }
}
