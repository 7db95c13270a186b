//! Direct-match goal: the grid must equal a target pattern

use crate::core::{Grid, GridPosition, MoveSet, TileState};
use crate::rules::GoalEvaluator;
use crate::{PuzzleError, Result};
use rustc_hash::FxHashMap;

pub struct DirectMatchEvaluator<'a> {
    target: &'a Grid,
}

impl<'a> DirectMatchEvaluator<'a> {
    pub fn new(target: &'a Grid) -> Self {
        DirectMatchEvaluator { target }
    }

    /// Connected regions of swappable tiles
    ///
    /// Adjacent swaps generate every permutation within a region and nothing
    /// across regions, so each region must already hold the symbols its
    /// target asks for.
    fn swap_regions(grid: &Grid) -> Vec<Vec<GridPosition>> {
        let mut seen = vec![false; grid.len()];
        let mut regions = Vec::new();

        for start in grid.positions() {
            let idx = start.index(grid.width());
            if seen[idx] || !grid.state_at(start).is_some_and(|s| s.can_swap()) {
                continue;
            }
            seen[idx] = true;
            let mut region = vec![start];
            let mut stack = vec![start];
            while let Some(pos) = stack.pop() {
                for next in pos.neighbors(grid.width(), grid.height()) {
                    let nidx = next.index(grid.width());
                    if !seen[nidx] && grid.state_at(next).is_some_and(|s| s.can_swap()) {
                        seen[nidx] = true;
                        region.push(next);
                        stack.push(next);
                    }
                }
            }
            regions.push(region);
        }
        regions
    }
}

impl GoalEvaluator for DirectMatchEvaluator<'_> {
    fn name(&self) -> &'static str {
        "DirectMatch"
    }

    fn is_goal_met(&self, grid: &Grid) -> Result<bool> {
        if grid.width() != self.target.width() || grid.height() != self.target.height() {
            return Ok(false);
        }
        Ok(grid.tiles().all(|tile| {
            !tile.state.is_scored() || self.target.symbol_at(tile.position) == Some(tile.symbol)
        }))
    }

    fn check_integrity(&self, grid: &Grid, move_set: MoveSet) -> Result<()> {
        if grid.width() != self.target.width() || grid.height() != self.target.height() {
            return Err(PuzzleError::PuzzleIntegrity(format!(
                "grid is {}x{} but target is {}x{}",
                grid.width(),
                grid.height(),
                self.target.width(),
                self.target.height()
            )));
        }

        // Locked tiles never change, so they must already match
        for tile in grid.tiles() {
            if tile.state == TileState::Locked
                && self.target.symbol_at(tile.position) != Some(tile.symbol)
            {
                return Err(PuzzleError::PuzzleIntegrity(format!(
                    "locked tile {} can never become {}",
                    tile,
                    self.target
                        .symbol_at(tile.position)
                        .map(|s| s.to_string())
                        .unwrap_or_default()
                )));
            }
        }

        // With cycling, any default tile can reach any symbol
        if move_set.cycles {
            return Ok(());
        }

        let frozen_mismatch = grid.tiles().find(|tile| {
            tile.state == TileState::Default
                && !move_set.swaps
                && self.target.symbol_at(tile.position) != Some(tile.symbol)
        });
        if let Some(tile) = frozen_mismatch {
            return Err(PuzzleError::PuzzleIntegrity(format!(
                "tile {} cannot move under this move set",
                tile
            )));
        }

        for region in Self::swap_regions(grid) {
            let mut available: FxHashMap<_, i32> = FxHashMap::default();
            for pos in &region {
                if let Some(symbol) = grid.symbol_at(*pos) {
                    *available.entry(symbol).or_insert(0) += 1;
                }
            }
            for pos in &region {
                if grid.state_at(*pos) != Some(TileState::Default) {
                    continue;
                }
                if let Some(wanted) = self.target.symbol_at(*pos) {
                    let count = available.entry(wanted).or_insert(0);
                    *count -= 1;
                    if *count < 0 {
                        return Err(PuzzleError::PuzzleIntegrity(format!(
                            "region around {} lacks enough {} tiles; obstacles or locks cut it off",
                            region[0], wanted
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_goal_ignores_wildcards_and_obstacles() {
        let target = Grid::from_rows(&["AB", "CA"]).unwrap();
        let evaluator = DirectMatchEvaluator::new(&target);

        let same = Grid::from_rows(&["AB", "CA"]).unwrap();
        assert!(evaluator.is_goal_met(&same).unwrap());

        let wild = Grid::from_rows(&["A*", "#A"]).unwrap().with_alphabet(3).unwrap();
        assert!(evaluator.is_goal_met(&wild).unwrap());

        let wrong = Grid::from_rows(&["BA", "CA"]).unwrap();
        assert!(!evaluator.is_goal_met(&wrong).unwrap());
    }

    #[test]
    fn test_integrity_detects_locked_mismatch() {
        let target = Grid::from_rows(&["AB"]).unwrap();
        let grid = Grid::from_rows(&["bA"]).unwrap();
        let err = DirectMatchEvaluator::new(&target)
            .check_integrity(&grid, MoveSet::default())
            .unwrap_err();
        assert!(matches!(err, PuzzleError::PuzzleIntegrity(_)));
    }

    #[test]
    fn test_integrity_detects_obstacle_partition() {
        // The obstacle splits the row; the left region holds B but needs A
        let target = Grid::from_rows(&["A#B"]).unwrap();
        let grid = Grid::from_rows(&["B#A"]).unwrap();
        let evaluator = DirectMatchEvaluator::new(&target);
        let err = evaluator
            .check_integrity(&grid, MoveSet::default())
            .unwrap_err();
        assert!(matches!(err, PuzzleError::PuzzleIntegrity(_)));

        // Cycling can repair it
        assert!(evaluator.check_integrity(&grid, MoveSet::with_cycles()).is_ok());
    }

    #[test]
    fn test_integrity_passes_for_permutation() {
        let target = Grid::from_rows(&["AB", "BA"]).unwrap();
        let grid = Grid::from_rows(&["BB", "AA"]).unwrap();
        assert!(DirectMatchEvaluator::new(&target)
            .check_integrity(&grid, MoveSet::default())
            .is_ok());
    }
}
