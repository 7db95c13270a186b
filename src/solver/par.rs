//! Par calculation
//!
//! This is the only place par is derived. Scoring elsewhere is a pure
//! function of `(par, moves_taken)` and never looks at generation.

use crate::solver::SolvabilityResult;

/// Par for a validated puzzle: its optimal move count, or 0 if unsolvable
pub fn calculate_par(result: &SolvabilityResult) -> u32 {
    if !result.is_solvable() {
        return 0;
    }
    result
        .solution_path()
        .map(|path| path.par())
        .unwrap_or(result.moves_in_solution() as u32)
}

/// How close a player came to par, in `[0, 1]`
///
/// Solving in par (or better) scores 1.0. An already-solved puzzle
/// (par 0) scores 1.0 only if no moves were taken.
pub fn efficiency_ratio(par: u32, moves_taken: u32) -> f64 {
    match (par, moves_taken) {
        (0, 0) => 1.0,
        (0, _) | (_, 0) => 0.0,
        (par, taken) => (par as f64 / taken as f64).min(1.0),
    }
}
