//! Procedural puzzle generation
//!
//! A candidate is built by scrambling a solved layout, then handed to the
//! solvability validator, whose optimal length is the only one trusted.
//! Candidates that are unsolvable or too short are discarded, up to
//! `max_candidates` per call.

mod layout;

use crate::core::{DifficultyProfile, MoveSet, Puzzle};
use crate::logger::GenerationLogger;
use crate::solver::{
    calculate_par, SearchControl, SearchLimits, SolvabilityResult, SolvabilityValidator,
};
use crate::{PuzzleError, Result};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha12Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Golden-ratio stride for spreading derived seeds
const SEED_STRIDE: u64 = 0x9E3779B97F4A7C15;

/// Seed for the `index`-th derived stream of `base`
pub fn derive_seed(base: u64, index: u64) -> u64 {
    base.wrapping_add(index.wrapping_add(1).wrapping_mul(SEED_STRIDE))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Candidates tried per `generate` call before giving up
    pub max_candidates: usize,
    /// Extra random scramble moves beyond the minimum
    pub scramble_slack: usize,
    pub locked_tiles: usize,
    pub obstacle_tiles: usize,
    pub wildcard_tiles: usize,
    /// Allow symbol cycling in addition to swaps
    pub allow_cycles: bool,
    pub search: SearchLimits,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        GeneratorConfig {
            max_candidates: 32,
            scramble_slack: 2,
            locked_tiles: 0,
            obstacle_tiles: 0,
            wildcard_tiles: 0,
            allow_cycles: false,
            search: SearchLimits::default(),
        }
    }
}

impl GeneratorConfig {
    pub fn move_set(&self) -> MoveSet {
        if self.allow_cycles {
            MoveSet::with_cycles()
        } else {
            MoveSet::swaps_only()
        }
    }
}

/// A validated puzzle with its optimal solution and par
///
/// Only constructible from a solvable result that meets the requested
/// minimum; anything else is a bug in the caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationResult {
    puzzle: Puzzle,
    solvability: SolvabilityResult,
    par: u32,
    seed: u64,
}

impl GenerationResult {
    /// Panics if `solvability` is unsolvable or shorter than `minimum_moves`
    pub fn new(
        puzzle: Puzzle,
        solvability: SolvabilityResult,
        minimum_moves: usize,
        seed: u64,
    ) -> Self {
        assert!(
            solvability.is_solvable(),
            "GenerationResult built from an unsolvable puzzle"
        );
        assert!(
            solvability.moves_in_solution() >= minimum_moves,
            "GenerationResult solution of {} moves is below the minimum of {}",
            solvability.moves_in_solution(),
            minimum_moves
        );
        let par = calculate_par(&solvability);
        GenerationResult {
            puzzle,
            solvability,
            par,
            seed,
        }
    }

    pub fn puzzle(&self) -> &Puzzle {
        &self.puzzle
    }

    pub fn solvability(&self) -> &SolvabilityResult {
        &self.solvability
    }

    pub fn par(&self) -> u32 {
        self.par
    }

    /// Seed of the candidate stream that produced this puzzle
    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn into_puzzle(self) -> Puzzle {
        self.puzzle
    }
}

/// What happened to one candidate
enum Candidate {
    Accepted(GenerationResult),
    Rejected(String),
    Interrupted,
}

pub struct PuzzleGenerator {
    config: GeneratorConfig,
    seed: u64,
    rng: ChaCha12Rng,
    control: SearchControl,
    logger: Option<Arc<GenerationLogger>>,
}

impl PuzzleGenerator {
    pub fn new(config: GeneratorConfig, seed: u64) -> Self {
        PuzzleGenerator {
            config,
            seed,
            rng: ChaCha12Rng::seed_from_u64(seed),
            control: SearchControl::new(),
            logger: None,
        }
    }

    /// Stop signals checked between candidates and inside each search
    pub fn with_control(mut self, control: SearchControl) -> Self {
        self.control = control;
        self
    }

    pub fn with_logger(mut self, logger: Arc<GenerationLogger>) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    fn log(&self, message: &str) {
        if let Some(logger) = &self.logger {
            logger.detail("generator", message);
        }
    }

    /// Produce one validated puzzle for `profile`
    ///
    /// Fails with `InvalidProfile` before doing any work, and with
    /// `GenerationFailed` once `max_candidates` have been rejected or the
    /// control signals stop the run.
    pub fn generate(&mut self, profile: &DifficultyProfile) -> Result<GenerationResult> {
        profile.validate()?;

        let mut tried = 0;
        while tried < self.config.max_candidates {
            if self.control.interruption().is_some() {
                break;
            }
            tried += 1;
            match self.build_candidate(profile)? {
                Candidate::Accepted(result) => {
                    self.log(&format!(
                        "accepted candidate {} with par {} ({} nodes)",
                        tried,
                        result.par(),
                        result.solvability().nodes_expanded()
                    ));
                    return Ok(result);
                }
                Candidate::Rejected(reason) => {
                    self.log(&format!("rejected candidate {}: {}", tried, reason));
                }
                Candidate::Interrupted => break,
            }
        }
        Err(PuzzleError::GenerationFailed { candidates: tried })
    }

    /// Evaluate `candidates` independent seeds on the rayon pool
    ///
    /// The first accepted candidate raises a shared flag so sibling
    /// searches stop at their next expansion.
    pub fn generate_parallel(
        &self,
        profile: &DifficultyProfile,
        candidates: usize,
    ) -> Result<GenerationResult> {
        profile.validate()?;

        let found = Arc::new(AtomicBool::new(false));
        let outcome = (0..candidates as u64).into_par_iter().find_map_any(|index| {
            let mut control = self.control.clone();
            control.cancel.push(Arc::clone(&found));
            let seed = derive_seed(self.seed, index);
            let mut worker =
                PuzzleGenerator::new(self.config.clone(), seed).with_control(control);
            worker.logger = self.logger.clone();

            match worker.build_candidate(profile) {
                Ok(Candidate::Accepted(result)) => {
                    found.store(true, Ordering::Relaxed);
                    Some(Ok(result))
                }
                Ok(Candidate::Rejected(reason)) => {
                    worker.log(&format!("rejected parallel candidate {}: {}", index, reason));
                    None
                }
                Ok(Candidate::Interrupted) => None,
                Err(e) => Some(Err(e)),
            }
        });

        outcome.unwrap_or(Err(PuzzleError::GenerationFailed { candidates }))
    }

    fn build_candidate(&mut self, profile: &DifficultyProfile) -> Result<Candidate> {
        // A board that starts solved is not a puzzle, whatever the profile allows
        let minimum = profile.minimum_moves().max(1);
        let move_set = self.config.move_set();
        let (solved, goal) = layout::solved_layout(profile, &self.config, &mut self.rng)?;

        let length = minimum + self.rng.gen_range(0..=self.config.scramble_slack);
        let (scrambled, walk) = layout::scramble(&solved, &goal, move_set, length, &mut self.rng)?;
        if walk.len() < minimum {
            return Ok(Candidate::Rejected(format!(
                "scramble stalled after {} of {} moves",
                walk.len(),
                length
            )));
        }

        let puzzle = Puzzle::new(scrambled, goal, move_set);
        // The scramble's inverse is a solution, so nothing deeper is needed
        let limits = SearchLimits {
            max_depth: self.config.search.max_depth.min(walk.len()),
            ..self.config.search
        };
        let validator = SolvabilityValidator::new(limits).with_control(self.control.clone());

        let result = match validator.try_find_solution(&puzzle) {
            Ok(result) => result,
            Err(PuzzleError::PuzzleIntegrity(reason)) => {
                return Ok(Candidate::Rejected(format!("integrity: {}", reason)))
            }
            Err(e) => return Err(e),
        };

        if !result.is_solvable() {
            if self.control.interruption().is_some() {
                return Ok(Candidate::Interrupted);
            }
            return Ok(Candidate::Rejected(format!(
                "no solution ({:?} after {} nodes)",
                result.termination(),
                result.nodes_expanded()
            )));
        }
        if result.moves_in_solution() < minimum {
            return Ok(Candidate::Rejected(format!(
                "solves in {} moves, need {}",
                result.moves_in_solution(),
                minimum
            )));
        }

        Ok(Candidate::Accepted(GenerationResult::new(
            puzzle, result, minimum, self.seed,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::PuzzleType;
    use crate::logger::VerbosityLevel;

    #[test]
    fn test_generate_meets_minimum() {
        let profile = DifficultyProfile::new(3, 3, 3, PuzzleType::DirectMatch, 3);
        let mut generator = PuzzleGenerator::new(GeneratorConfig::default(), 42);
        let result = generator.generate(&profile).unwrap();

        assert!(result.solvability().is_solvable());
        assert!(result.par() >= 3);
        assert!(result.puzzle().matches_profile(&profile));
        assert!(!result.puzzle().is_solved().unwrap());
    }

    #[test]
    fn test_zero_minimum_still_needs_a_move() {
        let profile = DifficultyProfile::new(4, 4, 3, PuzzleType::DirectMatch, 0);
        for seed in 0..40 {
            let result = PuzzleGenerator::new(GeneratorConfig::default(), seed)
                .generate(&profile)
                .unwrap();
            assert!(result.par() >= 1, "seed {}", seed);
            assert!(!result.puzzle().is_solved().unwrap(), "seed {}", seed);
        }
    }

    #[test]
    fn test_generate_is_reproducible_per_seed() {
        let profile = DifficultyProfile::new(3, 3, 2, PuzzleType::DirectMatch, 2);
        let a = PuzzleGenerator::new(GeneratorConfig::default(), 7)
            .generate(&profile)
            .unwrap();
        let b = PuzzleGenerator::new(GeneratorConfig::default(), 7)
            .generate(&profile)
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_rule_based_generation() {
        let profile = DifficultyProfile::new(3, 3, 3, PuzzleType::RuleBased, 2);
        let mut generator = PuzzleGenerator::new(GeneratorConfig::default(), 5);
        let result = generator.generate(&profile).unwrap();
        assert_eq!(result.puzzle().puzzle_type(), PuzzleType::RuleBased);
        assert!(result.par() >= 2);
    }

    #[test]
    fn test_invalid_profile_rejected_up_front() {
        let profile = DifficultyProfile::new(4, 0, 3, PuzzleType::DirectMatch, 3);
        let err = PuzzleGenerator::new(GeneratorConfig::default(), 1)
            .generate(&profile)
            .unwrap_err();
        assert!(matches!(err, PuzzleError::InvalidProfile(_)));
    }

    #[test]
    fn test_impossible_profile_fails_after_cap() {
        // One symbol: every swap is a no-op, so nothing can be scrambled
        let profile = DifficultyProfile::new(3, 3, 1, PuzzleType::DirectMatch, 2);
        let config = GeneratorConfig {
            max_candidates: 5,
            ..GeneratorConfig::default()
        };
        let logger = Arc::new(GenerationLogger::capturing(VerbosityLevel::Verbose));
        let err = PuzzleGenerator::new(config, 1)
            .with_logger(Arc::clone(&logger))
            .generate(&profile)
            .unwrap_err();
        assert!(matches!(err, PuzzleError::GenerationFailed { candidates: 5 }));
        assert_eq!(logger.logs_in("generator").len(), 5);
    }

    #[test]
    fn test_cancelled_generator_stops() {
        let flag = Arc::new(AtomicBool::new(true));
        let mut control = SearchControl::new();
        control.cancel.push(flag);
        let err = PuzzleGenerator::new(GeneratorConfig::default(), 1)
            .with_control(control)
            .generate(&DifficultyProfile::default())
            .unwrap_err();
        assert!(matches!(err, PuzzleError::GenerationFailed { candidates: 0 }));
    }

    #[test]
    fn test_generate_parallel() {
        let profile = DifficultyProfile::new(3, 3, 3, PuzzleType::DirectMatch, 3);
        let generator = PuzzleGenerator::new(GeneratorConfig::default(), 11);
        let result = generator.generate_parallel(&profile, 8).unwrap();
        assert!(result.par() >= 3);
    }

    #[test]
    #[should_panic(expected = "unsolvable")]
    fn test_result_rejects_unsolvable() {
        use crate::core::Grid;
        use crate::solver::SearchTermination;
        let grid = Grid::from_rows(&["AB"]).unwrap();
        let puzzle = Puzzle::direct_match(grid.clone(), grid);
        GenerationResult::new(
            puzzle,
            SolvabilityResult::unsolved(SearchTermination::Exhausted, 0),
            0,
            0,
        );
    }
}
