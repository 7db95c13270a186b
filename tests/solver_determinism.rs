//! Solver determinism and optimality tests
//!
//! The solver must return the same shortest path for the same puzzle no
//! matter how often or from where it is called.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Instant;
use tile_forge_rs::{
    core::{DifficultyProfile, Grid, GridPosition, Move, MoveSet, Puzzle, PuzzleType},
    generator::{GeneratorConfig, PuzzleGenerator},
    solver::{
        calculate_par, efficiency_ratio, SearchLimits, SearchTermination, SolvabilityValidator,
    },
    Result,
};

fn rotated_board() -> Result<Puzzle> {
    let grid = Grid::from_rows(&["ABC", "CAB", "BCA"])?;
    let target = Grid::from_rows(&["ABC", "ABC", "ABC"])?;
    Ok(Puzzle::direct_match(grid, target))
}

#[test]
fn test_repeated_solves_agree() -> Result<()> {
    let puzzle = rotated_board()?;
    let validator = SolvabilityValidator::default();

    let first = validator.try_find_solution(&puzzle)?;
    assert!(first.is_solvable());
    for _ in 0..5 {
        let again = validator.try_find_solution(&puzzle)?;
        assert_eq!(again, first);
    }
    Ok(())
}

#[test]
fn test_solves_agree_across_threads() -> Result<()> {
    let puzzle = Arc::new(rotated_board()?);
    let expected = SolvabilityValidator::default().try_find_solution(&puzzle)?;

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let puzzle = Arc::clone(&puzzle);
            std::thread::spawn(move || SolvabilityValidator::default().try_find_solution(&puzzle))
        })
        .collect();
    for handle in handles {
        let result = handle.join().expect("solver thread panicked")?;
        assert_eq!(result, expected);
    }
    Ok(())
}

#[test]
fn test_solution_replays_to_goal() -> Result<()> {
    let mut puzzle = rotated_board()?;
    let result = SolvabilityValidator::default().try_find_solution(&puzzle)?;
    let path = result.solution_path().expect("board is solvable").clone();

    for mv in path.moves() {
        puzzle.apply_move(*mv)?;
    }
    assert!(puzzle.is_solved()?);
    assert_eq!(efficiency_ratio(path.par(), puzzle.history().len() as u32), 1.0);
    Ok(())
}

#[test]
fn test_cycles_shorten_the_solution() -> Result<()> {
    let grid = Grid::from_rows(&["AA"])?.with_alphabet(3)?;
    let target = Grid::from_rows(&["AC"])?;

    let cycling =
        Puzzle::direct_match(grid.clone(), target.clone()).with_move_set(MoveSet::with_cycles());
    let result = SolvabilityValidator::default().try_find_solution(&cycling)?;
    assert_eq!(result.moves_in_solution(), 1);
    assert_eq!(
        result.solution_path().map(|p| p.moves().to_vec()),
        Some(vec![Move::cycle(GridPosition::new(0, 1), false)])
    );

    // Without cycling the symbol cannot be produced at all
    let swapping = Puzzle::direct_match(grid, target);
    assert!(SolvabilityValidator::default()
        .try_find_solution(&swapping)
        .is_err());
    Ok(())
}

#[test]
fn test_bounds_are_reported() -> Result<()> {
    let puzzle = rotated_board()?;

    let shallow = SolvabilityValidator::default().with_max_depth(1);
    let result = shallow.try_find_solution(&puzzle)?;
    assert!(!result.is_solvable());
    assert_eq!(result.termination(), SearchTermination::DepthLimit);
    assert_eq!(calculate_par(&result), 0);

    let tiny = SolvabilityValidator::new(SearchLimits {
        max_nodes: 3,
        ..SearchLimits::default()
    });
    assert_eq!(
        tiny.try_find_solution(&puzzle)?.termination(),
        SearchTermination::NodeLimit
    );

    let late = SolvabilityValidator::default().with_deadline(Instant::now());
    assert_eq!(
        late.try_find_solution(&puzzle)?.termination(),
        SearchTermination::Deadline
    );

    let cancelled = SolvabilityValidator::default()
        .with_cancel_flag(Arc::new(AtomicBool::new(true)));
    assert_eq!(
        cancelled.try_find_solution(&puzzle)?.termination(),
        SearchTermination::Cancelled
    );
    Ok(())
}

#[test]
fn test_generated_par_is_optimal() -> Result<()> {
    let profile = DifficultyProfile::new(3, 3, 3, PuzzleType::DirectMatch, 3);
    for seed in [1, 2, 3] {
        let result = PuzzleGenerator::new(GeneratorConfig::default(), seed).generate(&profile)?;
        let fresh = SolvabilityValidator::default().try_find_solution(result.puzzle())?;
        assert_eq!(calculate_par(&fresh), result.par(), "seed {}", seed);
    }
    Ok(())
}
