//! Goal layouts and scrambling

use crate::core::{DifficultyProfile, Goal, Grid, Move, MoveSet, PuzzleType, Symbol, TileState};
use crate::generator::GeneratorConfig;
use crate::rules::{evaluator_for, Rule};
use crate::Result;
use rand::seq::SliceRandom;
use rand::Rng;

/// Build a solved grid and the goal it satisfies
pub(crate) fn solved_layout<R: Rng>(
    profile: &DifficultyProfile,
    config: &GeneratorConfig,
    rng: &mut R,
) -> Result<(Grid, Goal)> {
    let (width, height) = profile.dimensions();
    let alphabet = profile.symbol_count();
    let len = width as usize * height as usize;

    let symbols: Vec<Symbol> = match profile.puzzle_type {
        PuzzleType::DirectMatch => {
            // Every symbol at least once (when the grid has room), the rest random
            let mut symbols: Vec<Symbol> = (0..len)
                .map(|i| {
                    if i < alphabet as usize {
                        Symbol::new(i as u8)
                    } else {
                        Symbol::new(rng.gen_range(0..alphabet))
                    }
                })
                .collect();
            symbols.shuffle(rng);
            symbols
        }
        PuzzleType::RuleBased => (0..len)
            .map(|i| Symbol::new((i / width as usize % alphabet as usize) as u8))
            .collect(),
    };

    let states = place_special_tiles(len, config, rng);
    let grid = Grid::from_parts(width, height, alphabet, symbols, states)?;

    let goal = match profile.puzzle_type {
        PuzzleType::DirectMatch => Goal::DirectMatch {
            target: grid.clone(),
        },
        PuzzleType::RuleBased => Goal::RuleBased {
            rules: Rule::uniform_rows(height),
        },
    };
    Ok((grid, goal))
}

/// Tile states with the configured special tiles at random positions
///
/// At least two default tiles always remain so the grid can move.
fn place_special_tiles<R: Rng>(
    len: usize,
    config: &GeneratorConfig,
    rng: &mut R,
) -> Vec<TileState> {
    let mut states = vec![TileState::Default; len];
    let mut budget = len.saturating_sub(2);
    let mut positions: Vec<usize> = (0..len).collect();
    positions.shuffle(rng);
    let mut slots = positions.into_iter();

    for (state, wanted) in [
        (TileState::Obstacle, config.obstacle_tiles),
        (TileState::Locked, config.locked_tiles),
        (TileState::Wildcard, config.wildcard_tiles),
    ] {
        let count = wanted.min(budget);
        budget -= count;
        for idx in slots.by_ref().take(count) {
            states[idx] = state;
        }
    }
    states
}

/// Walk `length` random legal moves away from `solved`
///
/// The walk never immediately undoes its previous move. It stops early if
/// it runs out of moves, so the returned sequence may be shorter than asked.
pub(crate) fn scramble<R: Rng>(
    solved: &Grid,
    goal: &Goal,
    move_set: MoveSet,
    length: usize,
    rng: &mut R,
) -> Result<(Grid, Vec<Move>)> {
    let evaluator = evaluator_for(goal);
    let mut grid = solved.clone();
    let mut walk: Vec<Move> = Vec::with_capacity(length);
    let mut candidates = Vec::new();

    while walk.len() < length {
        let undo = walk
            .last()
            .map(|mv| mv.inverse().canonical(grid.alphabet()));
        candidates.clear();
        move_set.enumerate_into(&grid, &mut candidates);
        candidates.retain(|mv| Some(*mv) != undo);

        let mut options = Vec::with_capacity(candidates.len());
        for mv in &candidates {
            let next = grid.apply_unchecked(mv);
            if evaluator.allows_move(&grid, mv, &next)? {
                options.push((*mv, next));
            }
        }

        if options.is_empty() {
            break;
        }
        let pick = rng.gen_range(0..options.len());
        let (mv, next) = options.swap_remove(pick);
        walk.push(mv);
        grid = next;
    }
    Ok((grid, walk))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::GridPosition;
    use rand::SeedableRng;
    use rand_chacha::ChaCha12Rng;

    #[test]
    fn test_direct_match_uses_every_symbol() {
        let mut rng = ChaCha12Rng::seed_from_u64(7);
        let profile = DifficultyProfile::new(4, 4, 3, PuzzleType::DirectMatch, 4);
        let (grid, goal) = solved_layout(&profile, &GeneratorConfig::default(), &mut rng).unwrap();

        for s in 0..3 {
            assert!(grid.configuration().contains(&Symbol::new(s)));
        }
        assert!(evaluator_for(&goal).is_goal_met(&grid).unwrap());
    }

    #[test]
    fn test_rule_based_rows_are_uniform() {
        let mut rng = ChaCha12Rng::seed_from_u64(7);
        let profile = DifficultyProfile::new(3, 4, 2, PuzzleType::RuleBased, 2);
        let (grid, goal) = solved_layout(&profile, &GeneratorConfig::default(), &mut rng).unwrap();

        assert_eq!(grid.rows(), vec!["AAA", "BBB", "AAA", "BBB"]);
        assert!(evaluator_for(&goal).is_goal_met(&grid).unwrap());
    }

    #[test]
    fn test_special_tiles_leave_room_to_move() {
        let mut rng = ChaCha12Rng::seed_from_u64(1);
        let config = GeneratorConfig {
            obstacle_tiles: 10,
            locked_tiles: 10,
            ..GeneratorConfig::default()
        };
        let states = place_special_tiles(4, &config, &mut rng);
        assert_eq!(states.iter().filter(|s| **s == TileState::Default).count(), 2);
        assert_eq!(states.iter().filter(|s| **s == TileState::Obstacle).count(), 2);
    }

    #[test]
    fn test_scramble_never_undoes_previous_move() {
        let mut rng = ChaCha12Rng::seed_from_u64(99);
        let solved = Grid::from_rows(&["ABC", "CAB", "BCA"]).unwrap();
        let goal = Goal::DirectMatch {
            target: solved.clone(),
        };
        let (grid, walk) = scramble(&solved, &goal, MoveSet::default(), 12, &mut rng).unwrap();

        assert_eq!(walk.len(), 12);
        for pair in walk.windows(2) {
            assert_ne!(pair[1], pair[0].inverse());
        }
        let replayed = walk
            .iter()
            .try_fold(solved.clone(), |g, mv| g.apply(mv))
            .unwrap();
        assert_eq!(replayed, grid);
    }

    #[test]
    fn test_scramble_stops_when_stuck() {
        let mut rng = ChaCha12Rng::seed_from_u64(3);
        let solved = Grid::from_rows(&["AA"]).unwrap();
        let goal = Goal::DirectMatch {
            target: solved.clone(),
        };
        let (_, walk) = scramble(&solved, &goal, MoveSet::default(), 5, &mut rng).unwrap();
        assert!(walk.is_empty());
    }

    #[test]
    fn test_two_symbol_cycle_is_not_undone() {
        let mut rng = ChaCha12Rng::seed_from_u64(5);
        let solved = Grid::from_rows(&["A"]).unwrap().with_alphabet(2).unwrap();
        let goal = Goal::DirectMatch {
            target: solved.clone(),
        };
        let cycles_only = MoveSet {
            swaps: false,
            cycles: true,
        };
        let (grid, walk) = scramble(&solved, &goal, cycles_only, 3, &mut rng).unwrap();

        assert_eq!(walk, vec![Move::cycle(GridPosition::new(0, 0), true)]);
        assert_ne!(grid, solved);
    }
}
