//! Optional server-side confirmation of generated puzzles

use crate::core::Puzzle;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    #[error("Remote validator unavailable: {0}")]
    Unavailable(String),

    #[error("Remote validator sent an unusable reply: {0}")]
    Protocol(String),
}

/// A second opinion on a locally validated puzzle
///
/// Runs on a blocking worker, so implementations may do synchronous I/O.
/// `Ok(false)` rejects the attempt; any `Err` means the check could not be
/// made and the local verdict stands.
pub trait RemoteValidator: Send + Sync {
    fn confirm(&self, puzzle: &Puzzle, par: u32) -> Result<bool, RemoteError>;
}

impl<F> RemoteValidator for F
where
    F: Fn(&Puzzle, u32) -> Result<bool, RemoteError> + Send + Sync,
{
    fn confirm(&self, puzzle: &Puzzle, par: u32) -> Result<bool, RemoteError> {
        self(puzzle, par)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Grid;

    #[test]
    fn test_closure_validator() {
        let grid = Grid::from_rows(&["AB"]).unwrap();
        let puzzle = Puzzle::direct_match(grid.clone(), grid);

        let strict = |_: &Puzzle, par: u32| -> Result<bool, RemoteError> { Ok(par >= 3) };
        assert_eq!(strict.confirm(&puzzle, 2), Ok(false));

        let offline = |_: &Puzzle, _: u32| -> Result<bool, RemoteError> {
            Err(RemoteError::Unavailable("connection refused".to_string()))
        };
        assert!(matches!(
            offline.confirm(&puzzle, 5),
            Err(RemoteError::Unavailable(_))
        ));
    }
}
