//! Move history for puzzle play and scrambling
//!
//! Every move is invertible, so the history only needs the moves
//! themselves: undoing applies the inverse. Checkpoints mark positions the
//! caller can rewind to in one step.

use crate::core::Move;
use serde::{Deserialize, Serialize};

/// Stack of applied moves, most recent at the end
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveLog {
    moves: Vec<Move>,

    /// History length at each checkpoint
    checkpoints: Vec<usize>,
}

impl MoveLog {
    pub fn new() -> Self {
        MoveLog {
            moves: Vec::new(),
            checkpoints: Vec::new(),
        }
    }

    /// Record a move that has just been applied
    pub fn log(&mut self, mv: Move) {
        self.moves.push(mv);
    }

    /// Mark a checkpoint at the current history length
    pub fn mark_checkpoint(&mut self) {
        self.checkpoints.push(self.moves.len());
    }

    /// Get the most recent move without removing it
    pub fn peek(&self) -> Option<&Move> {
        self.moves.last()
    }

    /// Pop the most recent move
    ///
    /// Checkpoints past the new end are dropped.
    pub fn pop(&mut self) -> Option<Move> {
        let mv = self.moves.pop()?;
        let len = self.moves.len();
        self.checkpoints.retain(|&c| c <= len);
        Some(mv)
    }

    /// Moves recorded since the most recent checkpoint, most recent first
    ///
    /// Removes them and the checkpoint. With no checkpoint, drains everything.
    pub fn rewind_to_checkpoint(&mut self) -> Vec<Move> {
        let checkpoint = self.checkpoints.pop().unwrap_or(0);
        let mut undone: Vec<Move> = self.moves.drain(checkpoint..).collect();
        undone.reverse();
        undone
    }

    pub fn len(&self) -> usize {
        self.moves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }

    pub fn clear(&mut self) {
        self.moves.clear();
        self.checkpoints.clear();
    }

    /// All moves in the order they were applied
    pub fn moves(&self) -> &[Move] {
        &self.moves
    }

    /// The sequence that takes the current grid back to where the log started
    pub fn inverse_sequence(&self) -> Vec<Move> {
        self.moves.iter().rev().map(Move::inverse).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::GridPosition;

    fn cycle(r: u8) -> Move {
        Move::cycle(GridPosition::new(r, 0), true)
    }

    #[test]
    fn test_move_log() {
        let mut log = MoveLog::new();
        assert_eq!(log.len(), 0);

        log.log(cycle(1));
        assert_eq!(log.len(), 1);
        assert_eq!(log.peek(), Some(&cycle(1)));

        let popped = log.pop().unwrap();
        assert_eq!(popped, cycle(1));
        assert!(log.is_empty());
        assert_eq!(log.pop(), None);
    }

    #[test]
    fn test_checkpoints() {
        let mut log = MoveLog::new();
        log.log(cycle(0));
        log.log(cycle(1));
        log.mark_checkpoint();
        log.log(cycle(2));
        log.log(cycle(3));

        let undone = log.rewind_to_checkpoint();
        assert_eq!(undone, vec![cycle(3), cycle(2)]);
        assert_eq!(log.len(), 2);

        // No checkpoint left: rewind drains the rest
        let undone = log.rewind_to_checkpoint();
        assert_eq!(undone, vec![cycle(1), cycle(0)]);
        assert!(log.is_empty());
    }

    #[test]
    fn test_pop_drops_stale_checkpoints() {
        let mut log = MoveLog::new();
        log.log(cycle(0));
        log.mark_checkpoint();
        log.pop();
        log.log(cycle(5));

        // The checkpoint at length 1 was dropped when the log shrank to 0
        assert_eq!(log.rewind_to_checkpoint(), vec![cycle(5)]);
    }

    #[test]
    fn test_inverse_sequence() {
        let mut log = MoveLog::new();
        log.log(Move::cycle(GridPosition::new(0, 0), true));
        log.log(Move::swap(GridPosition::new(0, 0), GridPosition::new(0, 1)));

        assert_eq!(
            log.inverse_sequence(),
            vec![
                Move::swap(GridPosition::new(0, 0), GridPosition::new(0, 1)),
                Move::cycle(GridPosition::new(0, 0), false),
            ]
        );
    }
}
