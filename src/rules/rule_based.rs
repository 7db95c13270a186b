//! Declarative rule sets
//!
//! A rule pairs a [`Condition`] with an [`Enforcement`] and a [`RuleScope`]
//! that says when it is consulted. Level completion requires every
//! completion rule to be satisfied; the other scopes gate moves.

use crate::core::{Grid, GridPosition, Move, MoveSet, Symbol, TileState};
use crate::rules::GoalEvaluator;
use crate::{PuzzleError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// When a rule is consulted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RuleScope {
    /// Goal test
    LevelCompletion,
    /// Checked against the grid a move would produce
    MoveValidation,
    /// Checked against the move itself and the tiles it touches
    TileInteraction,
    /// Checked only for moves involving a wildcard tile
    SpecialTileTrigger,
}

/// Whether the condition must hold or must not hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Enforcement {
    Require,
    Forbid,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Condition {
    /// The tile at `position` shows `symbol` (wildcards show anything)
    SymbolAt {
        position: GridPosition,
        symbol: Symbol,
    },
    /// Every scored tile in the row shares one symbol
    RowUniform { row: u8 },
    /// Every scored tile in the column shares one symbol
    ColumnUniform { column: u8 },
    /// No two adjacent scored tiles share a symbol
    NoAdjacentMatch,
    /// The move swaps a `first` tile with a `second` tile (either order)
    SwapsSymbols { first: Symbol, second: Symbol },
}

impl Condition {
    /// Evaluate against a grid, optionally in the context of a move made from `before`
    pub fn holds(&self, grid: &Grid, context: Option<(&Grid, &Move)>) -> bool {
        match self {
            Condition::SymbolAt { position, symbol } => match grid.tile(*position) {
                Some(tile) if tile.state == TileState::Wildcard => true,
                Some(tile) if tile.state == TileState::Obstacle => false,
                Some(tile) => tile.symbol == *symbol,
                None => false,
            },
            Condition::RowUniform { row } => uniform(
                grid.row(*row)
                    .filter(|t| t.state.is_scored())
                    .map(|t| t.symbol),
            ),
            Condition::ColumnUniform { column } => uniform(
                grid.column(*column)
                    .filter(|t| t.state.is_scored())
                    .map(|t| t.symbol),
            ),
            Condition::NoAdjacentMatch => grid.tiles().filter(|t| t.state.is_scored()).all(|t| {
                t.position
                    .neighbors(grid.width(), grid.height())
                    .filter(|n| *n > t.position)
                    .filter_map(|n| grid.tile(n))
                    .all(|n| !n.state.is_scored() || n.symbol != t.symbol)
            }),
            Condition::SwapsSymbols { first, second } => match context {
                Some((before, Move::Swap { a, b })) => {
                    match (before.symbol_at(*a), before.symbol_at(*b)) {
                        (Some(sa), Some(sb)) => {
                            (sa == *first && sb == *second) || (sa == *second && sb == *first)
                        }
                        _ => false,
                    }
                }
                _ => false,
            },
        }
    }

    /// Check that the condition refers only to things that exist on `grid`
    fn check_bounds(&self, grid: &Grid) -> std::result::Result<(), String> {
        match self {
            Condition::SymbolAt { position, symbol } => {
                if !grid.contains(*position) {
                    return Err(format!("position {} is off the grid", position));
                }
                if symbol.index() >= grid.alphabet() {
                    return Err(format!("symbol {} is outside the alphabet", symbol));
                }
                Ok(())
            }
            Condition::RowUniform { row } if *row >= grid.height() => {
                Err(format!("row {} is off the grid", row))
            }
            Condition::ColumnUniform { column } if *column >= grid.width() => {
                Err(format!("column {} is off the grid", column))
            }
            _ => Ok(()),
        }
    }
}

fn uniform(mut symbols: impl Iterator<Item = Symbol>) -> bool {
    match symbols.next() {
        Some(first) => symbols.all(|s| s == first),
        None => true,
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::SymbolAt { position, symbol } => write!(f, "{} at {}", symbol, position),
            Condition::RowUniform { row } => write!(f, "row {} uniform", row),
            Condition::ColumnUniform { column } => write!(f, "column {} uniform", column),
            Condition::NoAdjacentMatch => write!(f, "no adjacent match"),
            Condition::SwapsSymbols { first, second } => write!(f, "swap {}<->{}", first, second),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rule {
    pub name: String,
    pub scope: RuleScope,
    pub condition: Condition,
    pub enforcement: Enforcement,
}

impl Rule {
    pub fn new(
        name: impl Into<String>,
        scope: RuleScope,
        condition: Condition,
        enforcement: Enforcement,
    ) -> Self {
        Rule {
            name: name.into(),
            scope,
            condition,
            enforcement,
        }
    }

    /// A level-completion requirement
    pub fn require(name: impl Into<String>, condition: Condition) -> Self {
        Rule::new(name, RuleScope::LevelCompletion, condition, Enforcement::Require)
    }

    /// Verdict of this rule for a grid
    pub fn is_satisfied(&self, grid: &Grid, context: Option<(&Grid, &Move)>) -> bool {
        let holds = self.condition.holds(grid, context);
        match self.enforcement {
            Enforcement::Require => holds,
            Enforcement::Forbid => !holds,
        }
    }

    /// One `RowUniform` completion rule per row
    pub fn uniform_rows(height: u8) -> Vec<Rule> {
        (0..height)
            .map(|row| Rule::require(format!("row-{}-uniform", row), Condition::RowUniform { row }))
            .collect()
    }
}

pub struct RuleBasedEvaluator<'a> {
    rules: &'a [Rule],
}

impl<'a> RuleBasedEvaluator<'a> {
    pub fn new(rules: &'a [Rule]) -> Self {
        RuleBasedEvaluator { rules }
    }

    fn scoped(&self, scope: RuleScope) -> impl Iterator<Item = &'a Rule> {
        self.rules.iter().filter(move |r| r.scope == scope)
    }

    /// Find a pair of completion rules whose verdicts disagree on `grid`
    /// although they judge the same condition
    fn find_conflict(&self, verdicts: &[(&Rule, bool)]) -> Option<(String, String)> {
        for (i, (first, first_verdict)) in verdicts.iter().enumerate() {
            for (second, second_verdict) in &verdicts[i + 1..] {
                if first.condition == second.condition && first_verdict != second_verdict {
                    return Some((first.name.clone(), second.name.clone()));
                }
            }
        }
        None
    }

    /// Find two completion rules that require different symbols on one
    /// non-wildcard tile, which no grid can satisfy together
    fn find_exclusive_requirements(&self, grid: &Grid) -> Option<(String, String)> {
        let required: Vec<(&Rule, GridPosition, Symbol)> = self
            .scoped(RuleScope::LevelCompletion)
            .filter(|rule| rule.enforcement == Enforcement::Require)
            .filter_map(|rule| match rule.condition {
                Condition::SymbolAt { position, symbol } => Some((rule, position, symbol)),
                _ => None,
            })
            .collect();

        for (i, (first, position, symbol)) in required.iter().enumerate() {
            if grid.state_at(*position) == Some(TileState::Wildcard) {
                continue;
            }
            let clash = required[i + 1..]
                .iter()
                .find(|(_, other_position, other_symbol)| {
                    other_position == position && other_symbol != symbol
                });
            if let Some((second, _, _)) = clash {
                return Some((first.name.clone(), second.name.clone()));
            }
        }
        None
    }
}

impl GoalEvaluator for RuleBasedEvaluator<'_> {
    fn name(&self) -> &'static str {
        "RuleBased"
    }

    fn is_goal_met(&self, grid: &Grid) -> Result<bool> {
        let verdicts: Vec<(&Rule, bool)> = self
            .scoped(RuleScope::LevelCompletion)
            .map(|rule| (rule, rule.is_satisfied(grid, None)))
            .collect();

        let conflict = self
            .find_conflict(&verdicts)
            .or_else(|| self.find_exclusive_requirements(grid));
        if let Some((first, second)) = conflict {
            return Err(PuzzleError::RuleConflict { first, second });
        }
        Ok(!verdicts.is_empty() && verdicts.iter().all(|(_, ok)| *ok))
    }

    fn check_integrity(&self, grid: &Grid, _move_set: MoveSet) -> Result<()> {
        if self.scoped(RuleScope::LevelCompletion).next().is_none() {
            return Err(PuzzleError::PuzzleIntegrity(
                "rule set has no level-completion rule".to_string(),
            ));
        }

        for rule in self.rules {
            rule.condition.check_bounds(grid).map_err(|reason| {
                PuzzleError::PuzzleIntegrity(format!("rule '{}': {}", rule.name, reason))
            })?;

            if rule.scope != RuleScope::LevelCompletion
                || rule.enforcement != Enforcement::Require
            {
                continue;
            }
            if let Condition::SymbolAt { position, symbol } = &rule.condition {
                match grid.tile(*position) {
                    Some(tile) if tile.state == TileState::Obstacle => {
                        return Err(PuzzleError::PuzzleIntegrity(format!(
                            "rule '{}' requires a symbol on obstacle {}",
                            rule.name, position
                        )));
                    }
                    Some(tile) if tile.state == TileState::Locked && tile.symbol != *symbol => {
                        return Err(PuzzleError::PuzzleIntegrity(format!(
                            "rule '{}' requires {} on locked tile {}",
                            rule.name, symbol, tile
                        )));
                    }
                    _ => {}
                }
            }
        }

        // Opposite enforcement of one completion condition contradicts itself on every state
        let verdicts: Vec<(&Rule, bool)> = self
            .scoped(RuleScope::LevelCompletion)
            .map(|rule| (rule, rule.enforcement == Enforcement::Require))
            .collect();
        let conflict = self
            .find_conflict(&verdicts)
            .or_else(|| self.find_exclusive_requirements(grid));
        if let Some((first, second)) = conflict {
            return Err(PuzzleError::RuleConflict { first, second });
        }
        Ok(())
    }

    fn allows_move(&self, before: &Grid, mv: &Move, after: &Grid) -> Result<bool> {
        let context = Some((before, mv));

        if !self
            .scoped(RuleScope::MoveValidation)
            .all(|rule| rule.is_satisfied(after, context))
        {
            return Ok(false);
        }

        if !self
            .scoped(RuleScope::TileInteraction)
            .all(|rule| rule.is_satisfied(before, context))
        {
            return Ok(false);
        }

        let touches_wildcard = mv
            .positions()
            .any(|p| before.state_at(p) == Some(TileState::Wildcard));
        if touches_wildcard
            && !self
                .scoped(RuleScope::SpecialTileTrigger)
                .all(|rule| rule.is_satisfied(after, context))
        {
            return Ok(false);
        }

        Ok(true)
    }
}
