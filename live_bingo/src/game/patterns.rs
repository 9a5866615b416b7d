//! Pure pattern matching over marked 5x5 grids.
//!
//! The matcher is total over any well-formed grid and never mutates its
//! inputs. Alongside the boolean verdict it reports how many independent
//! lines are complete, which the `all` setting uses for reporting and
//! tie-breaking.

use std::collections::BTreeSet;
use std::collections::HashSet;

use super::constants::{FREE_CELL, GRID_SIZE};
use super::entities::{CardGrid, MarkedGrid, Pattern, PatternChoice};

/// Verdict of a pattern evaluation.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct MatchOutcome {
    pub wins: bool,
    /// Independently completed lines within the evaluated categories.
    pub completed_lines: u32,
}

/// Evaluate a marked grid against a pattern choice.
///
/// `Auto` is the logical OR of the six concrete patterns with the completed
/// line counts summed across every matching category.
#[must_use]
pub fn evaluate(grid: &MarkedGrid, choice: PatternChoice) -> MatchOutcome {
    match choice {
        PatternChoice::Declared(pattern) => evaluate_concrete(grid, pattern),
        PatternChoice::AnyDiagonal => {
            let main = evaluate_concrete(grid, Pattern::MainDiagonal);
            let other = evaluate_concrete(grid, Pattern::OtherDiagonal);
            MatchOutcome {
                wins: main.wins || other.wins,
                completed_lines: main.completed_lines + other.completed_lines,
            }
        }
        PatternChoice::BothDiagonals => {
            let main = evaluate_concrete(grid, Pattern::MainDiagonal);
            let other = evaluate_concrete(grid, Pattern::OtherDiagonal);
            MatchOutcome {
                wins: main.wins && other.wins,
                completed_lines: main.completed_lines + other.completed_lines,
            }
        }
        PatternChoice::Auto => {
            let mut wins = false;
            let mut completed_lines = 0;
            for pattern in Pattern::ALL {
                let outcome = evaluate_concrete(grid, pattern);
                wins |= outcome.wins;
                completed_lines += outcome.completed_lines;
            }
            MatchOutcome {
                wins,
                completed_lines,
            }
        }
    }
}

fn evaluate_concrete(grid: &MarkedGrid, pattern: Pattern) -> MatchOutcome {
    match pattern {
        Pattern::FourCornersCenter | Pattern::Cross | Pattern::MainDiagonal
        | Pattern::OtherDiagonal => {
            let wins = fixed_cells(pattern)
                .iter()
                .all(|&(row, col)| grid.is_marked(row, col));
            MatchOutcome {
                wins,
                completed_lines: u32::from(wins),
            }
        }
        Pattern::HorizontalLine => {
            let completed = (0..GRID_SIZE)
                .filter(|&row| (0..GRID_SIZE).all(|col| grid.is_marked(row, col)))
                .count() as u32;
            MatchOutcome {
                wins: completed > 0,
                completed_lines: completed,
            }
        }
        Pattern::VerticalLine => {
            let completed = (0..GRID_SIZE)
                .filter(|&col| (0..GRID_SIZE).all(|row| grid.is_marked(row, col)))
                .count() as u32;
            MatchOutcome {
                wins: completed > 0,
                completed_lines: completed,
            }
        }
    }
}

/// Cell positions of the fixed-shape patterns.
///
/// # Panics
///
/// Panics if called with a line pattern; lines are enumerated, not fixed.
fn fixed_cells(pattern: Pattern) -> &'static [(usize, usize)] {
    match pattern {
        Pattern::FourCornersCenter => &[(0, 0), (0, 4), (4, 0), (4, 4), FREE_CELL],
        Pattern::Cross => &[(1, 1), (1, 3), (3, 1), (3, 3), FREE_CELL],
        Pattern::MainDiagonal => &[(0, 0), (1, 1), FREE_CELL, (3, 3), (4, 4)],
        Pattern::OtherDiagonal => &[(0, 4), (1, 3), FREE_CELL, (3, 1), (4, 0)],
        Pattern::HorizontalLine | Pattern::VerticalLine => {
            unreachable!("line patterns are enumerated per row/column")
        }
    }
}

/// Companion selector for the rigger: the minimal set of numbers a card
/// still needs to complete `pattern`, given what has already been called.
///
/// FREE never contributes, and cells whose numbers were already called are
/// not required again. For the line patterns the row/column closest to
/// completion is targeted (ties break to the lowest index).
#[must_use]
pub fn required_numbers(
    card: &CardGrid,
    called: &HashSet<u8>,
    pattern: Pattern,
) -> BTreeSet<u8> {
    match pattern {
        Pattern::FourCornersCenter | Pattern::Cross | Pattern::MainDiagonal
        | Pattern::OtherDiagonal => cells_to_numbers(card, called, fixed_cells(pattern)),
        Pattern::HorizontalLine => {
            let rows: Vec<Vec<(usize, usize)>> = (0..GRID_SIZE)
                .map(|row| (0..GRID_SIZE).map(|col| (row, col)).collect())
                .collect();
            best_line(card, called, &rows)
        }
        Pattern::VerticalLine => {
            let cols: Vec<Vec<(usize, usize)>> = (0..GRID_SIZE)
                .map(|col| (0..GRID_SIZE).map(|row| (row, col)).collect())
                .collect();
            best_line(card, called, &cols)
        }
    }
}

/// Required numbers for a pattern choice as the rigger sees it: the caller
/// must already have resolved `Auto`/`AnyDiagonal` to a concrete pattern;
/// `BothDiagonals` is the union of both diagonal requirements.
#[must_use]
pub fn required_for_choice(
    card: &CardGrid,
    called: &HashSet<u8>,
    choice: PatternChoice,
) -> BTreeSet<u8> {
    match choice {
        PatternChoice::Declared(pattern) => required_numbers(card, called, pattern),
        PatternChoice::BothDiagonals => {
            let mut needed = required_numbers(card, called, Pattern::MainDiagonal);
            needed.extend(required_numbers(card, called, Pattern::OtherDiagonal));
            needed
        }
        PatternChoice::AnyDiagonal | PatternChoice::Auto => {
            unreachable!("auto patterns must be resolved before selecting requirements")
        }
    }
}

fn best_line(
    card: &CardGrid,
    called: &HashSet<u8>,
    lines: &[Vec<(usize, usize)>],
) -> BTreeSet<u8> {
    lines
        .iter()
        .map(|cells| cells_to_numbers(card, called, cells))
        .min_by_key(BTreeSet::len)
        .unwrap_or_default()
}

fn cells_to_numbers(
    card: &CardGrid,
    called: &HashSet<u8>,
    cells: &[(usize, usize)],
) -> BTreeSet<u8> {
    cells
        .iter()
        .filter_map(|&(row, col)| card.0[row][col])
        .filter(|n| !called.contains(n))
        .collect()
}
