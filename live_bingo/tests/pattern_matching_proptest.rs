//! Property-based tests for the pattern matcher.

use proptest::prelude::*;

use live_bingo::game::entities::{MarkedGrid, Pattern, PatternChoice};
use live_bingo::game::patterns::evaluate;

fn arb_marks() -> impl Strategy<Value = MarkedGrid> {
    proptest::array::uniform5(proptest::array::uniform5(any::<bool>())).prop_map(|mut m| {
        // FREE cell is always marked.
        m[2][2] = true;
        MarkedGrid(m)
    })
}

fn all_choices() -> Vec<PatternChoice> {
    let mut choices: Vec<PatternChoice> =
        Pattern::ALL.into_iter().map(PatternChoice::Declared).collect();
    choices.push(PatternChoice::AnyDiagonal);
    choices.push(PatternChoice::BothDiagonals);
    choices.push(PatternChoice::Auto);
    choices
}

#[test]
fn full_grid_wins_every_choice() {
    let grid = MarkedGrid([[true; 5]; 5]);
    for choice in all_choices() {
        let outcome = evaluate(&grid, choice);
        assert!(outcome.wins, "{choice:?} must win on a full grid");
    }
    // 5 rows + 5 columns + four fixed shapes.
    assert_eq!(evaluate(&grid, PatternChoice::Auto).completed_lines, 14);
}

#[test]
fn free_only_grid_wins_nothing() {
    let mut marks = [[false; 5]; 5];
    marks[2][2] = true;
    let grid = MarkedGrid(marks);
    for choice in all_choices() {
        assert!(!evaluate(&grid, choice).wins, "{choice:?} won on FREE alone");
    }
}

#[test]
fn any_diagonal_accepts_either_but_both_requires_both() {
    let mut marks = [[false; 5]; 5];
    for i in 0..5 {
        marks[i][i] = true;
    }
    let main_only = MarkedGrid(marks);
    assert!(evaluate(&main_only, PatternChoice::AnyDiagonal).wins);
    assert!(!evaluate(&main_only, PatternChoice::BothDiagonals).wins);

    for i in 0..5 {
        marks[i][4 - i] = true;
    }
    let both = MarkedGrid(marks);
    assert!(evaluate(&both, PatternChoice::BothDiagonals).wins);
}

proptest! {
    /// Marking one more cell never loses a win or drops a completed line.
    #[test]
    fn marking_is_monotone(grid in arb_marks(), row in 0usize..5, col in 0usize..5) {
        let mut more = grid;
        more.0[row][col] = true;
        for choice in all_choices() {
            let before = evaluate(&grid, choice);
            let after = evaluate(&more, choice);
            prop_assert!(!before.wins || after.wins);
            prop_assert!(after.completed_lines >= before.completed_lines);
        }
    }

    /// A fixed-shape pattern wins exactly when all of its cells are marked.
    #[test]
    fn fixed_patterns_match_their_cells(grid in arb_marks()) {
        let shapes: [(Pattern, &[(usize, usize)]); 4] = [
            (Pattern::FourCornersCenter, &[(0, 0), (0, 4), (4, 0), (4, 4), (2, 2)]),
            (Pattern::Cross, &[(1, 1), (1, 3), (3, 1), (3, 3), (2, 2)]),
            (Pattern::MainDiagonal, &[(0, 0), (1, 1), (2, 2), (3, 3), (4, 4)]),
            (Pattern::OtherDiagonal, &[(0, 4), (1, 3), (2, 2), (3, 1), (4, 0)]),
        ];
        for (pattern, cells) in shapes {
            let expected = cells.iter().all(|&(r, c)| grid.is_marked(r, c));
            let outcome = evaluate(&grid, PatternChoice::Declared(pattern));
            prop_assert_eq!(outcome.wins, expected);
        }
    }

    /// Line patterns count completed rows/columns exactly.
    #[test]
    fn line_counts_are_exact(grid in arb_marks()) {
        let rows = (0..5).filter(|&r| (0..5).all(|c| grid.is_marked(r, c))).count() as u32;
        let cols = (0..5).filter(|&c| (0..5).all(|r| grid.is_marked(r, c))).count() as u32;

        let horizontal = evaluate(&grid, PatternChoice::Declared(Pattern::HorizontalLine));
        prop_assert_eq!(horizontal.completed_lines, rows);
        prop_assert_eq!(horizontal.wins, rows > 0);

        let vertical = evaluate(&grid, PatternChoice::Declared(Pattern::VerticalLine));
        prop_assert_eq!(vertical.completed_lines, cols);
        prop_assert_eq!(vertical.wins, cols > 0);
    }

    /// `all` wins exactly when at least one concrete pattern wins.
    #[test]
    fn auto_is_the_or_of_concrete_patterns(grid in arb_marks()) {
        let any_concrete = Pattern::ALL
            .into_iter()
            .any(|p| evaluate(&grid, PatternChoice::Declared(p)).wins);
        prop_assert_eq!(evaluate(&grid, PatternChoice::Auto).wins, any_concrete);
    }
}
