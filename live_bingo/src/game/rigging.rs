//! Forced call sequence construction.
//!
//! Given a target card and a pattern, the rigger computes the numbers the
//! card still needs and lays them out so the card is guaranteed to complete
//! the pattern on one specific, randomized call index, interleaved with
//! filler numbers so the sequence is indistinguishable from a random draw.

use rand::Rng;
use rand::seq::{IndexedRandom, SliceRandom};
use std::collections::HashSet;
use std::ops::RangeInclusive;

use super::constants::{BINGO_MAX_NUMBER, DEFAULT_WIN_INDEX_RANGE};
use super::entities::{Card, CardId, Pattern, PatternChoice};
use super::errors::{GameError, GameResult};
use super::patterns;

/// A computed rig: the forced call order plus the bookkeeping a session
/// needs to remember about it.
#[derive(Clone, Debug)]
pub struct Rig {
    pub target_card_id: CardId,
    /// Concrete pattern picked when the session was declared `all` or
    /// `diagonal`; `None` when the declared pattern was already concrete.
    pub resolved_pattern: Option<Pattern>,
    /// Numbers the target card still needed at construction time.
    pub required: Vec<u8>,
    /// Forced call order; the final element is the guaranteed winning call.
    pub sequence: Vec<u8>,
    /// 1-indexed call on which the target card completes the pattern.
    pub win_index: usize,
}

/// Builds forced call sequences.
#[derive(Clone, Debug)]
pub struct SequenceRigger {
    win_index_range: RangeInclusive<usize>,
}

impl Default for SequenceRigger {
    fn default() -> Self {
        let (lo, hi) = DEFAULT_WIN_INDEX_RANGE;
        Self {
            win_index_range: lo..=hi,
        }
    }
}

impl SequenceRigger {
    #[must_use]
    pub fn new(win_index_range: RangeInclusive<usize>) -> Self {
        Self { win_index_range }
    }

    /// Compute a rig for `card` under `choice`, taking already-called
    /// numbers into account: cells the card already has marked are not
    /// required again, and fillers never collide with prior calls.
    pub fn build<R: Rng + ?Sized>(
        &self,
        card: &Card,
        choice: PatternChoice,
        already_called: &[u8],
        rng: &mut R,
    ) -> GameResult<Rig> {
        let called: HashSet<u8> = already_called.iter().copied().collect();

        // Resolve `all`/`diagonal` to one concrete pattern, exactly once.
        let (effective, resolved_pattern) = match choice {
            PatternChoice::Auto => {
                let pattern = *Pattern::ALL
                    .choose(rng)
                    .expect("pattern list is non-empty");
                (PatternChoice::Declared(pattern), Some(pattern))
            }
            PatternChoice::AnyDiagonal => {
                let pattern = *[Pattern::MainDiagonal, Pattern::OtherDiagonal]
                    .choose(rng)
                    .expect("diagonal list is non-empty");
                (PatternChoice::Declared(pattern), Some(pattern))
            }
            concrete => (concrete, None),
        };

        let mut required: Vec<u8> =
            patterns::required_for_choice(&card.grid, &called, effective)
                .into_iter()
                .collect();

        if required.is_empty() {
            // The card already satisfies the pattern; nothing to force.
            return Ok(Rig {
                target_card_id: card.id,
                resolved_pattern,
                required,
                sequence: Vec::new(),
                win_index: 0,
            });
        }

        required.shuffle(rng);
        let k = required.len();
        let win_index = rng
            .random_range(self.win_index_range.clone())
            .max(k);

        // The last required number lands on the win call itself; the other
        // K-1 are scattered among the first W-1 slots.
        let final_number = required[k - 1];
        let mut slots: Vec<Option<u8>> = vec![None; win_index];
        slots[win_index - 1] = Some(final_number);
        let scatter = rand::seq::index::sample(rng, win_index - 1, k - 1);
        for (required_idx, slot) in scatter.iter().enumerate() {
            slots[slot] = Some(required[required_idx]);
        }

        // Fill the gaps with unique numbers disjoint from the requirements
        // and from everything already called.
        let required_set: HashSet<u8> = required.iter().copied().collect();
        let mut fillers: Vec<u8> = (1..=BINGO_MAX_NUMBER)
            .filter(|n| !required_set.contains(n) && !called.contains(n))
            .collect();
        fillers.shuffle(rng);

        let gap_count = slots.iter().filter(|slot| slot.is_none()).count();
        if fillers.len() < gap_count {
            return Err(GameError::Exhausted);
        }

        let mut filler_iter = fillers.into_iter();
        let sequence: Vec<u8> = slots
            .into_iter()
            .map(|slot| match slot {
                Some(n) => n,
                None => filler_iter.next().expect("filler pool covers every gap"),
            })
            .collect();

        Ok(Rig {
            target_card_id: card.id,
            resolved_pattern,
            required,
            sequence,
            win_index,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::constants::{FREE_CELL, GRID_SIZE};
    use crate::game::entities::CardGrid;

    fn test_card() -> Card {
        let mut rng = rand::rng();
        Card::generate(7, &mut rng)
    }

    #[test]
    fn rig_contains_every_required_number_exactly_once() {
        let card = test_card();
        let rigger = SequenceRigger::default();
        let mut rng = rand::rng();
        let rig = rigger
            .build(&card, PatternChoice::Declared(Pattern::Cross), &[], &mut rng)
            .unwrap();

        assert_eq!(rig.sequence.len(), rig.win_index);
        for n in &rig.required {
            assert_eq!(rig.sequence.iter().filter(|m| *m == n).count(), 1);
        }
        assert!(
            rig.required.contains(&rig.sequence[rig.win_index - 1]),
            "final call must be a required number"
        );
    }

    #[test]
    fn rig_win_index_stays_in_range() {
        let card = test_card();
        let rigger = SequenceRigger::default();
        let mut rng = rand::rng();
        for _ in 0..50 {
            let rig = rigger
                .build(&card, PatternChoice::Auto, &[], &mut rng)
                .unwrap();
            assert!((10..=15).contains(&rig.win_index));
            assert!(rig.resolved_pattern.is_some());
        }
    }

    #[test]
    fn rig_excludes_numbers_already_called() {
        let card = test_card();
        let cross_numbers: Vec<u8> = [(1usize, 1usize), (1, 3), (3, 1), (3, 3)]
            .iter()
            .map(|&(r, c)| card.grid.0[r][c].unwrap())
            .collect();
        let already_called = vec![cross_numbers[0]];

        let rigger = SequenceRigger::default();
        let mut rng = rand::rng();
        let rig = rigger
            .build(
                &card,
                PatternChoice::Declared(Pattern::Cross),
                &already_called,
                &mut rng,
            )
            .unwrap();

        assert_eq!(rig.required.len(), 3);
        assert!(!rig.sequence.contains(&cross_numbers[0]));
    }

    #[test]
    fn rig_is_empty_when_card_already_wins() {
        let mut cells = [[None; GRID_SIZE]; GRID_SIZE];
        let mut n = 1u8;
        for row in 0..GRID_SIZE {
            for col in 0..GRID_SIZE {
                if (row, col) != FREE_CELL {
                    cells[row][col] = Some(n);
                    n += 1;
                }
            }
        }
        let card = Card {
            id: 3,
            grid: CardGrid(cells),
        };
        let cross: Vec<u8> = [(1usize, 1usize), (1, 3), (3, 1), (3, 3)]
            .iter()
            .map(|&(r, c)| card.grid.0[r][c].unwrap())
            .collect();

        let rigger = SequenceRigger::default();
        let mut rng = rand::rng();
        let rig = rigger
            .build(&card, PatternChoice::Declared(Pattern::Cross), &cross, &mut rng)
            .unwrap();
        assert!(rig.sequence.is_empty());
        assert_eq!(rig.win_index, 0);
    }

    #[test]
    fn both_diagonals_rig_forces_the_union() {
        let card = test_card();
        let rigger = SequenceRigger::default();
        let mut rng = rand::rng();
        let rig = rigger
            .build(&card, PatternChoice::BothDiagonals, &[], &mut rng)
            .unwrap();
        // Eight distinct diagonal cells besides FREE.
        assert_eq!(rig.required.len(), 8);
        assert!(rig.resolved_pattern.is_none());
    }
}
