//! Core bingo entities: cards, grids, patterns, and session data.

use chrono::{DateTime, Utc};
use rand::Rng;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::constants::{BINGO_MAX_NUMBER, FREE_CELL, GRID_SIZE, JACKPOT_CONTRIBUTION_PERCENT};
use super::errors::GameError;

/// Tenant (cashier/moderator account) identifier.
pub type TenantId = Uuid;

/// Session identifier.
pub type SessionId = Uuid;

/// Globally unique card catalog number.
pub type CardId = i64;

/// A 5x5 bingo card grid. `None` marks the FREE cell, which is always
/// at the center position.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct CardGrid(pub [[Option<u8>; GRID_SIZE]; GRID_SIZE]);

impl CardGrid {
    /// Validate grid shape: FREE exactly at center, every other cell holds
    /// a distinct number in 1..=75.
    pub fn validate(&self) -> Result<(), GameError> {
        let mut seen = HashSet::with_capacity(GRID_SIZE * GRID_SIZE);
        for (row, cells) in self.0.iter().enumerate() {
            for (col, cell) in cells.iter().enumerate() {
                match cell {
                    None if (row, col) == FREE_CELL => {}
                    None => {
                        return Err(GameError::MalformedGrid(format!(
                            "unexpected FREE cell at [{row}][{col}]"
                        )));
                    }
                    Some(_) if (row, col) == FREE_CELL => {
                        return Err(GameError::MalformedGrid(
                            "center cell must be FREE".to_string(),
                        ));
                    }
                    Some(n) => {
                        if *n < 1 || *n > BINGO_MAX_NUMBER {
                            return Err(GameError::MalformedGrid(format!(
                                "number {n} at [{row}][{col}] is outside 1..=75"
                            )));
                        }
                        if !seen.insert(*n) {
                            return Err(GameError::MalformedGrid(format!(
                                "duplicate number {n}"
                            )));
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Mark the grid against a set of called numbers. The FREE cell is
    /// always marked.
    #[must_use]
    pub fn mark(&self, called: &HashSet<u8>) -> MarkedGrid {
        let mut marks = [[false; GRID_SIZE]; GRID_SIZE];
        for (row, cells) in self.0.iter().enumerate() {
            for (col, cell) in cells.iter().enumerate() {
                marks[row][col] = match cell {
                    None => true,
                    Some(n) => called.contains(n),
                };
            }
        }
        MarkedGrid(marks)
    }

    /// Iterate over numbered cells as `(row, col, number)`.
    pub fn numbered_cells(&self) -> impl Iterator<Item = (usize, usize, u8)> + '_ {
        self.0.iter().enumerate().flat_map(|(row, cells)| {
            cells
                .iter()
                .enumerate()
                .filter_map(move |(col, cell)| cell.map(|n| (row, col, n)))
        })
    }
}

/// A fully marked 5x5 grid, the input domain of the pattern matcher.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct MarkedGrid(pub [[bool; GRID_SIZE]; GRID_SIZE]);

impl MarkedGrid {
    #[must_use]
    pub fn is_marked(&self, row: usize, col: usize) -> bool {
        self.0[row][col]
    }
}

/// An immutable catalog card.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Card {
    pub id: CardId,
    pub grid: CardGrid,
}

impl Card {
    /// Generate a classic bingo card: column `i` draws five distinct numbers
    /// from `15 * i + 1 ..= 15 * (i + 1)`, with the FREE center cell.
    pub fn generate<R: Rng + ?Sized>(id: CardId, rng: &mut R) -> Self {
        let mut cells = [[None; GRID_SIZE]; GRID_SIZE];
        for col in 0..GRID_SIZE {
            let base = (col * 15) as u8;
            let picks = rand::seq::index::sample(rng, 15, GRID_SIZE);
            for (row, pick) in picks.iter().enumerate() {
                if (row, col) != FREE_CELL {
                    cells[row][col] = Some(base + pick as u8 + 1);
                }
            }
        }
        Self {
            id,
            grid: CardGrid(cells),
        }
    }
}

/// A concrete win pattern on the 5x5 grid.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Pattern {
    FourCornersCenter,
    Cross,
    MainDiagonal,
    OtherDiagonal,
    HorizontalLine,
    VerticalLine,
}

impl Pattern {
    pub const ALL: [Pattern; 6] = [
        Pattern::FourCornersCenter,
        Pattern::Cross,
        Pattern::MainDiagonal,
        Pattern::OtherDiagonal,
        Pattern::HorizontalLine,
        Pattern::VerticalLine,
    ];
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::FourCornersCenter => "four_corners_center",
            Self::Cross => "cross",
            Self::MainDiagonal => "main_diagonal",
            Self::OtherDiagonal => "other_diagonal",
            Self::HorizontalLine => "horizontal_line",
            Self::VerticalLine => "vertical_line",
        };
        write!(f, "{repr}")
    }
}

/// The pattern a session was created with. `Auto` is the classic `all`
/// setting: a concrete pattern is picked once at rig construction, and any
/// pattern wins at check time. The diagonal variants preserve the legacy
/// `diagonal` (either) and `x_pattern` (both) names.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternChoice {
    Declared(Pattern),
    AnyDiagonal,
    BothDiagonals,
    Auto,
}

impl fmt::Display for PatternChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Declared(p) => write!(f, "{p}"),
            Self::AnyDiagonal => write!(f, "diagonal"),
            Self::BothDiagonals => write!(f, "x_pattern"),
            Self::Auto => write!(f, "all"),
        }
    }
}

impl FromStr for PatternChoice {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let choice = match s {
            "four_corners_center" => Self::Declared(Pattern::FourCornersCenter),
            "cross" => Self::Declared(Pattern::Cross),
            "main_diagonal" => Self::Declared(Pattern::MainDiagonal),
            "other_diagonal" => Self::Declared(Pattern::OtherDiagonal),
            "horizontal_line" | "line" => Self::Declared(Pattern::HorizontalLine),
            "vertical_line" => Self::Declared(Pattern::VerticalLine),
            "diagonal" => Self::AnyDiagonal,
            "x_pattern" => Self::BothDiagonals,
            "all" => Self::Auto,
            other => return Err(GameError::UnknownPattern(other.to_string())),
        };
        Ok(choice)
    }
}

/// Session lifecycle status.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GameStatus {
    Pending,
    Active,
    Paused,
    Completed,
}

impl fmt::Display for GameStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Paused => "paused",
            Self::Completed => "completed",
        };
        write!(f, "{repr}")
    }
}

/// How a called number was selected.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CallSource {
    Manual,
    Forced,
    Random,
}

impl fmt::Display for CallSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::Manual => "manual",
            Self::Forced => "forced",
            Self::Random => "random",
        };
        write!(f, "{repr}")
    }
}

/// Bet economics for one session, computed once at creation.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
pub struct Economics {
    pub bet_amount: Decimal,
    pub house_fee_percentage: Decimal,
    pub total_pot: Decimal,
    pub house_fee: Decimal,
    pub jackpot_contribution: Decimal,
    pub prize_pool: Decimal,
}

impl Economics {
    /// Compute the pot split: `total_pot = bet * cards`, the house takes its
    /// fee percentage, the jackpot (when enabled) takes a fixed percentage of
    /// the pot, and the rest is the prize pool.
    pub fn compute(
        bet_amount: Decimal,
        card_count: usize,
        house_fee_percentage: Decimal,
        jackpot_enabled: bool,
    ) -> Result<Self, GameError> {
        if bet_amount <= Decimal::ZERO {
            return Err(GameError::InvalidEconomics(format!(
                "bet amount {bet_amount} must be positive"
            )));
        }
        if house_fee_percentage < Decimal::ZERO || house_fee_percentage >= dec!(100) {
            return Err(GameError::InvalidEconomics(format!(
                "house fee percentage {house_fee_percentage} must be in [0, 100)"
            )));
        }
        if card_count == 0 {
            return Err(GameError::InvalidEconomics(
                "session needs at least one card".to_string(),
            ));
        }
        let total_pot = bet_amount * Decimal::from(card_count as u64);
        let house_fee = total_pot * house_fee_percentage / dec!(100);
        let jackpot_contribution = if jackpot_enabled {
            total_pot * JACKPOT_CONTRIBUTION_PERCENT / dec!(100)
        } else {
            Decimal::ZERO
        };
        let prize_pool = total_pot - house_fee - jackpot_contribution;
        Ok(Self {
            bet_amount,
            house_fee_percentage,
            total_pot,
            house_fee,
            jackpot_contribution,
            prize_pool,
        })
    }
}

/// The winning card and its prize, recorded at most once per session.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Winner {
    pub card_id: CardId,
    pub prize: Decimal,
    pub pattern: Pattern,
    pub won_at: DateTime<Utc>,
}

/// Jackpot draw pre-configured for a session, carried over from a
/// future-winner configuration.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct JackpotDraw {
    pub amount: Decimal,
    pub message: String,
}

/// The authoritative record of one bingo round.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct GameSession {
    pub id: SessionId,
    pub tenant_id: TenantId,
    /// Sequence number, unique per tenant.
    pub session_number: i64,
    pub economics: Economics,
    pub pattern: PatternChoice,
    /// Concrete pattern actually enforced when `pattern` was `Auto`.
    pub forced_pattern: Option<Pattern>,
    /// Card snapshots selected into this round, in selection order.
    pub selected_cards: Vec<Card>,
    /// Strictly ordered append log of called numbers, no duplicates.
    pub called_numbers: Vec<u8>,
    /// Remaining forced calls, consumed front to back.
    pub forced_call_sequence: VecDeque<u8>,
    pub rigged_winner_card_id: Option<CardId>,
    pub winner: Option<Winner>,
    pub status: GameStatus,
    pub jackpot_enabled: bool,
    pub jackpot_draw: Option<JackpotDraw>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl GameSession {
    #[must_use]
    pub fn card(&self, card_id: CardId) -> Option<&Card> {
        self.selected_cards.iter().find(|c| c.id == card_id)
    }

    #[must_use]
    pub fn called_set(&self) -> HashSet<u8> {
        self.called_numbers.iter().copied().collect()
    }

    /// The pattern to evaluate at check time: the rig-resolved pattern when
    /// the session was created with `all`, otherwise the declared choice.
    #[must_use]
    pub fn effective_pattern(&self) -> PatternChoice {
        match self.forced_pattern {
            Some(p) => PatternChoice::Declared(p),
            None => self.pattern,
        }
    }
}
