//! Game session state machine.
//!
//! Transitions: `pending -> active <-> paused -> completed`. `completed` is
//! terminal; the winner is recorded exactly once, on the transition into
//! `completed` via a winning bingo check. Jackpot settlement is decoupled:
//! the session only records the fact of the win, the ledger consumes it.

use chrono::Utc;
use rust_decimal::Decimal;
use std::collections::VecDeque;
use uuid::Uuid;

use super::entities::{
    Card, CardId, Economics, GameSession, GameStatus, JackpotDraw, Pattern, PatternChoice,
    TenantId, Winner,
};
use super::errors::{GameError, GameResult};

/// Everything needed to construct a session in `pending`.
#[derive(Clone, Debug)]
pub struct NewSession {
    pub tenant_id: TenantId,
    pub session_number: i64,
    pub economics: Economics,
    pub pattern: PatternChoice,
    pub forced_pattern: Option<Pattern>,
    pub selected_cards: Vec<Card>,
    pub forced_call_sequence: Vec<u8>,
    pub rigged_winner_card_id: Option<CardId>,
    pub jackpot_enabled: bool,
    pub jackpot_draw: Option<JackpotDraw>,
}

impl GameSession {
    /// Create a session in `pending` with an empty call history.
    pub fn create(new: NewSession) -> GameResult<Self> {
        if new.selected_cards.is_empty() {
            return Err(GameError::Validation(
                "session needs at least one card".to_string(),
            ));
        }
        for card in &new.selected_cards {
            card.grid.validate()?;
        }
        let mut ids: Vec<CardId> = new.selected_cards.iter().map(|c| c.id).collect();
        ids.sort_unstable();
        ids.dedup();
        if ids.len() != new.selected_cards.len() {
            return Err(GameError::Validation(
                "duplicate card in selection".to_string(),
            ));
        }
        if let Some(rigged) = new.rigged_winner_card_id
            && !new.selected_cards.iter().any(|c| c.id == rigged)
        {
            return Err(GameError::Validation(format!(
                "rigged winner card {rigged} is not part of the selection"
            )));
        }

        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            tenant_id: new.tenant_id,
            session_number: new.session_number,
            economics: new.economics,
            pattern: new.pattern,
            forced_pattern: new.forced_pattern,
            selected_cards: new.selected_cards,
            called_numbers: Vec::new(),
            forced_call_sequence: VecDeque::from(new.forced_call_sequence),
            rigged_winner_card_id: new.rigged_winner_card_id,
            winner: None,
            status: GameStatus::Pending,
            jackpot_enabled: new.jackpot_enabled,
            jackpot_draw: new.jackpot_draw,
            created_at: now,
            updated_at: now,
        })
    }

    /// `pending -> active`.
    pub fn start(&mut self) -> GameResult<()> {
        match self.status {
            GameStatus::Pending => {
                self.status = GameStatus::Active;
                self.touch();
                Ok(())
            }
            status => Err(GameError::InvalidState {
                status,
                required: "pending",
            }),
        }
    }

    /// `active -> paused`.
    pub fn pause(&mut self) -> GameResult<()> {
        match self.status {
            GameStatus::Active => {
                self.status = GameStatus::Paused;
                self.touch();
                Ok(())
            }
            status => Err(GameError::InvalidState {
                status,
                required: "active",
            }),
        }
    }

    /// `paused -> active`.
    pub fn resume(&mut self) -> GameResult<()> {
        match self.status {
            GameStatus::Paused => {
                self.status = GameStatus::Active;
                self.touch();
                Ok(())
            }
            status => Err(GameError::InvalidState {
                status,
                required: "paused",
            }),
        }
    }

    /// Explicit finish without a winner: `active|paused -> completed`.
    pub fn finish(&mut self) -> GameResult<()> {
        match self.status {
            GameStatus::Active | GameStatus::Paused => {
                self.status = GameStatus::Completed;
                self.touch();
                Ok(())
            }
            status => Err(GameError::InvalidState {
                status,
                required: "active or paused",
            }),
        }
    }

    /// Record the winner and complete the session. The winner is set exactly
    /// once, as part of this transition.
    pub fn complete_with_winner(
        &mut self,
        card_id: CardId,
        prize: Decimal,
        pattern: Pattern,
    ) -> GameResult<()> {
        match self.status {
            GameStatus::Active | GameStatus::Paused => {
                debug_assert!(self.winner.is_none(), "winner only set on completion");
                self.winner = Some(Winner {
                    card_id,
                    prize,
                    pattern,
                    won_at: Utc::now(),
                });
                self.status = GameStatus::Completed;
                self.touch();
                Ok(())
            }
            status => Err(GameError::InvalidState {
                status,
                required: "active or paused",
            }),
        }
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
